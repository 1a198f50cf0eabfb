// Path: crates/storage/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Key-value stores for the wasm light client.
//!
//! This crate provides the in-memory reference stores, the prefix and
//! copy-on-write views a light client layers over a host store, and the
//! bridges that hand a store to the sandboxed engine: `StoreAdapter` for
//! ordinary calls and the dual-prefix `WrappedStore` used during client
//! recovery.

pub mod adapter;
pub mod cache;
pub mod memory;
pub mod prefix;
mod range;
pub mod wrapped;

pub use adapter::{ReadOnlyStoreAdapter, StoreAdapter};
pub use cache::CacheStore;
pub use memory::{MemoryStore, VersionedMemoryStore};
pub use prefix::PrefixStore;
pub use range::next_prefix;
pub use wrapped::{StoreSide, WrappedStore};
