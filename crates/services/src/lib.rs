// Path: crates/services/src/lib.rs
#![forbid(unsafe_code)]
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

//! # IOI Services
//!
//! Modules hosted by the node. Currently the `08-wasm` light client, whose
//! verification logic runs inside sandboxed contracts.

pub mod ibc;
