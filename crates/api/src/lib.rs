// Path: crates/api/src/lib.rs

//! # IOI API Crate Lints
//!
//! This crate enforces a strict set of lints to ensure high-quality,
//! panic-free, and well-documented code. Panics are disallowed in non-test
//! code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
#![deny(missing_docs)]
//! # IOI API
//!
//! Core traits and interfaces for the wasm light client. This crate defines
//! the stable capability contracts between the host ledger, the light client
//! module, and the sandboxed engine.

/// The explicit per-call context threaded into every light client operation.
pub mod context;
/// Host gas meters.
pub mod gas;
/// Type-erased client state traits and the host client registry.
pub mod ibc;
/// The state-sync snapshot extension contract.
pub mod snapshot;
/// Key-value store capabilities for the host and the engine.
pub mod state;
/// The sandboxed engine capability contract.
pub mod vm;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::context::{BlockHeader, CallCtx};
    pub use crate::gas::{BasicGasMeter, GasMeter, InfiniteGasMeter};
    pub use crate::state::{KvStore, Order, VersionedKvStore, VmStore};
    pub use crate::vm::{Env, ExecutionOutput, MessageInfo, WasmEngine};
}
