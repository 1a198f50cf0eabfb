// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo
    )
)]

//! # IOI Wasm Light Client Types
//!
//! This crate is the foundational library for the wasm-backed light client,
//! containing the core data structures, error types, and configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `ioi-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. This prevents circular
//! dependencies and provides a canonical definition for shared types like
//! `Checksum`, `Height`, the wasm `ClientState`, and the error enums.

/// The maximum size in bytes of a wasm module after decompression.
pub const MAX_WASM_SIZE: usize = 3 * 1024 * 1024; // 3 MiB

/// The length in bytes of a bytecode checksum (a SHA-256 digest).
pub const CHECKSUM_LEN: usize = 32;

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::WasmError> = std::result::Result<T, E>;

/// The canonical, deterministic binary codec for consensus-critical state.
pub mod codec;
/// Shared configuration structures (e.g., `WasmConfig`, `GasRegisterConfig`).
pub mod config;
/// A unified set of all error types used across the workspace.
pub mod error;
/// Core data structures for the wasm light client (IBC 08-wasm).
pub mod ibc;
/// Constants for well-known store keys and prefixes.
pub mod keys;
