// Path: crates/services/src/ibc/light_clients/wasm/mod.rs
//! The `08-wasm` light client module.
//!
//! A wasm client delegates verification to a contract identified by the
//! checksum of its bytecode. The host keeps the checksum registry, prices every
//! contract call in host gas, checks parameter shape before calling into the
//! sandbox, and commits contract writes only when the contract reports success.

pub mod checksums;
pub mod client_state;
pub mod compression;
pub mod contract;
pub mod gas;
pub mod genesis;
pub mod keeper;
pub mod msg_server;
pub mod msgs;
mod recovery;
pub mod snapshot;

#[cfg(test)]
mod test_support;

pub use checksums::{PageRequest, PageResponse};
pub use client_state::WasmLightClient;
pub use contract::WasmContext;
pub use gas::GasRegister;
pub use genesis::{GenesisContract, GenesisState};
pub use keeper::{ChecksumsResponse, WasmKeeper};
pub use msg_server::{
    MsgPushNewWasmCode, MsgPushNewWasmCodeResponse, MsgUpdateWasmCodeId, MsgUpdateWasmCodeIdResponse,
};
pub use msgs::{ClientMessage, ContractResult};
pub use snapshot::WasmSnapshotter;
