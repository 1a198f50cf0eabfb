// Path: crates/services/src/ibc/light_clients/mod.rs

//! Light client modules. Each client family lives in its own submodule.

pub mod wasm;
