// Path: crates/services/src/ibc/mod.rs

//! IBC services hosted by the node.

/// Light client implementations.
pub mod light_clients;
