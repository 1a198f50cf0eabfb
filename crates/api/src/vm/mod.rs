// Path: crates/api/src/vm/mod.rs
//! Defines the capability contract of the sandboxed wasm engine.
//!
//! The engine compiles, caches, pins, and runs verification contracts. It is
//! the only component that executes externally supplied code; everything it
//! needs from the host is passed in explicitly per call.
use crate::state::VmStore;
use ioi_types::error::VmError;
use ioi_types::ibc::Checksum;
use serde::{Deserialize, Serialize};

/// Block information visible to a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Block height.
    pub height: u64,
    /// Block time in unix nanoseconds, encoded as a decimal string.
    #[serde(with = "u64_string")]
    pub time: u64,
    /// Host chain id.
    pub chain_id: String,
}

/// Contract information visible to a contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    /// The contract address. Light client contracts run unaddressed.
    pub address: String,
}

/// The immutable execution environment passed to every entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    /// Current block.
    pub block: BlockInfo,
    /// Current contract.
    pub contract: ContractInfo,
}

/// A token amount. Light client calls never carry funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination.
    pub denom: String,
    /// Amount as a decimal string.
    pub amount: String,
}

/// Sender information passed to `instantiate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    /// The sender address.
    pub sender: String,
    /// Attached funds.
    pub funds: Vec<Coin>,
}

/// Contains the results of a successful contract execution.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// Sandbox gas consumed by the execution.
    pub gas_used: u64,
    /// For `instantiate`/`sudo`, the response `data`; for `query`, the query result.
    pub return_data: Vec<u8>,
}

/// The sandboxed bytecode engine.
///
/// Implementations maintain their own compiled-module cache and must be safe
/// to share across threads; callers never assume exclusive access to it.
pub trait WasmEngine: Send + Sync {
    /// Validates, compiles, and stores bytecode, returning the engine's code id.
    fn store_code(&self, code: &[u8]) -> Result<Checksum, VmError>;

    /// Compiles and stores bytecode without interface validation.
    fn store_code_unchecked(&self, code: &[u8]) -> Result<Checksum, VmError>;

    /// Returns the stored bytecode for `checksum`.
    fn get_code(&self, checksum: &Checksum) -> Result<Vec<u8>, VmError>;

    /// Keeps the compiled module resident in memory.
    fn pin(&self, checksum: &Checksum) -> Result<(), VmError>;

    /// Runs the `instantiate` entry point.
    fn instantiate(
        &self,
        checksum: &Checksum,
        env: &Env,
        info: &MessageInfo,
        msg: &[u8],
        store: &mut dyn VmStore,
        gas_limit: u64,
    ) -> Result<ExecutionOutput, VmError>;

    /// Runs the privileged `sudo` entry point used for state-mutating calls.
    fn sudo(
        &self,
        checksum: &Checksum,
        env: &Env,
        msg: &[u8],
        store: &mut dyn VmStore,
        gas_limit: u64,
    ) -> Result<ExecutionOutput, VmError>;

    /// Runs the read-only `query` entry point.
    fn query(
        &self,
        checksum: &Checksum,
        env: &Env,
        msg: &[u8],
        store: &dyn VmStore,
        gas_limit: u64,
    ) -> Result<ExecutionOutput, VmError>;
}

mod u64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_json_shape() {
        let env = Env {
            block: BlockInfo {
                height: 7,
                time: 1_700_000_000_000_000_000,
                chain_id: "ioi-1".into(),
            },
            contract: ContractInfo::default(),
        };
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(
            json,
            r#"{"block":{"height":7,"time":"1700000000000000000","chain_id":"ioi-1"},"contract":{"address":""}}"#
        );
        assert_eq!(serde_json::from_str::<Env>(&json).unwrap(), env);
    }
}
