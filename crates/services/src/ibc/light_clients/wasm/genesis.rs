// Path: crates/services/src/ibc/light_clients/wasm/genesis.rs
//! Genesis import and export of registered bytecode.

use super::checksums::all_checksums;
use super::keeper::{validate_wasm_code, WasmKeeper};
use ioi_api::context::CallCtx;
use ioi_api::state::KvStore;
use ioi_types::error::WasmError;
use ioi_types::ibc::base64_bytes;
use ioi_types::MAX_WASM_SIZE;
use serde::{Deserialize, Serialize};

/// One registered contract, as carried in genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisContract {
    #[serde(with = "base64_bytes")]
    pub code_bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    #[serde(default)]
    pub contracts: Vec<GenesisContract>,
}

impl GenesisState {
    /// Checks that every contract is non-empty and within the module size limit.
    pub fn validate(&self) -> Result<(), WasmError> {
        self.contracts
            .iter()
            .try_for_each(|c| validate_wasm_code(&c.code_bytes, MAX_WASM_SIZE))
    }
}

impl WasmKeeper {
    /// Registers every genesis contract through the unchecked store path.
    pub fn init_genesis(
        &self,
        ctx: &mut CallCtx,
        module_store: &mut dyn KvStore,
        genesis: &GenesisState,
    ) -> Result<(), WasmError> {
        for contract in &genesis.contracts {
            self.store_code_unchecked(ctx, module_store, &contract.code_bytes)?;
        }
        tracing::info!(target: "ibc", contracts = genesis.contracts.len(), "imported wasm genesis");
        Ok(())
    }

    /// Collects the bytecode of every registered checksum in registry order.
    ///
    /// Callers treat an error as fatal: a registered checksum the engine cannot
    /// serve means the node's code cache and state have diverged.
    pub fn export_genesis(&self, module_store: &dyn KvStore) -> Result<GenesisState, WasmError> {
        let contracts = all_checksums(module_store)?
            .iter()
            .map(|checksum| {
                self.context()
                    .engine()
                    .get_code(checksum)
                    .map(|code_bytes| GenesisContract { code_bytes })
                    .map_err(WasmError::from)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GenesisState { contracts })
    }
}
