// Path: crates/types/src/config/mod.rs

//! Shared configuration structures for the wasm light client.
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Defines the fuel costs charged by the engine's host functions.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VmFuelCosts {
    /// Base cost for any host function call.
    #[serde(default = "default_fuel_base")]
    pub base_cost: u64,
    /// Per-byte cost for writing to state.
    #[serde(default = "default_fuel_state_set_per_byte")]
    pub state_set_per_byte: u64,
    /// Per-byte cost for reading from state.
    #[serde(default = "default_fuel_state_get_per_byte")]
    pub state_get_per_byte: u64,
    /// Cost for each item yielded by a range scan.
    #[serde(default = "default_fuel_state_scan_per_item")]
    pub state_scan_per_item: u64,
}

fn default_fuel_base() -> u64 {
    1000
}
fn default_fuel_state_set_per_byte() -> u64 {
    10
}
fn default_fuel_state_get_per_byte() -> u64 {
    5
}
fn default_fuel_state_scan_per_item() -> u64 {
    100
}

impl Default for VmFuelCosts {
    fn default() -> Self {
        Self {
            base_cost: default_fuel_base(),
            state_set_per_byte: default_fuel_state_set_per_byte(),
            state_get_per_byte: default_fuel_state_get_per_byte(),
            state_scan_per_item: default_fuel_state_scan_per_item(),
        }
    }
}

/// A rational per-byte cost, used where whole units are too coarse.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct GasRatio {
    /// Numerator.
    pub numerator: u64,
    /// Denominator. Must be non-zero.
    pub denominator: u64,
}

impl GasRatio {
    /// Applies the ratio to `amount`, rounding down and saturating on overflow.
    pub fn mul(&self, amount: u64) -> u64 {
        if self.denominator == 0 {
            return u64::MAX;
        }
        let wide = u128::from(amount) * u128::from(self.numerator) / u128::from(self.denominator);
        u64::try_from(wide).unwrap_or(u64::MAX)
    }
}

/// The host-gas cost table for wasm contract operations.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GasRegisterConfig {
    /// Host gas is multiplied by this factor to obtain sandbox gas.
    #[serde(default = "default_gas_multiplier")]
    pub gas_multiplier: u64,
    /// Fixed cost of loading a contract instance.
    #[serde(default = "default_instance_cost")]
    pub instance_cost: u64,
    /// Per-byte cost of compiling bytecode.
    #[serde(default = "default_compile_cost")]
    pub compile_cost: u64,
    /// Per-byte cost of decompressing gzip bytecode.
    #[serde(default = "default_uncompress_cost")]
    pub uncompress_cost: GasRatio,
    /// Per-byte cost of the message passed to a contract.
    #[serde(default)]
    pub contract_message_data_cost: u64,
    /// Per-byte cost of deserializing contract responses.
    #[serde(default = "default_deserialization_cost")]
    pub deserialization_cost: u64,
}

fn default_gas_multiplier() -> u64 {
    140_000_000
}
fn default_instance_cost() -> u64 {
    60_000
}
fn default_compile_cost() -> u64 {
    3
}
fn default_uncompress_cost() -> GasRatio {
    GasRatio {
        numerator: 15,
        denominator: 100,
    }
}
fn default_deserialization_cost() -> u64 {
    1
}

impl Default for GasRegisterConfig {
    fn default() -> Self {
        Self {
            gas_multiplier: default_gas_multiplier(),
            instance_cost: default_instance_cost(),
            compile_cost: default_compile_cost(),
            uncompress_cost: default_uncompress_cost(),
            contract_message_data_cost: 0,
            deserialization_cost: default_deserialization_cost(),
        }
    }
}

/// Top-level configuration for the wasm light client module and its engine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WasmConfig {
    /// Linear memory cap per contract instance, in MiB.
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u32,
    /// Number of compiled, unpinned modules kept in the engine's LRU cache.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Forward guest `debug` calls to the log.
    #[serde(default)]
    pub print_debug: bool,
    /// Sandbox gas per unit of wasmtime fuel.
    #[serde(default = "default_gas_per_fuel")]
    pub gas_per_fuel: u64,
    /// Maximum module size after decompression.
    #[serde(default = "default_max_wasm_size")]
    pub max_wasm_size: usize,
    /// Host gas cost table.
    #[serde(default)]
    pub gas: GasRegisterConfig,
    /// Host function fuel costs.
    #[serde(default)]
    pub fuel_costs: VmFuelCosts,
    /// The only signer allowed to push code and migrate client code ids.
    #[serde(default = "default_authority")]
    pub authority: String,
}

fn default_memory_limit_mb() -> u32 {
    32
}
fn default_cache_size() -> usize {
    100
}
fn default_gas_per_fuel() -> u64 {
    150
}
fn default_max_wasm_size() -> usize {
    crate::MAX_WASM_SIZE
}
fn default_authority() -> String {
    "gov".to_string()
}

impl Default for WasmConfig {
    fn default() -> Self {
        Self {
            memory_limit_mb: default_memory_limit_mb(),
            cache_size: default_cache_size(),
            print_debug: false,
            gas_per_fuel: default_gas_per_fuel(),
            max_wasm_size: default_max_wasm_size(),
            gas: GasRegisterConfig::default(),
            fuel_costs: VmFuelCosts::default(),
            authority: default_authority(),
        }
    }
}

impl WasmConfig {
    /// Parses a config from TOML text, filling absent fields with defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.gas_per_fuel == 0 {
            return Err(ConfigError::Invalid("gas_per_fuel must be non-zero".into()));
        }
        if self.gas.gas_multiplier == 0 {
            return Err(ConfigError::Invalid("gas.gas_multiplier must be non-zero".into()));
        }
        if self.gas.uncompress_cost.denominator == 0 {
            return Err(ConfigError::Invalid(
                "gas.uncompress_cost.denominator must be non-zero".into(),
            ));
        }
        if self.max_wasm_size == 0 {
            return Err(ConfigError::Invalid("max_wasm_size must be non-zero".into()));
        }
        Ok(())
    }
}
