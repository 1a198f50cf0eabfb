// Path: crates/services/src/ibc/light_clients/wasm/gas.rs
//! The gas register: host gas costs of code storage and contract calls, and the
//! conversion between host gas and sandbox gas.

use ioi_api::gas::{GasMeter, VmGasMeter};
use ioi_types::config::GasRegisterConfig;
use ioi_types::error::GasError;

/// Prices contract operations in host gas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasRegister {
    cfg: GasRegisterConfig,
}

impl Default for GasRegister {
    fn default() -> Self {
        Self::new(GasRegisterConfig::default())
    }
}

impl GasRegister {
    pub fn new(cfg: GasRegisterConfig) -> Self {
        Self { cfg }
    }

    /// Cost of compiling `len` bytes of bytecode.
    pub fn compile_costs(&self, len: usize) -> u64 {
        self.cfg.compile_cost.saturating_mul(len as u64)
    }

    /// Cost of decompressing `len` bytes of gzip input.
    pub fn uncompress_costs(&self, len: usize) -> u64 {
        self.cfg.uncompress_cost.mul(len as u64)
    }

    /// Up-front cost of an `instantiate` call carrying a `msg_len`-byte message.
    pub fn new_contract_instance_costs(&self, msg_len: usize) -> u64 {
        self.instance_costs(msg_len)
    }

    /// Up-front cost of a `sudo` or `query` call carrying a `msg_len`-byte message.
    pub fn instantiate_contract_costs(&self, msg_len: usize) -> u64 {
        self.instance_costs(msg_len)
    }

    fn instance_costs(&self, msg_len: usize) -> u64 {
        self.cfg.instance_cost.saturating_add(
            self.cfg
                .contract_message_data_cost
                .saturating_mul(msg_len as u64),
        )
    }

    /// Cost of deserializing a `len`-byte contract response.
    pub fn deserialization_costs(&self, len: usize) -> u64 {
        self.cfg.deserialization_cost.saturating_mul(len as u64)
    }

    /// Converts host gas to sandbox gas, saturating on overflow.
    pub fn to_wasm_vm_gas(&self, source: u64) -> u64 {
        source
            .checked_mul(self.cfg.gas_multiplier)
            .unwrap_or(u64::MAX)
    }

    /// Converts sandbox gas to host gas, rounding down.
    pub fn from_wasm_vm_gas(&self, source: u64) -> u64 {
        source / self.cfg.gas_multiplier.max(1)
    }

    /// The sandbox gas limit for a call charged to `meter`.
    pub fn runtime_gas_for_contract(&self, meter: &dyn GasMeter) -> u64 {
        if meter.is_infinite() || meter.limit() == 0 {
            return u64::MAX;
        }
        self.to_wasm_vm_gas(meter.limit().saturating_sub(meter.gas_consumed_to_limit()))
    }

    /// Charges `vm_gas` of sandbox usage to `meter`.
    pub fn consume_runtime_gas(&self, meter: &mut dyn GasMeter, vm_gas: u64) -> Result<(), GasError> {
        let consumed = self.from_wasm_vm_gas(vm_gas);
        meter.consume_gas(consumed, "wasm contract")?;
        if meter.is_out_of_gas() {
            return Err(GasError::OutOfGas {
                descriptor: "wasm contract".into(),
                limit: meter.limit(),
                consumed: meter.gas_consumed(),
            });
        }
        Ok(())
    }

    /// Views `meter` in sandbox gas units.
    pub fn multiplied_meter<'a>(&'a self, meter: &'a dyn GasMeter) -> MultipliedGasMeter<'a> {
        MultipliedGasMeter {
            original: meter,
            register: self,
        }
    }
}

/// A host meter reporting its consumption in sandbox gas.
pub struct MultipliedGasMeter<'a> {
    original: &'a dyn GasMeter,
    register: &'a GasRegister,
}

impl VmGasMeter for MultipliedGasMeter<'_> {
    fn gas_consumed(&self) -> u64 {
        self.register.to_wasm_vm_gas(self.original.gas_consumed())
    }
}
