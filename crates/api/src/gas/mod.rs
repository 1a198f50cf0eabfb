// Path: crates/api/src/gas/mod.rs
//! Host gas meters.

use ioi_types::error::GasError;

/// Accounts for host gas consumed during a call.
pub trait GasMeter: Send {
    /// Total gas consumed, which may exceed the limit after an out-of-gas charge.
    fn gas_consumed(&self) -> u64;

    /// Gas consumed, capped at the limit.
    fn gas_consumed_to_limit(&self) -> u64 {
        self.gas_consumed().min(self.limit())
    }

    /// The meter's limit. Zero for meters that do not enforce one.
    fn limit(&self) -> u64;

    /// Charges `amount`, failing once the limit is exceeded.
    fn consume_gas(&mut self, amount: u64, descriptor: &str) -> Result<(), GasError>;

    /// Returns whether the limit has been reached.
    fn is_out_of_gas(&self) -> bool;

    /// Returns whether this meter never runs out.
    fn is_infinite(&self) -> bool {
        false
    }
}

impl<T: GasMeter + ?Sized> GasMeter for Box<T> {
    fn gas_consumed(&self) -> u64 {
        (**self).gas_consumed()
    }
    fn gas_consumed_to_limit(&self) -> u64 {
        (**self).gas_consumed_to_limit()
    }
    fn limit(&self) -> u64 {
        (**self).limit()
    }
    fn consume_gas(&mut self, amount: u64, descriptor: &str) -> Result<(), GasError> {
        (**self).consume_gas(amount, descriptor)
    }
    fn is_out_of_gas(&self) -> bool {
        (**self).is_out_of_gas()
    }
    fn is_infinite(&self) -> bool {
        (**self).is_infinite()
    }
}

/// A read-only view of gas consumption as seen by the sandbox.
pub trait VmGasMeter {
    /// Gas consumed, in sandbox units.
    fn gas_consumed(&self) -> u64;
}

/// A meter with a fixed limit.
#[derive(Debug, Clone)]
pub struct BasicGasMeter {
    limit: u64,
    consumed: u64,
}

impl BasicGasMeter {
    /// Creates a meter with the given limit.
    pub fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }
}

impl GasMeter for BasicGasMeter {
    fn gas_consumed(&self) -> u64 {
        self.consumed
    }

    fn limit(&self) -> u64 {
        self.limit
    }

    fn consume_gas(&mut self, amount: u64, descriptor: &str) -> Result<(), GasError> {
        self.consumed = self
            .consumed
            .checked_add(amount)
            .ok_or_else(|| GasError::Overflow(descriptor.to_string()))?;
        if self.consumed > self.limit {
            return Err(GasError::OutOfGas {
                descriptor: descriptor.to_string(),
                limit: self.limit,
                consumed: self.consumed,
            });
        }
        Ok(())
    }

    fn is_out_of_gas(&self) -> bool {
        self.consumed >= self.limit
    }
}

/// A meter without a limit, used outside block execution (e.g. genesis export).
#[derive(Debug, Clone, Default)]
pub struct InfiniteGasMeter {
    consumed: u64,
}

impl InfiniteGasMeter {
    /// Creates an empty infinite meter.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GasMeter for InfiniteGasMeter {
    fn gas_consumed(&self) -> u64 {
        self.consumed
    }

    fn gas_consumed_to_limit(&self) -> u64 {
        self.consumed
    }

    fn limit(&self) -> u64 {
        u64::MAX
    }

    fn consume_gas(&mut self, amount: u64, descriptor: &str) -> Result<(), GasError> {
        self.consumed = self
            .consumed
            .checked_add(amount)
            .ok_or_else(|| GasError::Overflow(descriptor.to_string()))?;
        Ok(())
    }

    fn is_out_of_gas(&self) -> bool {
        false
    }

    fn is_infinite(&self) -> bool {
        true
    }
}
