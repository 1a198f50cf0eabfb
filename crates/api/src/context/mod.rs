// Path: crates/api/src/context/mod.rs
//! The explicit context object threaded into every light client call.

use crate::gas::GasMeter;
use ioi_types::ibc::Event;

/// The host's current block header, as seen by a contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block height. Signed to mirror the host header; must never be negative.
    pub height: i64,
    /// Block time in unix nanoseconds. Must never be negative.
    pub time_unix_nanos: i64,
    /// The host chain id.
    pub chain_id: String,
}

/// Per-call context: the block header, a gas meter, and the events emitted so far.
pub struct CallCtx {
    /// The current block header.
    pub header: BlockHeader,
    /// The host gas meter charged by this call.
    pub gas_meter: Box<dyn GasMeter>,
    /// Events emitted by module operations.
    pub events: Vec<Event>,
}

impl CallCtx {
    /// Creates a context for the given header and meter.
    pub fn new(header: BlockHeader, gas_meter: Box<dyn GasMeter>) -> Self {
        Self {
            header,
            gas_meter,
            events: Vec::new(),
        }
    }

    /// Records an event.
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

impl std::fmt::Debug for CallCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallCtx")
            .field("header", &self.header)
            .field("gas_consumed", &self.gas_meter.gas_consumed())
            .field("events", &self.events)
            .finish()
    }
}
