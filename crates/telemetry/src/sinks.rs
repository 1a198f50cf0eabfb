// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured error metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    match SINK.get().copied() {
        Some(sink) => sink.as_error_sink(),
        None => &NOP_SINK,
    }
}

/// Returns a static reference to the configured wasm light client metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn wasm_metrics() -> &'static dyn WasmMetricsSink {
    match SINK.get().copied() {
        Some(sink) => sink.as_wasm_sink(),
        None => &NOP_SINK,
    }
}

// --- Trait Definitions ---

/// A sink for metrics of the wasm light client module and its engine.
pub trait WasmMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter of contract calls, labeled by entry point and outcome.
    fn inc_contract_calls(&self, entry: &'static str, outcome: &'static str);
    /// Observes the sandbox gas consumed by one contract call.
    fn observe_contract_gas(&self, entry: &'static str, gas: u64);
    /// Observes the wall-clock duration of one contract call.
    fn observe_call_duration(&self, entry: &'static str, duration_secs: f64);
    /// Increments the counter of stored codes, labeled by path (`checked`, `unchecked`).
    fn inc_codes_stored(&self, kind: &'static str);
    /// Increments the counter of snapshot items, labeled by direction (`export`, `restore`).
    fn inc_snapshot_items(&self, direction: &'static str);
}
impl WasmMetricsSink for NopSink {
    fn inc_contract_calls(&self, _entry: &'static str, _outcome: &'static str) {}
    fn observe_contract_gas(&self, _entry: &'static str, _gas: u64) {}
    fn observe_call_duration(&self, _entry: &'static str, _duration_secs: f64) {}
    fn inc_codes_stored(&self, _kind: &'static str) {}
    fn inc_snapshot_items(&self, _direction: &'static str) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and stable code.
    fn inc_error(&self, kind: &'static str, code: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _code: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink: WasmMetricsSink + ErrorMetricsSink {
    /// Views this sink as its error-metrics facet.
    fn as_error_sink(&self) -> &dyn ErrorMetricsSink;
    /// Views this sink as its wasm-metrics facet.
    fn as_wasm_sink(&self) -> &dyn WasmMetricsSink;
}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T
where
    T: WasmMetricsSink + ErrorMetricsSink,
{
    fn as_error_sink(&self) -> &dyn ErrorMetricsSink {
        self
    }
    fn as_wasm_sink(&self) -> &dyn WasmMetricsSink {
        self
    }
}
