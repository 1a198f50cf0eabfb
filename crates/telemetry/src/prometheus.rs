// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};

// --- Metric Statics ---
// The collectors are initialized exactly once by `install`.

static WASM_CONTRACT_CALLS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static WASM_CONTRACT_GAS: OnceCell<HistogramVec> = OnceCell::new();
static WASM_CALL_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static WASM_CODES_STORED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static WASM_SNAPSHOT_ITEMS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

/// The Prometheus-backed sink. Recording before `install` is a no-op.
#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

static PROMETHEUS_SINK: PrometheusSink = PrometheusSink;

/// Runs `$body` with the collector bound to `$m` if it has been installed.
macro_rules! with_metric {
    ($metric:ident, |$m:ident| $body:expr) => {
        if let Some($m) = $metric.get() {
            $body;
        }
    };
}

impl WasmMetricsSink for PrometheusSink {
    fn inc_contract_calls(&self, entry: &'static str, outcome: &'static str) {
        with_metric!(WASM_CONTRACT_CALLS_TOTAL, |m| m
            .with_label_values(&[entry, outcome])
            .inc());
    }
    fn observe_contract_gas(&self, entry: &'static str, gas: u64) {
        with_metric!(WASM_CONTRACT_GAS, |m| m
            .with_label_values(&[entry])
            .observe(gas as f64));
    }
    fn observe_call_duration(&self, entry: &'static str, duration_secs: f64) {
        with_metric!(WASM_CALL_DURATION_SECONDS, |m| m
            .with_label_values(&[entry])
            .observe(duration_secs));
    }
    fn inc_codes_stored(&self, kind: &'static str) {
        with_metric!(WASM_CODES_STORED_TOTAL, |m| m.with_label_values(&[kind]).inc());
    }
    fn inc_snapshot_items(&self, direction: &'static str) {
        with_metric!(WASM_SNAPSHOT_ITEMS_TOTAL, |m| m
            .with_label_values(&[direction])
            .inc());
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, code: &'static str) {
        with_metric!(ERRORS_TOTAL, |m| m.with_label_values(&[kind, code]).inc());
    }
}

fn already_installed() -> prometheus::Error {
    prometheus::Error::Msg("prometheus sink already installed".into())
}

/// Registers all collectors with the default registry and installs the
/// Prometheus sink as the global `SINK`.
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    WASM_CONTRACT_CALLS_TOTAL
        .set(register_int_counter_vec!(
            "ioi_wasm_contract_calls_total",
            "Total wasm light client contract calls.",
            &["entry", "outcome"]
        )?)
        .map_err(|_| already_installed())?;
    WASM_CONTRACT_GAS
        .set(register_histogram_vec!(
            "ioi_wasm_contract_gas",
            "Sandbox gas consumed per contract call.",
            &["entry"],
            exponential_buckets(1_000.0, 10.0, 10)?
        )?)
        .map_err(|_| already_installed())?;
    WASM_CALL_DURATION_SECONDS
        .set(register_histogram_vec!(
            "ioi_wasm_call_duration_seconds",
            "Wall-clock duration of contract calls.",
            &["entry"],
            exponential_buckets(0.0001, 2.0, 16)?
        )?)
        .map_err(|_| already_installed())?;
    WASM_CODES_STORED_TOTAL
        .set(register_int_counter_vec!(
            "ioi_wasm_codes_stored_total",
            "Total wasm codes stored, by path.",
            &["kind"]
        )?)
        .map_err(|_| already_installed())?;
    WASM_SNAPSHOT_ITEMS_TOTAL
        .set(register_int_counter_vec!(
            "ioi_wasm_snapshot_items_total",
            "Total wasm snapshot items, by direction.",
            &["direction"]
        )?)
        .map_err(|_| already_installed())?;
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "ioi_errors_total",
            "Total errors, by kind and stable code.",
            &["kind", "code"]
        )?)
        .map_err(|_| already_installed())?;

    let sink: &'static dyn MetricsSink = &PROMETHEUS_SINK;
    SINK.set(sink).map_err(|_| already_installed())?;
    Ok(sink)
}

/// Renders the default registry in the Prometheus text exposition format.
pub fn gather_text() -> Result<String, prometheus::Error> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_once_and_record() {
        let sink = install().unwrap();
        sink.inc_contract_calls("sudo", "ok");
        sink.inc_error("wasm", "WASM_CODE_EXISTS");
        crate::wasm_metrics().inc_codes_stored("checked");

        let text = gather_text().unwrap();
        assert!(text.contains("ioi_wasm_contract_calls_total"));
        assert!(text.contains("WASM_CODE_EXISTS"));
        assert!(text.contains("ioi_wasm_codes_stored_total"));

        assert!(install().is_err());
    }
}
