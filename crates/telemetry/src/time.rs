// Path: crates/telemetry/src/time.rs
use crate::sinks::WasmMetricsSink;
use std::time::Instant;

/// Observes the elapsed time of a contract call when dropped.
pub struct Timer<'a> {
    sink: &'a dyn WasmMetricsSink,
    entry: &'static str,
    start: Instant,
}

impl<'a> Timer<'a> {
    /// Starts timing `entry`.
    pub fn new(sink: &'a dyn WasmMetricsSink, entry: &'static str) -> Self {
        Self {
            sink,
            entry,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_call_duration(self.entry, self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<(&'static str, f64)>>);

    impl WasmMetricsSink for Recorder {
        fn inc_contract_calls(&self, _entry: &'static str, _outcome: &'static str) {}
        fn observe_contract_gas(&self, _entry: &'static str, _gas: u64) {}
        fn observe_call_duration(&self, entry: &'static str, duration_secs: f64) {
            self.0.lock().unwrap().push((entry, duration_secs));
        }
        fn inc_codes_stored(&self, _kind: &'static str) {}
        fn inc_snapshot_items(&self, _direction: &'static str) {}
    }

    #[test]
    fn test_timer_observes_on_drop() {
        let rec = Recorder::default();
        {
            let _t = Timer::new(&rec, "sudo");
        }
        let seen = rec.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "sudo");
        assert!(seen[0].1 >= 0.0);
    }
}
