use std::{fmt, sync::Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Counters for one planning run, returned to the caller rather than kept globally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileMetrics {
    pub model_calls: usize,
    pub retries: usize,
    pub timeouts: usize,
    pub transport_errors: usize,
    pub parse_failures: usize,
    pub validation_failures: usize,
    pub heuristic_repairs: usize,
    pub days_recovered: usize,
    pub days_synthesized: usize,
    pub fallbacks: usize,
}

impl ReconcileMetrics {
    pub fn merge(&mut self, other: &ReconcileMetrics) {
        self.model_calls += other.model_calls;
        self.retries += other.retries;
        self.timeouts += other.timeouts;
        self.transport_errors += other.transport_errors;
        self.parse_failures += other.parse_failures;
        self.validation_failures += other.validation_failures;
        self.heuristic_repairs += other.heuristic_repairs;
        self.days_recovered += other.days_recovered;
        self.days_synthesized += other.days_synthesized;
        self.fallbacks += other.fallbacks;
    }
}

/// Receives the counters of every finished run.
pub trait MetricsSink: Send + Sync + fmt::Debug {
    fn record(&self, component: &str, metrics: &ReconcileMetrics);
}

/// Emits each run's counters as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn record(&self, component: &str, metrics: &ReconcileMetrics) {
        info!(
            target: "trip_agent::metrics",
            component,
            model_calls = metrics.model_calls,
            retries = metrics.retries,
            timeouts = metrics.timeouts,
            parse_failures = metrics.parse_failures,
            heuristic_repairs = metrics.heuristic_repairs,
            fallbacks = metrics.fallbacks,
            "run finished"
        );
    }
}

/// Aggregates counters across runs, for tests and dashboards.
#[derive(Debug, Default)]
pub struct InMemorySink {
    state: Mutex<InMemoryState>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    runs: Vec<String>,
    totals: ReconcileMetrics,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn totals(&self) -> ReconcileMetrics {
        self.state
            .lock()
            .map(|state| state.totals.clone())
            .unwrap_or_default()
    }

    /// Component names in the order their runs finished
    pub fn runs(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.runs.clone())
            .unwrap_or_default()
    }
}

impl MetricsSink for InMemorySink {
    fn record(&self, component: &str, metrics: &ReconcileMetrics) {
        if let Ok(mut state) = self.state.lock() {
            state.runs.push(component.to_string());
            state.totals.merge(metrics);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_sink_aggregates() {
        let sink = InMemorySink::new();
        let run = ReconcileMetrics {
            model_calls: 2,
            retries: 1,
            fallbacks: 1,
            ..Default::default()
        };
        sink.record("itinerary", &run);
        sink.record("budget", &run);

        let totals = sink.totals();
        assert_eq!(totals.model_calls, 4);
        assert_eq!(totals.retries, 2);
        assert_eq!(sink.runs(), vec!["itinerary", "budget"]);
    }
}
