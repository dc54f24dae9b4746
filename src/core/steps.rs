use serde::{Deserialize, Serialize};
use tracing::info;

use super::metrics::ReconcileMetrics;
use crate::types::itinerary::FallbackReason;

/// One transition of the reconciliation state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReconcileStep {
    /// The model answered
    ModelInvoked { attempt: usize, response_chars: usize },
    /// The model call failed or timed out
    ModelCallFailed {
        attempt: usize,
        error: String,
        retryable: bool,
        timed_out: bool,
    },
    RetryScheduled { attempt: usize, delay_ms: u64 },
    Parsed,
    ParseFailed { error: String },
    Validated { repaired: bool },
    ValidationFailed { rule: String, detail: String, repaired: bool },
    /// Heuristic extraction; lists which days came from the model and which were synthesized
    HeuristicRepair {
        recovered_days: Vec<u32>,
        synthesized_days: Vec<u32>,
    },
    FallbackGenerated { reason: FallbackReason },
}

impl ReconcileStep {
    /// Get a human-readable description of the step
    pub fn describe(&self) -> String {
        match self {
            ReconcileStep::ModelInvoked {
                attempt,
                response_chars,
            } => format!(
                "📨 Model answered on attempt {} ({} chars)",
                attempt, response_chars
            ),
            ReconcileStep::ModelCallFailed {
                attempt,
                error,
                timed_out,
                ..
            } => {
                if *timed_out {
                    format!("⏱ Attempt {} timed out: {}", attempt, error)
                } else {
                    format!("❌ Attempt {} failed: {}", attempt, error)
                }
            }
            ReconcileStep::RetryScheduled { attempt, delay_ms } => {
                format!("🔁 Retrying after attempt {} in {}ms", attempt, delay_ms)
            }
            ReconcileStep::Parsed => "🧩 Parsed structured payload".to_string(),
            ReconcileStep::ParseFailed { error } => format!("⚠ Malformed payload: {}", error),
            ReconcileStep::Validated { repaired } => {
                if *repaired {
                    "✅ Repaired candidate passed validation".to_string()
                } else {
                    "✅ Model payload passed validation".to_string()
                }
            }
            ReconcileStep::ValidationFailed { rule, detail, .. } => {
                format!("🚫 Validation failed ({}): {}", rule, detail)
            }
            ReconcileStep::HeuristicRepair {
                recovered_days,
                synthesized_days,
            } => format!(
                "🛠 Heuristic repair recovered {:?}, synthesized {:?}",
                recovered_days, synthesized_days
            ),
            ReconcileStep::FallbackGenerated { reason } => {
                format!("🧯 Fallback plan generated ({})", reason)
            }
        }
    }
}

/// Ordered step record of one run; counters are derived from the steps.
#[derive(Debug, Clone)]
pub struct RunLog {
    component: &'static str,
    steps: Vec<ReconcileStep>,
    metrics: ReconcileMetrics,
}

impl RunLog {
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            steps: Vec::new(),
            metrics: ReconcileMetrics::default(),
        }
    }

    pub fn add_step(&mut self, step: ReconcileStep) {
        info!(target: "trip_agent::steps", component = self.component, "{}", step.describe());

        let metrics = &mut self.metrics;
        match &step {
            ReconcileStep::ModelInvoked { .. } => metrics.model_calls += 1,
            ReconcileStep::ModelCallFailed { timed_out, .. } => {
                metrics.model_calls += 1;
                if *timed_out {
                    metrics.timeouts += 1;
                } else {
                    metrics.transport_errors += 1;
                }
            }
            ReconcileStep::RetryScheduled { .. } => metrics.retries += 1,
            ReconcileStep::ParseFailed { .. } => metrics.parse_failures += 1,
            ReconcileStep::ValidationFailed { .. } => metrics.validation_failures += 1,
            ReconcileStep::HeuristicRepair {
                recovered_days,
                synthesized_days,
            } => {
                metrics.heuristic_repairs += 1;
                metrics.days_recovered += recovered_days.len();
                metrics.days_synthesized += synthesized_days.len();
            }
            ReconcileStep::FallbackGenerated { .. } => metrics.fallbacks += 1,
            ReconcileStep::Parsed | ReconcileStep::Validated { .. } => {}
        }

        self.steps.push(step);
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn steps(&self) -> &[ReconcileStep] {
        &self.steps
    }

    pub fn metrics(&self) -> &ReconcileMetrics {
        &self.metrics
    }

    pub fn into_parts(self) -> (Vec<ReconcileStep>, ReconcileMetrics) {
        (self.steps, self.metrics)
    }
}
