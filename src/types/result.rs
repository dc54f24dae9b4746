use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::itinerary::{ItineraryResult, Origin};
use crate::core::{metrics::ReconcileMetrics, steps::ReconcileStep};

/// Result of one itinerary reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRun {
    /// The itinerary handed to the caller
    pub result: ItineraryResult,
    /// Every state transition, in order
    pub steps: Vec<ReconcileStep>,
    pub metrics: ReconcileMetrics,
    /// Total wall-clock duration
    pub duration: Duration,
}

impl ReconcileRun {
    pub fn new(
        result: ItineraryResult,
        steps: Vec<ReconcileStep>,
        metrics: ReconcileMetrics,
        duration: Duration,
    ) -> Self {
        Self {
            result,
            steps,
            metrics,
            duration,
        }
    }

    /// Generate a human-readable replay of the run
    pub fn replay(&self) -> String {
        let mut lines = Vec::new();

        lines.push("=== Itinerary Reconciliation Trace ===".to_string());
        lines.push(format!("Duration: {:.2}s", self.duration.as_secs_f64()));
        lines.push(format!("Model calls: {}", self.metrics.model_calls));
        lines.push(self.outcome_line());

        lines.push(String::new());
        lines.push("--- Steps ---".to_string());

        for (idx, step) in self.steps.iter().enumerate() {
            lines.push(format!("{}. {}", idx + 1, step.describe()));
        }

        lines.join("\n")
    }

    /// Replay plus step details and a per-day summary
    pub fn explain(&self) -> String {
        let mut lines = Vec::new();

        lines.push("=== Itinerary Reconciliation Explanation ===".to_string());
        lines.push(format!("Duration: {:.2}s", self.duration.as_secs_f64()));
        lines.push(self.outcome_line());

        lines.push(String::new());
        lines.push("--- Detailed Steps ---".to_string());

        for (idx, step) in self.steps.iter().enumerate() {
            lines.push(format!("\n{}. {}", idx + 1, step.describe()));

            match step {
                ReconcileStep::ModelCallFailed {
                    retryable, error, ..
                } => {
                    lines.push(format!("   Retryable: {}", retryable));
                    lines.push(format!("   Error: {}", error));
                }
                ReconcileStep::ValidationFailed {
                    rule,
                    detail,
                    repaired,
                } => {
                    lines.push(format!("   Rule: {}", rule));
                    lines.push(format!("   Detail: {}", detail));
                    lines.push(format!("   After repair: {}", repaired));
                }
                ReconcileStep::HeuristicRepair {
                    recovered_days,
                    synthesized_days,
                } => {
                    lines.push(format!("   Recovered: {:?}", recovered_days));
                    lines.push(format!("   Synthesized: {:?}", synthesized_days));
                }
                _ => {}
            }
        }

        lines.push(String::new());
        lines.push("--- Days ---".to_string());
        for day in self.result.days().iter() {
            lines.push(format!(
                "day{} {} \"{}\": {} activities, total {:.2}",
                day.day_index,
                day.date,
                day.theme,
                day.activities.len(),
                day.total_cost
            ));
        }

        lines.join("\n")
    }

    pub fn is_fallback(&self) -> bool {
        self.result.origin() == Origin::Fallback
    }

    /// Number of model calls made, failed ones included
    pub fn attempts(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| {
                matches!(
                    step,
                    ReconcileStep::ModelInvoked { .. } | ReconcileStep::ModelCallFailed { .. }
                )
            })
            .count()
    }

    /// Error messages of failed model calls, parses and validations
    pub fn errors(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                ReconcileStep::ModelCallFailed { error, .. } => Some(error.as_str()),
                ReconcileStep::ParseFailed { error } => Some(error.as_str()),
                ReconcileStep::ValidationFailed { detail, .. } => Some(detail.as_str()),
                _ => None,
            })
            .collect()
    }

    fn outcome_line(&self) -> String {
        let metadata = self.result.metadata();
        match (metadata.origin, metadata.reason) {
            (Origin::Model, None) => "Outcome: model".to_string(),
            (Origin::Model, Some(reason)) => format!(
                "Outcome: model, repaired after {} (days {:?})",
                reason, metadata.repaired_days
            ),
            (Origin::Fallback, Some(reason)) => format!("Outcome: fallback ({})", reason),
            (Origin::Fallback, None) => "Outcome: fallback".to_string(),
        }
    }
}
