use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    fallback::generate_fallback,
    heuristic::{extract_heuristically, RepairStrategy},
    normalizer::normalize_response,
    parser::parse_structured,
    prompt::build_itinerary_prompt,
};
use crate::{
    core::{
        agents::ITINERARY_PLANNER,
        planner::Planner,
        steps::{ReconcileStep, RunLog},
    },
    error::{Result, SchemaRule},
    schemas::validate_candidate,
    types::{
        itinerary::{DayMap, FallbackReason, ItineraryMetadata, ItineraryResult, Origin},
        result::ReconcileRun,
        trip::TripParameters,
    },
};

/// Why a candidate is being validated a second time.
#[derive(Debug)]
struct RepairContext {
    trigger: FallbackReason,
    repaired_days: Vec<u32>,
}

#[derive(Debug)]
enum Stage {
    Invoking,
    Parsing {
        raw: String,
    },
    Validating {
        raw: String,
        candidate: Value,
        repair: Option<RepairContext>,
    },
    HeuristicRepair {
        raw: String,
        parsed: Option<Value>,
        trigger: FallbackReason,
    },
    FallbackGenerating {
        reason: FallbackReason,
    },
    Done(ItineraryResult),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Invoking => "invoking",
            Stage::Parsing { .. } => "parsing",
            Stage::Validating { .. } => "validating",
            Stage::HeuristicRepair { .. } => "heuristic_repair",
            Stage::FallbackGenerating { .. } => "fallback_generating",
            Stage::Done(_) => "done",
        }
    }
}

impl Planner {
    /// Produce a complete itinerary for `params`.
    ///
    /// Only an invalid request is reported as an error, and in that case no
    /// model call is made. Every other failure degrades to a repaired or
    /// template itinerary whose metadata says what happened.
    pub async fn generate_itinerary(&self, params: &TripParameters) -> Result<ItineraryResult> {
        Ok(self.generate_itinerary_with_trace(params).await?.result)
    }

    /// Like [`Planner::generate_itinerary`], also returning the step trace and counters.
    pub async fn generate_itinerary_with_trace(
        &self,
        params: &TripParameters,
    ) -> Result<ReconcileRun> {
        params.validate()?;

        let started = Instant::now();
        let mut log = RunLog::new(ITINERARY_PLANNER.role.component());
        let result = self.reconcile(params, &mut log).await;
        self.emit_metrics(log.component(), log.metrics());

        let (steps, metrics) = log.into_parts();
        Ok(ReconcileRun::new(result, steps, metrics, started.elapsed()))
    }

    /// Drive one request through the reconciliation stages. Never fails.
    pub(crate) async fn reconcile(&self, params: &TripParameters, log: &mut RunLog) -> ItineraryResult {
        let today = self.clock().today();
        let mut stage = Stage::Invoking;

        loop {
            debug!(target: "trip_agent::orchestrator", stage = stage.name(), "entering stage");

            stage = match stage {
                Stage::Invoking => {
                    let request = self.completion_request(
                        ITINERARY_PLANNER.system_prompt(),
                        build_itinerary_prompt(params),
                        ITINERARY_PLANNER.max_tokens,
                    );
                    match self.invoke_with_retry(&request, log).await {
                        Ok(raw) => Stage::Parsing { raw },
                        Err(err) => {
                            warn!(
                                target: "trip_agent::orchestrator",
                                error = %err,
                                "model unavailable, generating fallback itinerary"
                            );
                            Stage::FallbackGenerating {
                                reason: FallbackReason::ModelUnavailable,
                            }
                        }
                    }
                }
                Stage::Parsing { raw } => match parse_structured(&normalize_response(&raw)) {
                    Ok(parsed) => {
                        log.add_step(ReconcileStep::Parsed);
                        Stage::Validating {
                            raw,
                            candidate: parsed,
                            repair: None,
                        }
                    }
                    Err(err) => {
                        log.add_step(ReconcileStep::ParseFailed {
                            error: err.to_string(),
                        });
                        Stage::HeuristicRepair {
                            raw,
                            parsed: None,
                            trigger: FallbackReason::MalformedPayload,
                        }
                    }
                },
                Stage::Validating {
                    raw,
                    candidate,
                    repair,
                } => match validate_candidate(&candidate, params, today) {
                    Ok(days) => {
                        log.add_step(ReconcileStep::Validated {
                            repaired: repair.is_some(),
                        });
                        Stage::Done(self.model_result(days, repair))
                    }
                    Err(err) => {
                        let rule = err.schema_rule().map_or(err.error_code(), SchemaRule::name);
                        log.add_step(ReconcileStep::ValidationFailed {
                            rule: rule.to_string(),
                            detail: err.to_string(),
                            repaired: repair.is_some(),
                        });
                        match repair {
                            None => Stage::HeuristicRepair {
                                raw,
                                parsed: Some(candidate),
                                trigger: FallbackReason::SchemaViolation,
                            },
                            Some(_) => Stage::FallbackGenerating {
                                reason: FallbackReason::SchemaViolation,
                            },
                        }
                    }
                },
                Stage::HeuristicRepair {
                    raw,
                    parsed,
                    trigger,
                } => {
                    let outcome = extract_heuristically(&raw, parsed.as_ref(), params, today);
                    log.add_step(ReconcileStep::HeuristicRepair {
                        recovered_days: outcome.recovered_days(),
                        synthesized_days: outcome.synthesized_days(),
                    });

                    if outcome.recovered_any() {
                        let repaired_days = outcome
                            .provenance
                            .iter()
                            .filter(|entry| entry.strategy != RepairStrategy::SalvageParsedDay)
                            .map(|entry| entry.day)
                            .collect();
                        Stage::Validating {
                            raw,
                            candidate: outcome.candidate,
                            repair: Some(RepairContext {
                                trigger,
                                repaired_days,
                            }),
                        }
                    } else {
                        Stage::FallbackGenerating { reason: trigger }
                    }
                }
                Stage::FallbackGenerating { reason } => {
                    log.add_step(ReconcileStep::FallbackGenerated { reason });
                    Stage::Done(generate_fallback(
                        params,
                        reason,
                        self.clock(),
                        Some(self.model_name()),
                    ))
                }
                Stage::Done(result) => {
                    info!(
                        target: "trip_agent::orchestrator",
                        origin = ?result.origin(),
                        reason = ?result.reason(),
                        repaired = result.metadata().repaired,
                        days = result.days().len(),
                        "itinerary reconciled"
                    );
                    return result;
                }
            };
        }
    }

    fn model_result(&self, days: DayMap, repair: Option<RepairContext>) -> ItineraryResult {
        let (reason, repaired, repaired_days) = match repair {
            Some(context) => (Some(context.trigger), true, context.repaired_days),
            None => (None, false, Vec::new()),
        };

        ItineraryResult::new(
            days,
            ItineraryMetadata {
                origin: Origin::Model,
                reason,
                repaired,
                repaired_days,
                generated_at: self.clock().now(),
                model: Some(self.model_name().to_string()),
            },
        )
    }
}
