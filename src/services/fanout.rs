use std::time::Instant;

use tracing::{info, warn};

use super::{
    fallback::{fallback_budget_analysis, fallback_coordination_plan, fallback_destination_insights},
    normalizer::normalize_response,
    parser::parse_structured,
    prompt::build_agent_prompt,
};
use crate::{
    core::{
        agents::{
            AgentProfile, BUDGET_ANALYST, DESTINATION_RESEARCHER, ITINERARY_PLANNER,
            TRAVEL_COORDINATOR,
        },
        metrics::ReconcileMetrics,
        planner::Planner,
        steps::{ReconcileStep, RunLog},
    },
    error::Result,
    schemas::{decode_structured, validation::validate_against_schema, CompletionSchema},
    types::{
        itinerary::{FallbackReason, ItineraryResult},
        sections::{BudgetAnalysis, CoordinationPlan, DestinationInsights, Section, TripPlan},
        trip::TripParameters,
    },
};

impl Planner {
    /// Run all four planning agents concurrently.
    ///
    /// Each section resolves on its own: a section whose model call or payload
    /// fails is replaced by its template without affecting the others.
    pub async fn plan_trip(&self, params: &TripParameters) -> Result<TripPlan> {
        params.validate()?;

        let started = Instant::now();
        let today = self.clock().today();

        let (budget, insights, itinerary, coordination) = tokio::join!(
            self.run_section::<BudgetAnalysis>(&BUDGET_ANALYST, params, || {
                fallback_budget_analysis(params)
            }),
            self.run_section::<DestinationInsights>(&DESTINATION_RESEARCHER, params, || {
                fallback_destination_insights(params)
            }),
            self.itinerary_section(params),
            self.run_section::<CoordinationPlan>(&TRAVEL_COORDINATOR, params, || {
                fallback_coordination_plan(params, today)
            }),
        );

        let mut metrics = ReconcileMetrics::default();
        for section_metrics in [&budget.1, &insights.1, &itinerary.1, &coordination.1] {
            metrics.merge(section_metrics);
        }

        let plan = TripPlan {
            parameters: params.clone(),
            budget: budget.0,
            insights: insights.0,
            itinerary: itinerary.0,
            coordination: coordination.0,
            metrics,
            duration: started.elapsed(),
        };

        info!(
            target: "trip_agent::agents",
            destination = %params.destination,
            fallback_sections = plan.fallback_sections(),
            model_calls = plan.metrics.model_calls,
            "trip plan assembled"
        );

        Ok(plan)
    }

    async fn itinerary_section(&self, params: &TripParameters) -> (ItineraryResult, ReconcileMetrics) {
        let mut log = RunLog::new(ITINERARY_PLANNER.role.component());
        let result = self.reconcile(params, &mut log).await;
        self.emit_metrics(log.component(), log.metrics());
        let (_, metrics) = log.into_parts();
        (result, metrics)
    }

    async fn run_section<T: CompletionSchema>(
        &self,
        profile: &'static AgentProfile,
        params: &TripParameters,
        fallback: impl FnOnce() -> T,
    ) -> (Section<T>, ReconcileMetrics) {
        let mut log = RunLog::new(profile.role.component());
        let request = self.completion_request(
            profile.system_prompt(),
            build_agent_prompt(profile, params, T::schema()),
            profile.max_tokens,
        );

        let outcome = match self.invoke_with_retry(&request, &mut log).await {
            Ok(raw) => decode_section::<T>(&raw, &mut log),
            Err(_) => Err(FallbackReason::ModelUnavailable),
        };

        let section = match outcome {
            Ok(content) => Section::from_model(content),
            Err(reason) => {
                warn!(
                    target: "trip_agent::agents",
                    agent = profile.name,
                    reason = %reason,
                    "using template section"
                );
                log.add_step(ReconcileStep::FallbackGenerated { reason });
                Section::fallback(fallback(), reason)
            }
        };

        self.emit_metrics(log.component(), log.metrics());
        let (_, metrics) = log.into_parts();
        (section, metrics)
    }
}

/// Normalize, parse, schema-check and decode one section payload.
fn decode_section<T: CompletionSchema>(
    raw: &str,
    log: &mut RunLog,
) -> std::result::Result<T, FallbackReason> {
    let value = match parse_structured(&normalize_response(raw)) {
        Ok(value) => {
            log.add_step(ReconcileStep::Parsed);
            value
        }
        Err(err) => {
            log.add_step(ReconcileStep::ParseFailed {
                error: err.to_string(),
            });
            return Err(FallbackReason::MalformedPayload);
        }
    };

    let decoded = validate_against_schema(T::schema(), &value)
        .and_then(|_| decode_structured::<T>(&value).map_err(|err| err.to_string()));

    match decoded {
        Ok(content) => {
            log.add_step(ReconcileStep::Validated { repaired: false });
            Ok(content)
        }
        Err(detail) => {
            log.add_step(ReconcileStep::ValidationFailed {
                rule: "field_shape".to_string(),
                detail,
                repaired: false,
            });
            Err(FallbackReason::SchemaViolation)
        }
    }
}
