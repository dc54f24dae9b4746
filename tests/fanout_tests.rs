mod common;

use async_trait::async_trait;
use common::{itinerary_json, planner, today};
use serde_json::json;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use trip_agent_rs::{
    CompletionModel, CompletionRequest, FallbackReason, InMemorySink, Origin, PlannerError,
    Result, TripParameters,
};

/// Answers each agent according to its system prompt.
#[derive(Debug, Default)]
struct AgentDesk {
    garbage_for: Option<&'static str>,
}

#[async_trait]
impl CompletionModel for AgentDesk {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if let Some(agent) = self.garbage_for {
            if request.system.contains(agent) {
                return Ok("I'd rather not say.".to_string());
            }
        }

        let answer = if request.system.contains("Budget Analyst") {
            json!({
                "totalBudget": 1500,
                "perDay": 500,
                "perTraveler": 750,
                "categories": [
                    { "name": "Accommodation", "amount": 600, "percentage": 40 },
                    { "name": "Food", "amount": 400, "percentage": 26.7 }
                ],
                "savingTips": ["Buy a Viva Viagem card"]
            })
        } else if request.system.contains("Destination Research") {
            json!({
                "destination": "Lisbon",
                "overview": "Hilly capital on the Tagus.",
                "bestAreas": ["Chiado", "Alfama"]
            })
        } else if request.system.contains("Travel Coordinator") {
            json!({
                "summary": "Three relaxed days.",
                "bookingChecklist": ["Hotel"],
                "timeline": ["Book flights"]
            })
        } else {
            itinerary_json(3)
        };

        Ok(format!("```json\n{}\n```", answer))
    }
}

fn params() -> TripParameters {
    TripParameters::new("Lisbon", 1500.0, 3, 2).with_interests(["food"])
}

#[tokio::test]
async fn all_sections_come_from_the_model() {
    let planner = planner(AgentDesk::default());

    let plan = assert_ok!(planner.plan_trip(&params()).await);

    assert_eq!(plan.fallback_sections(), 0);
    assert_eq!(plan.budget.content.categories.len(), 2);
    assert_eq!(plan.insights.content.best_areas, vec!["Chiado", "Alfama"]);
    assert_eq!(plan.coordination.content.summary, "Three relaxed days.");
    assert_eq!(plan.itinerary.origin(), Origin::Model);
    assert_eq!(plan.metrics.model_calls, 4);
}

#[tokio::test]
async fn one_broken_section_does_not_affect_the_others() {
    let planner = planner(AgentDesk {
        garbage_for: Some("Destination Research"),
    });

    let plan = assert_ok!(planner.plan_trip(&params()).await);

    assert!(plan.insights.is_fallback());
    assert_eq!(plan.insights.reason, Some(FallbackReason::MalformedPayload));
    assert_eq!(plan.insights.content.destination, "Lisbon");
    assert!(!plan.budget.is_fallback());
    assert!(!plan.coordination.is_fallback());
    assert_eq!(plan.itinerary.day_keys(), vec!["day1", "day2", "day3"]);
    assert_eq!(plan.fallback_sections(), 1);
}

#[tokio::test]
async fn itinerary_section_falls_back_independently() {
    let planner = planner(AgentDesk {
        garbage_for: Some("Itinerary Planner"),
    });

    let plan = assert_ok!(planner.plan_trip(&params()).await);

    assert_eq!(plan.itinerary.origin(), Origin::Fallback);
    assert_eq!(plan.itinerary.day(1).unwrap().date, today());
    assert!(!plan.budget.is_fallback());
}

#[tokio::test]
async fn schema_mismatch_uses_template() {
    #[derive(Debug)]
    struct WrongShape;

    #[async_trait]
    impl CompletionModel for WrongShape {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            Ok("{\"totalBudget\": \"lots\", \"categories\": []}".to_string())
        }
    }

    let sink = Arc::new(InMemorySink::new());
    let planner = planner(WrongShape).with_metrics_sink(sink.clone());

    let plan = assert_ok!(planner.plan_trip(&params()).await);

    assert_eq!(plan.budget.reason, Some(FallbackReason::SchemaViolation));
    assert_eq!(plan.fallback_sections(), 4);

    let mut runs = sink.runs();
    runs.sort();
    assert_eq!(runs, vec!["budget", "coordination", "insights", "itinerary"]);
    assert_eq!(sink.totals().fallbacks, 4);
}

#[tokio::test]
async fn invalid_trip_is_rejected_up_front() {
    let planner = planner(AgentDesk::default());
    let err = assert_err!(
        planner
            .plan_trip(&TripParameters::new("Lisbon", -5.0, 3, 2))
            .await
    );
    assert!(matches!(err, PlannerError::InvalidRequest(_)));
}
