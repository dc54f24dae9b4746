mod common;

use common::{day_json, itinerary_json, planner, today, Reply, ScriptedModel};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio_test::{assert_err, assert_ok};
use trip_agent_rs::{
    normalize_response, services::fallback_days, validate_candidate, FallbackReason,
    InMemorySink, Origin, PlannerError, ReconcileStep, TripParameters,
};

fn lisbon(days: u32) -> TripParameters {
    TripParameters::new("Lisbon", 1000.0, days, 2)
}

fn assert_complete(result: &trip_agent_rs::ItineraryResult, params: &TripParameters) {
    let expected: Vec<String> = (1..=params.duration_days)
        .map(|day| format!("day{}", day))
        .collect();
    assert_eq!(result.day_keys(), expected);

    for day in result.days().iter() {
        assert!(!day.activities.is_empty(), "day{} has no activities", day.day_index);
        for cost in day.costs() {
            assert!(cost >= 0.0, "negative cost on day{}", day.day_index);
        }
    }

    let value = serde_json::to_value(result.days()).unwrap();
    assert_ok!(validate_candidate(&value, params, today()));
}

#[tokio::test]
async fn valid_answer_is_returned_unchanged() {
    let model = Arc::new(ScriptedModel::always(Reply::text(
        itinerary_json(3).to_string(),
    )));
    let planner = planner(model.clone());
    let params = lisbon(3);

    let run = assert_ok!(planner.generate_itinerary_with_trace(&params).await);
    let result = &run.result;

    assert_eq!(result.origin(), Origin::Model);
    assert_eq!(result.reason(), None);
    assert!(!result.is_degraded());
    assert_complete(result, &params);

    let day2 = result.day(2).unwrap();
    assert_eq!(day2.theme, "Theme 2");
    assert_eq!(day2.date, today().succ_opt().unwrap());
    assert_eq!(day2.activities[1].cost, 12.5);
    assert_eq!(day2.total_cost, 91.9);

    assert_eq!(model.calls(), 1);
    assert_eq!(run.metrics.model_calls, 1);
    assert_eq!(run.metrics.fallbacks, 0);
    assert!(matches!(run.steps.last(), Some(ReconcileStep::Validated { repaired: false })));
}

#[tokio::test]
async fn prose_without_json_falls_back() {
    let model = ScriptedModel::always(Reply::text(
        "I'm sorry, I can't put together a travel plan right now.",
    ));
    let planner = planner(model);
    let params = lisbon(3);

    let run = assert_ok!(planner.generate_itinerary_with_trace(&params).await);

    assert_eq!(run.result.origin(), Origin::Fallback);
    assert_eq!(run.result.reason(), Some(FallbackReason::MalformedPayload));
    assert_eq!(run.result.day_keys(), vec!["day1", "day2", "day3"]);
    assert_eq!(run.result.days(), &fallback_days(&params, today()));
    assert_eq!(run.metrics.parse_failures, 1);
    assert_eq!(run.metrics.fallbacks, 1);
}

#[tokio::test]
async fn missing_days_are_filled_in() {
    let model = ScriptedModel::always(Reply::text(itinerary_json(3).to_string()));
    let planner = planner(model);
    let params = lisbon(5);

    let run = assert_ok!(planner.generate_itinerary_with_trace(&params).await);
    let result = &run.result;

    assert_complete(result, &params);
    assert_eq!(result.origin(), Origin::Model);
    assert_eq!(result.reason(), Some(FallbackReason::SchemaViolation));
    assert!(result.metadata().repaired);
    assert_eq!(result.metadata().repaired_days, vec![4, 5]);
    assert_eq!(result.day(1).unwrap().theme, "Theme 1");
    assert_eq!(result.day(3).unwrap().theme, "Theme 3");

    assert!(run.steps.iter().any(|step| matches!(
        step,
        ReconcileStep::ValidationFailed { rule, .. } if rule == "missing_day_key"
    )));
    assert_eq!(run.metrics.days_recovered, 3);
    assert_eq!(run.metrics.days_synthesized, 2);
}

#[tokio::test]
async fn invalid_request_makes_no_model_call() {
    let model = Arc::new(ScriptedModel::always(Reply::text("{}")));
    let planner = planner(model.clone());

    let err = assert_err!(planner.generate_itinerary(&lisbon(0)).await);
    assert!(matches!(err, PlannerError::InvalidRequest(_)));

    let err = assert_err!(
        planner
            .generate_itinerary(&TripParameters::new("  ", 100.0, 2, 1))
            .await
    );
    assert_eq!(err.error_code(), "INVALID_REQUEST");

    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn prose_day_markers_are_recovered() {
    let raw = "Here's your trip!\n\
               Day 1: 9:00 am Tram 28 ride through Alfama ($3). 1pm lunch at Time Out Market.\n\
               Day 2: 10:00 Belem tower and the Jeronimos monastery, 14:30 pastel de nata tasting";
    let planner = planner(ScriptedModel::always(Reply::text(raw)));
    let params = lisbon(2);

    let result = assert_ok!(planner.generate_itinerary(&params).await);

    assert_complete(&result, &params);
    assert_eq!(result.origin(), Origin::Model);
    assert_eq!(result.reason(), Some(FallbackReason::MalformedPayload));
    assert_eq!(result.metadata().repaired_days, vec![1, 2]);

    let day1 = result.day(1).unwrap();
    assert_eq!(day1.activities[0].time, "09:00");
    assert_eq!(day1.activities[0].cost, 3.0);
    assert_eq!(day1.activities[1].time, "13:00");
    assert_eq!(result.day(2).unwrap().activities.len(), 2);
}

#[tokio::test]
async fn fenced_answer_with_trailing_commas_is_accepted() {
    let body = itinerary_json(2).to_string().replace("}}", "},}");
    let raw = format!("Sure, here you go:\n```json\n{}\n```\nHave fun!", body);
    let planner = planner(ScriptedModel::always(Reply::text(raw)));

    let result = assert_ok!(planner.generate_itinerary(&lisbon(2)).await);
    assert_eq!(result.origin(), Origin::Model);
    assert!(!result.metadata().repaired);
}

#[tokio::test]
async fn wrapped_answer_is_unwrapped() {
    let raw = json!({ "itinerary": itinerary_json(2) }).to_string();
    let planner = planner(ScriptedModel::always(Reply::text(raw)));

    let result = assert_ok!(planner.generate_itinerary(&lisbon(2)).await);
    assert_eq!(result.origin(), Origin::Model);
    assert_eq!(result.reason(), None);
}

#[tokio::test]
async fn extra_days_are_dropped_after_repair() {
    let mut payload = itinerary_json(3);
    payload["day4"] = day_json("Bonus");
    let planner = planner(ScriptedModel::always(Reply::text(payload.to_string())));
    let params = lisbon(3);

    let result = assert_ok!(planner.generate_itinerary(&params).await);

    assert_complete(&result, &params);
    assert_eq!(result.origin(), Origin::Model);
    assert_eq!(result.reason(), Some(FallbackReason::SchemaViolation));
    assert!(result.metadata().repaired_days.is_empty());
}

#[tokio::test]
async fn every_garbage_answer_yields_a_complete_itinerary() {
    let mut negative = itinerary_json(3);
    negative["day2"]["activities"][0]["cost"] = json!(-40);

    let answers = vec![
        String::new(),
        "{}".to_string(),
        "[1, 2, 3]".to_string(),
        "null".to_string(),
        "{\"day1\": 5, \"day2\": \"beach\"}".to_string(),
        "```json\n{\"day1\": {\"activities\": [], \"meals\": {}}}\n```".to_string(),
        "{\"day1\": {\"activities\": [{\"time\": \"09:00\", \"activity\": \"Castle\"".to_string(),
        negative.to_string(),
        itinerary_json(7).to_string(),
    ];

    let params = lisbon(3);
    for answer in answers {
        let planner = planner(ScriptedModel::always(Reply::text(answer.clone())));
        let result = assert_ok!(planner.generate_itinerary(&params).await);
        assert_complete(&result, &params);
        if result.origin() == Origin::Fallback {
            assert!(result.reason().is_some(), "fallback without reason for {answer:?}");
        }
    }
}

#[tokio::test]
async fn negative_cost_day_is_replaced() {
    let mut payload = itinerary_json(3);
    payload["day2"]["activities"][0]["cost"] = json!(-40);
    let planner = planner(ScriptedModel::always(Reply::text(payload.to_string())));

    let result = assert_ok!(planner.generate_itinerary(&lisbon(3)).await);

    assert_eq!(result.origin(), Origin::Model);
    assert_eq!(result.day(1).unwrap().theme, "Theme 1");
    assert!(result.metadata().repaired_days.contains(&2));
    assert!(result.day(2).unwrap().costs().all(|cost| cost >= 0.0));
}

#[tokio::test]
async fn fallback_is_deterministic() {
    let params = lisbon(4).with_interests(["wine", "tiles"]);
    let first = planner(ScriptedModel::always(Reply::text("no idea")))
        .generate_itinerary(&params)
        .await
        .unwrap();
    let second = planner(ScriptedModel::always(Reply::text("no idea")))
        .generate_itinerary(&params)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn server_errors_exhaust_retries() {
    let model = Arc::new(ScriptedModel::always(Reply::ServerError));
    let planner = planner(model.clone()).with_max_retries(2);

    let run = assert_ok!(planner.generate_itinerary_with_trace(&lisbon(3)).await);

    assert_eq!(run.result.origin(), Origin::Fallback);
    assert_eq!(run.result.reason(), Some(FallbackReason::ModelUnavailable));
    assert_eq!(model.calls(), 3);
    assert_eq!(run.attempts(), 3);
    assert_eq!(run.metrics.retries, 2);
    assert_eq!(run.metrics.transport_errors, 3);
}

#[tokio::test]
async fn transient_error_then_success() {
    let model = Arc::new(ScriptedModel::sequence(vec![
        Reply::ServerError,
        Reply::text(itinerary_json(2).to_string()),
    ]));
    let planner = planner(model.clone());

    let run = assert_ok!(planner.generate_itinerary_with_trace(&lisbon(2)).await);

    assert_eq!(run.result.origin(), Origin::Model);
    assert_eq!(model.calls(), 2);
    assert_eq!(run.metrics.retries, 1);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let model = Arc::new(ScriptedModel::always(Reply::BadRequest));
    let planner = planner(model.clone()).with_max_retries(5);

    let run = assert_ok!(planner.generate_itinerary_with_trace(&lisbon(2)).await);

    assert_eq!(run.result.reason(), Some(FallbackReason::ModelUnavailable));
    assert_eq!(model.calls(), 1);
    assert_eq!(run.metrics.retries, 0);
}

#[tokio::test]
async fn hanging_model_times_out() {
    let model = Arc::new(ScriptedModel::always(Reply::Hang));
    let planner = planner(model.clone())
        .with_timeout(Duration::from_millis(20))
        .with_max_retries(1);

    let run = assert_ok!(planner.generate_itinerary_with_trace(&lisbon(2)).await);

    assert_eq!(run.result.origin(), Origin::Fallback);
    assert_eq!(run.result.reason(), Some(FallbackReason::ModelUnavailable));
    assert_eq!(run.metrics.timeouts, 2);
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn metrics_are_pushed_to_the_sink() {
    let sink = Arc::new(InMemorySink::new());
    let planner = planner(ScriptedModel::always(Reply::text("garbage")))
        .with_metrics_sink(sink.clone());

    planner.generate_itinerary(&lisbon(2)).await.unwrap();
    planner.generate_itinerary(&lisbon(2)).await.unwrap();

    assert_eq!(sink.runs(), vec!["itinerary", "itinerary"]);
    let totals = sink.totals();
    assert_eq!(totals.model_calls, 2);
    assert_eq!(totals.fallbacks, 2);
}

#[tokio::test]
async fn prompt_reaches_the_model() {
    let model = Arc::new(ScriptedModel::always(Reply::text(
        itinerary_json(3).to_string(),
    )));
    let planner = planner(model.clone()).with_temperature(0.2);

    planner.generate_itinerary(&lisbon(3)).await.unwrap();

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].prompt.contains("\"day1\", \"day2\", \"day3\""));
    assert!(requests[0].system.contains("Itinerary Planner"));
    assert_eq!(requests[0].temperature, 0.2);
}

#[test]
fn normalizer_is_idempotent_on_model_answers() {
    let answers = [
        itinerary_json(2).to_string(),
        format!("```json\n{}\n```", itinerary_json(1)),
        "Day 1: 9am museum".to_string(),
        "{ \"a\": [1,2,], }".to_string(),
    ];
    for answer in answers {
        let once = normalize_response(&answer);
        assert_eq!(normalize_response(&once), once);
    }
}

#[tokio::test]
async fn non_clock_times_send_days_to_repair() {
    let mut answer = itinerary_json(2);
    answer["day1"]["activities"][0]["time"] = json!("Morning");
    answer["day2"]["activities"][0]["time"] = json!("27:99");
    let planner = planner(ScriptedModel::always(Reply::text(answer.to_string())));
    let params = lisbon(2);

    let run = assert_ok!(planner.generate_itinerary_with_trace(&params).await);
    let result = &run.result;

    assert_eq!(result.origin(), Origin::Model);
    assert!(result.metadata().repaired);
    assert_eq!(result.reason(), Some(FallbackReason::SchemaViolation));
    assert_eq!(result.metadata().repaired_days, vec![1, 2]);
    assert_complete(result, &params);

    for day in result.days().iter() {
        for activity in &day.activities {
            assert_ne!(activity.time, "Morning");
            assert_ne!(activity.time, "27:99");
        }
    }

    assert!(run.steps.iter().any(|step| matches!(
        step,
        ReconcileStep::ValidationFailed { rule, .. } if rule == "invalid_time"
    )));
}

#[tokio::test]
async fn loose_clock_times_are_accepted_as_is() {
    let mut answer = itinerary_json(1);
    answer["day1"]["activities"][0]["time"] = json!("9 am");
    answer["day1"]["activities"][1]["time"] = json!("3:15 pm");
    let planner = planner(ScriptedModel::always(Reply::text(answer.to_string())));

    let result = assert_ok!(planner.generate_itinerary(&lisbon(1)).await);

    assert!(!result.metadata().repaired);
    let day1 = result.day(1).unwrap();
    assert_eq!(day1.activities[0].time, "09:00");
    assert_eq!(day1.activities[1].time, "15:15");
}
