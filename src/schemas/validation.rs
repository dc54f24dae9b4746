use std::sync::OnceLock;

use chrono::NaiveDate;
use jsonschema::{Draft, JSONSchema};
use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    error::{Result, SchemaRule},
    schemas::{decode_structured, CompletionSchema, SchemaHandle},
    services::heuristic::clock_time,
    types::{
        itinerary::{ActivityCategory, DayMap, DayPlan},
        trip::{parse_day_key, TripParameters},
    },
};

const MAX_SCHEMA_ERRORS: usize = 3;
const MEAL_SLOTS: [&str; 3] = ["breakfast", "lunch", "dinner"];

/// Validate a candidate day-keyed object and decode it into typed days.
///
/// Rules are checked in a fixed order and the first violation is returned:
/// no day beyond the requested duration, every `day1..dayN` present, each
/// day an object with a non-empty `activities` array and a `meals` object,
/// activity times in `HH:MM`, then the decoded day must satisfy the `DayPlan`
/// schema. A violation is reported as `PlannerError::SchemaViolation`.
pub fn validate_candidate(
    candidate: &Value,
    params: &TripParameters,
    today: NaiveDate,
) -> Result<DayMap> {
    let Some(object) = candidate.as_object() else {
        return Err(SchemaRule::MissingDayKey { day: 1 }.into());
    };

    if let Some(key) = object
        .keys()
        .find(|key| parse_day_key(key).is_some_and(|day| day > params.duration_days))
    {
        return Err(SchemaRule::UnexpectedDayKey { key: key.clone() }.into());
    }

    let mut days = DayMap::new();
    for day in 1..=params.duration_days {
        let value = find_day(object, day).ok_or(SchemaRule::MissingDayKey { day })?;
        days.insert(validate_day(day, value, params, today)?);
    }

    Ok(days)
}

/// Validate one day value and decode it into a `DayPlan`.
pub fn validate_day(
    day: u32,
    value: &Value,
    params: &TripParameters,
    today: NaiveDate,
) -> std::result::Result<DayPlan, SchemaRule> {
    let Some(object) = value.as_object() else {
        return Err(SchemaRule::DayNotObject { day });
    };

    let activities = object
        .get("activities")
        .and_then(Value::as_array)
        .ok_or(SchemaRule::MissingActivities { day })?;
    if activities.is_empty() {
        return Err(SchemaRule::EmptyActivities { day });
    }

    if !object.get("meals").is_some_and(Value::is_object) {
        return Err(SchemaRule::MissingMeals { day });
    }

    let date = params.date_for_day(day, today);
    let (coerced, has_total) = coerce_day(object, day, date);
    check_times(day, &coerced)?;

    validate_against_schema(DayPlan::schema(), &coerced)
        .map_err(|detail| SchemaRule::FieldShape { day, detail })?;

    let mut plan = decode_structured::<DayPlan>(&coerced).map_err(|err| {
        SchemaRule::FieldShape {
            day,
            detail: err.to_string(),
        }
    })?;

    if !has_total {
        plan.total_cost = round_cents(plan.constituent_cost());
    }

    Ok(plan)
}

/// Every string activity time must be a 24h clock time once coerced.
fn check_times(day: u32, coerced: &Value) -> std::result::Result<(), SchemaRule> {
    let times = coerced["activities"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|activity| activity.get("time").and_then(Value::as_str));

    for time in times {
        if !clock_pattern().is_match(time) {
            return Err(SchemaRule::InvalidTime {
                day,
                time: time.to_string(),
            });
        }
    }
    Ok(())
}

/// Look up `dayN`, tolerating case differences in the key.
pub(crate) fn find_day(object: &Map<String, Value>, day: u32) -> Option<&Value> {
    object
        .get(&format!("day{}", day))
        .or_else(|| {
            object
                .iter()
                .find(|(key, _)| parse_day_key(key) == Some(day))
                .map(|(_, value)| value)
        })
}

/// Validate a payload against a schema handle with Draft 7 rules.
pub(crate) fn validate_against_schema(
    schema: &SchemaHandle,
    payload: &Value,
) -> std::result::Result<(), String> {
    let validator = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema.schema_json())
        .map_err(|err| {
            format!(
                "failed to prepare `{}` schema for validation: {}",
                schema.schema_name(),
                err
            )
        })?;

    if let Err(errors) = validator.validate(payload) {
        let mut details = Vec::new();
        let mut truncated = false;

        for (idx, error) in errors.enumerate() {
            if idx < MAX_SCHEMA_ERRORS {
                let mut path = error.instance_path.to_string();
                if path.is_empty() {
                    path = "<root>".to_string();
                }
                details.push(format!("{}: {}", path, error));
            } else {
                truncated = true;
                break;
            }
        }

        let mut detail = if details.is_empty() {
            "payload failed schema validation".to_string()
        } else {
            details.join("; ")
        };

        if truncated {
            detail.push_str("; additional errors truncated");
        }

        return Err(format!(
            "does not match `{}` schema: {}",
            schema.schema_name(),
            detail
        ));
    }

    Ok(())
}

/// Rewrite the loosely-typed fields models commonly get wrong.
///
/// Index and date are always set from the request. Returns whether the model
/// reported its own `totalCost`.
fn coerce_day(object: &Map<String, Value>, day: u32, date: NaiveDate) -> (Value, bool) {
    let mut out = object.clone();
    out.insert("dayIndex".to_string(), Value::from(day));
    out.insert("date".to_string(), Value::String(date.to_string()));

    let has_total = out.get("totalCost").is_some_and(|total| !total.is_null());
    coerce_cost_field(&mut out, "totalCost");

    if let Some(Value::Array(activities)) = out.get_mut("activities") {
        for activity in activities.iter_mut() {
            if let Value::Object(activity) = activity {
                coerce_cost_field(activity, "cost");
                coerce_time(activity);
                coerce_category(activity);
                coerce_text_field(activity, "duration");
            }
        }
    }

    if let Some(Value::Object(meals)) = out.get_mut("meals") {
        for slot in MEAL_SLOTS {
            match meals.get_mut(slot) {
                Some(Value::Object(meal)) => coerce_cost_field(meal, "cost"),
                Some(Value::String(name)) => {
                    let name = name.clone();
                    meals.insert(slot.to_string(), serde_json::json!({ "name": name }));
                }
                Some(Value::Null) => {
                    meals.remove(slot);
                }
                _ => {}
            }
        }
    }

    match out.get_mut("transportation") {
        Some(Value::Object(transport)) => coerce_cost_field(transport, "cost"),
        Some(Value::String(method)) => {
            let method = method.clone();
            out.insert(
                "transportation".to_string(),
                serde_json::json!({ "method": method }),
            );
        }
        Some(Value::Null) => {
            out.remove("transportation");
        }
        _ => {}
    }

    if let Some(Value::String(highlight)) = out.get("highlights") {
        let highlight = highlight.clone();
        out.insert("highlights".to_string(), Value::from(vec![highlight]));
    }

    if let Some(Value::Array(tips)) = out.get("tips") {
        let joined = tips
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        out.insert("tips".to_string(), Value::String(joined));
    }

    (Value::Object(out), has_total)
}

fn coerce_cost_field(object: &mut Map<String, Value>, field: &str) {
    match object.get(field) {
        Some(Value::Null) => {
            object.remove(field);
        }
        Some(Value::String(text)) => {
            let amount = parse_amount(text).unwrap_or(0.0);
            object.insert(field.to_string(), Value::from(amount));
        }
        _ => {}
    }
}

/// Loose clock times such as "9 am" are rewritten as `HH:MM`.
fn coerce_time(activity: &mut Map<String, Value>) {
    if let Some(Value::String(text)) = activity.get("time") {
        if let Some(time) = clock_time(text) {
            activity.insert("time".to_string(), Value::String(time));
        }
    }
}

fn coerce_category(activity: &mut Map<String, Value>) {
    match activity.get("category") {
        Some(Value::String(label)) => {
            let category = ActivityCategory::from_label(label);
            activity.insert(
                "category".to_string(),
                Value::String(category.as_str().to_string()),
            );
        }
        Some(_) => {
            activity.remove("category");
        }
        None => {}
    }
}

fn coerce_text_field(object: &mut Map<String, Value>, field: &str) {
    if let Some(Value::Number(number)) = object.get(field) {
        let text = number.to_string();
        object.insert(field.to_string(), Value::String(text));
    }
}

fn clock_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("clock pattern is valid"))
}

fn amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("amount pattern is valid"))
}

/// First number in a price string: "$25" -> 25, "20-30 EUR" -> 20, "1,200" -> 1200.
pub(crate) fn parse_amount(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    amount_pattern()
        .find(&cleaned)
        .and_then(|found| found.as_str().parse::<f64>().ok())
}

pub(crate) fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
