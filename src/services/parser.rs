use serde_json::Value;

use crate::{
    error::{PlannerError, Result},
    types::trip::parse_day_key,
};

/// Strictly decode normalized text into a JSON object.
///
/// A single wrapping object such as `{"itinerary": {"day1": ..}}` is unwrapped
/// when the top level has no day keys of its own.
pub fn parse_structured(text: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| PlannerError::MalformedPayload(format!("not valid JSON: {}", err)))?;

    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(PlannerError::MalformedPayload(format!(
                "expected a JSON object, found {}",
                kind_of(&other)
            )))
        }
    };

    if has_day_keys(&object) {
        return Ok(Value::Object(object));
    }

    let mut wrapped = object
        .iter()
        .filter(|(_, inner)| inner.as_object().is_some_and(has_day_keys));
    match (wrapped.next(), wrapped.next()) {
        (Some((_, inner)), None) => Ok(inner.clone()),
        _ => Ok(Value::Object(object)),
    }
}

fn has_day_keys(object: &serde_json::Map<String, Value>) -> bool {
    object.keys().any(|key| parse_day_key(key).is_some())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
