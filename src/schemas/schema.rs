use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{any::type_name, fmt, sync::Arc};
use tracing::warn;

/// Cached JSON schema handle associated with a response type.
#[derive(Clone, Debug)]
pub struct SchemaHandle {
    schema_name: &'static str,
    type_name: &'static str,
    schema_json: Arc<Value>,
}

impl SchemaHandle {
    pub fn for_type<T: JsonSchema>(schema_name: &'static str) -> Self {
        let root = schemars::schema_for!(T);
        let schema_json = serde_json::to_value(root).unwrap_or_else(|err| {
            warn!(
                target: "trip_agent::schema",
                schema = schema_name,
                error = %err,
                "failed to serialize schema, validation will accept any payload"
            );
            Value::Object(Default::default())
        });

        Self {
            schema_name,
            type_name: type_name::<T>(),
            schema_json: Arc::new(schema_json),
        }
    }

    pub fn schema_name(&self) -> &'static str {
        self.schema_name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn schema_json(&self) -> &Value {
        self.schema_json.as_ref()
    }

    /// Pretty-printed schema for embedding in prompts.
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(self.schema_json()).unwrap_or_default()
    }
}

/// Types the model is asked to produce.
pub trait CompletionSchema: DeserializeOwned + Send + Sync + 'static {
    fn schema() -> &'static SchemaHandle;
}

macro_rules! completion_schema {
    ($ty:ty, $name:literal) => {
        impl $crate::schemas::CompletionSchema for $ty {
            fn schema() -> &'static $crate::schemas::SchemaHandle {
                static HANDLE: std::sync::OnceLock<$crate::schemas::SchemaHandle> =
                    std::sync::OnceLock::new();
                HANDLE.get_or_init(|| $crate::schemas::SchemaHandle::for_type::<$ty>($name))
            }
        }
    };
}

pub(crate) use completion_schema;

/// A typed decode failure with the JSON path it happened at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub schema_name: String,
    pub path: String,
    pub message: String,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to deserialize `{}` at {}: {}",
            self.schema_name, self.path, self.message
        )
    }
}

impl std::error::Error for DecodeError {}

/// Deserialize a payload into `T`, reporting the failing path.
pub fn decode_structured<T: CompletionSchema>(payload: &Value) -> Result<T, DecodeError> {
    serde_path_to_error::deserialize(payload).map_err(|err| {
        let path = err.path().to_string();
        let location = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        DecodeError {
            schema_name: T::schema().schema_name().to_string(),
            path: location,
            message: err.inner().to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::itinerary::DayPlan;
    use serde_json::json;

    #[test]
    fn day_plan_schema_is_cached() {
        let first = DayPlan::schema() as *const SchemaHandle;
        let second = DayPlan::schema() as *const SchemaHandle;
        assert_eq!(first, second);
        assert_eq!(DayPlan::schema().schema_name(), "day_plan");
        assert!(DayPlan::schema().type_name().ends_with("DayPlan"));
    }

    #[test]
    fn day_plan_schema_lists_activity_fields() {
        let pretty = DayPlan::schema().pretty();
        assert!(pretty.contains("activities"));
        assert!(pretty.contains("totalCost"));
        assert!(pretty.contains("sightseeing"));
    }

    #[test]
    fn day_plan_schema_leaves_index_and_date_to_the_planner() {
        let schema = DayPlan::schema().schema_json();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|key| key == "activities"));
        assert!(!required.iter().any(|key| key == "dayIndex" || key == "date"));
        assert!(schema["properties"].get("date").is_none());
    }

    #[test]
    fn decode_reports_path() {
        let payload = json!({
            "dayIndex": 1,
            "date": "2025-05-01",
            "activities": [{ "time": 9, "activity": "Walk" }],
            "meals": {}
        });
        let err = decode_structured::<DayPlan>(&payload).unwrap_err();
        assert_eq!(err.schema_name, "day_plan");
        assert!(err.path.contains("activities"));
    }
}
