use std::fmt;

use thiserror::Error;

/// Main error type for the planning pipeline
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model unavailable after {attempts} attempt(s): {last_error}")]
    ModelUnavailable { attempts: usize, last_error: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(#[from] SchemaRule),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Rate limit exceeded: retry after {retry_after}s")]
    RateLimit { retry_after: u64 },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    /// Check if this error is worth another model call
    pub fn is_retryable(&self) -> bool {
        match self {
            PlannerError::Http(_) => true,
            PlannerError::Timeout(_) => true,
            PlannerError::RateLimit { .. } => true,
            PlannerError::Api { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }

    /// Get the error code for structured responses
    pub fn error_code(&self) -> &'static str {
        match self {
            PlannerError::InvalidRequest(_) => "INVALID_REQUEST",
            PlannerError::ModelUnavailable { .. } => "MODEL_UNAVAILABLE",
            PlannerError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            PlannerError::SchemaViolation(_) => "SCHEMA_VIOLATION",
            PlannerError::Config(_) => "CONFIG_ERROR",
            PlannerError::Http(_) => "HTTP_ERROR",
            PlannerError::Api { .. } => "API_ERROR",
            PlannerError::Timeout(_) => "TIMEOUT_ERROR",
            PlannerError::RateLimit { .. } => "RATE_LIMIT_ERROR",
        }
    }

    /// The validator rule behind a `SchemaViolation`
    pub fn schema_rule(&self) -> Option<&SchemaRule> {
        match self {
            PlannerError::SchemaViolation(rule) => Some(rule),
            _ => None,
        }
    }

    /// Convert to a structured error payload
    pub fn to_error_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "retryable": self.is_retryable()
            }
        })
    }
}

/// The specific check a candidate itinerary failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaRule {
    /// A `dayN` key beyond the requested duration
    UnexpectedDayKey { key: String },
    MissingDayKey { day: u32 },
    DayNotObject { day: u32 },
    /// `activities` absent or not an array
    MissingActivities { day: u32 },
    EmptyActivities { day: u32 },
    MissingMeals { day: u32 },
    /// An activity start time that is not a 24h `HH:MM` clock time
    InvalidTime { day: u32, time: String },
    /// The day decoded but a field has the wrong type or range
    FieldShape { day: u32, detail: String },
}

impl SchemaRule {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaRule::UnexpectedDayKey { .. } => "unexpected_day_key",
            SchemaRule::MissingDayKey { .. } => "missing_day_key",
            SchemaRule::DayNotObject { .. } => "day_not_object",
            SchemaRule::MissingActivities { .. } => "missing_activities",
            SchemaRule::EmptyActivities { .. } => "empty_activities",
            SchemaRule::MissingMeals { .. } => "missing_meals",
            SchemaRule::InvalidTime { .. } => "invalid_time",
            SchemaRule::FieldShape { .. } => "field_shape",
        }
    }

    /// Day the rule was violated on, if it concerns an expected day
    pub fn day(&self) -> Option<u32> {
        match self {
            SchemaRule::UnexpectedDayKey { .. } => None,
            SchemaRule::MissingDayKey { day }
            | SchemaRule::DayNotObject { day }
            | SchemaRule::MissingActivities { day }
            | SchemaRule::EmptyActivities { day }
            | SchemaRule::MissingMeals { day }
            | SchemaRule::InvalidTime { day, .. }
            | SchemaRule::FieldShape { day, .. } => Some(*day),
        }
    }
}

impl fmt::Display for SchemaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaRule::UnexpectedDayKey { key } => {
                write!(f, "unexpected day key `{}` beyond requested duration", key)
            }
            SchemaRule::MissingDayKey { day } => write!(f, "missing day key `day{}`", day),
            SchemaRule::DayNotObject { day } => write!(f, "`day{}` is not an object", day),
            SchemaRule::MissingActivities { day } => {
                write!(f, "`day{}.activities` must be an array", day)
            }
            SchemaRule::EmptyActivities { day } => {
                write!(f, "`day{}.activities` must not be empty", day)
            }
            SchemaRule::MissingMeals { day } => write!(f, "`day{}.meals` block is absent", day),
            SchemaRule::InvalidTime { day, time } => {
                write!(f, "`day{}` activity time `{}` is not HH:MM", day, time)
            }
            SchemaRule::FieldShape { day, detail } => write!(f, "`day{}` {}", day, detail),
        }
    }
}

impl std::error::Error for SchemaRule {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(PlannerError::Timeout("slow".into()).is_retryable());
        assert!(PlannerError::RateLimit { retry_after: 2 }.is_retryable());
        assert!(PlannerError::Api {
            status: 503,
            message: "busy".into()
        }
        .is_retryable());
        assert!(!PlannerError::Api {
            status: 401,
            message: "bad key".into()
        }
        .is_retryable());
        assert!(!PlannerError::InvalidRequest("days".into()).is_retryable());
    }

    #[test]
    fn error_payload_shape() {
        let err = PlannerError::from(SchemaRule::MissingDayKey { day: 4 });
        assert_eq!(err.schema_rule(), Some(&SchemaRule::MissingDayKey { day: 4 }));
        let payload = err.to_error_payload();
        assert_eq!(payload["error"]["code"], "SCHEMA_VIOLATION");
        assert_eq!(payload["error"]["retryable"], false);
        assert!(payload["error"]["message"]
            .as_str()
            .unwrap()
            .contains("day4"));
    }

    #[test]
    fn rule_reports_day() {
        assert_eq!(SchemaRule::EmptyActivities { day: 2 }.day(), Some(2));
        assert_eq!(
            SchemaRule::UnexpectedDayKey {
                key: "day9".into()
            }
            .day(),
            None
        );
        assert_eq!(SchemaRule::MissingMeals { day: 1 }.name(), "missing_meals");
    }
}
