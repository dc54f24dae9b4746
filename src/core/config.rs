use std::time::Duration;

pub const DEFAULT_MODEL: &str = "openai/gpt-4.1-mini";

/// Knobs for the model call and its retry budget.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub model: String,
    /// Upper bound on generated tokens per call
    pub max_tokens: u32,
    /// Kept low to reduce formatting variance
    pub temperature: f32,
    /// Bound on a single model call
    pub timeout: Duration,
    /// Additional attempts after the first call fails
    pub max_retries: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Ask the provider for a JSON object response format
    pub json_mode: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4000,
            temperature: 0.3,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
            json_mode: false,
        }
    }
}

impl PlannerConfig {
    pub fn total_attempts(&self) -> usize {
        self.max_retries + 1
    }
}
