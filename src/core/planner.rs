use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use super::{
    clock::{Clock, SystemClock},
    config::PlannerConfig,
    metrics::{MetricsSink, ReconcileMetrics},
    steps::{ReconcileStep, RunLog},
};
use crate::{
    error::{PlannerError, Result},
    services::openai_client::{CompletionModel, CompletionRequest, OpenAIClient},
};

/// Entry point of the pipeline: owns the model client, the retry budget and
/// the clock every generated date is derived from.
#[derive(Debug, Clone)]
pub struct Planner {
    model: Arc<dyn CompletionModel>,
    config: PlannerConfig,
    clock: Arc<dyn Clock>,
    metrics_sink: Option<Arc<dyn MetricsSink>>,
}

impl Planner {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_model_client(OpenAIClient::new(api_key))
    }

    /// Build a planner around any completion backend.
    pub fn with_model_client(model: impl CompletionModel + 'static) -> Self {
        Self {
            model: Arc::new(model),
            config: PlannerConfig::default(),
            clock: Arc::new(SystemClock),
            metrics_sink: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            PlannerError::Config(
                "OPENAI_API_KEY environment variable must be set before creating a Planner"
                    .to_string(),
            )
        })?;

        let mut client = OpenAIClient::new(api_key);
        if let Ok(base_url) =
            std::env::var("OPENAI_BASE_URL").or_else(|_| std::env::var("OPENROUTER_BASE_URL"))
        {
            client = client.with_base_url(base_url);
        }

        let mut planner = Self::with_model_client(client);
        if let Ok(model) = std::env::var("TRIP_AGENT_MODEL") {
            if !model.trim().is_empty() {
                planner.config.model = model.trim().to_string();
            }
        }
        Ok(planner)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.initial_backoff = initial;
        self.config.max_backoff = max.max(initial);
        self
    }

    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.config.json_mode = enabled;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics_sink = Some(sink);
        self
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn model_name(&self) -> &str {
        &self.config.model
    }

    pub(crate) fn completion_request(
        &self,
        system: String,
        prompt: String,
        max_tokens: u32,
    ) -> CompletionRequest {
        CompletionRequest {
            model: self.config.model.clone(),
            system,
            prompt,
            max_tokens: max_tokens.min(self.config.max_tokens),
            temperature: self.config.temperature,
            json_mode: self.config.json_mode,
        }
    }

    /// Call the model with a per-attempt timeout, retrying transient failures
    /// with exponential backoff. Every attempt and pause is recorded in `log`.
    pub(crate) async fn invoke_with_retry(
        &self,
        request: &CompletionRequest,
        log: &mut RunLog,
    ) -> Result<String> {
        let total_attempts = self.config.total_attempts();
        let mut backoff = self.config.initial_backoff;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match tokio::time::timeout(self.config.timeout, self.model.complete(request))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(PlannerError::Timeout(format!(
                    "model call exceeded {}ms",
                    self.config.timeout.as_millis()
                ))),
            };

            let error = match outcome {
                Ok(text) => {
                    log.add_step(ReconcileStep::ModelInvoked {
                        attempt,
                        response_chars: text.chars().count(),
                    });
                    return Ok(text);
                }
                Err(error) => error,
            };

            let retryable = error.is_retryable();
            log.add_step(ReconcileStep::ModelCallFailed {
                attempt,
                error: error.to_string(),
                retryable,
                timed_out: matches!(error, PlannerError::Timeout(_)),
            });

            if !retryable || attempt >= total_attempts {
                warn!(
                    target: "trip_agent::model",
                    attempt,
                    retryable,
                    error = %error,
                    "giving up on model call"
                );
                return Err(PlannerError::ModelUnavailable {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            let delay = match &error {
                PlannerError::RateLimit { retry_after } => {
                    Duration::from_secs(*retry_after).min(self.config.max_backoff)
                }
                _ => backoff,
            };

            debug!(
                target: "trip_agent::model",
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying model call"
            );
            log.add_step(ReconcileStep::RetryScheduled {
                attempt,
                delay_ms: delay.as_millis() as u64,
            });

            tokio::time::sleep(delay).await;
            backoff = (backoff * 2).min(self.config.max_backoff);
        }
    }

    pub(crate) fn emit_metrics(&self, component: &str, metrics: &ReconcileMetrics) {
        if let Some(sink) = &self.metrics_sink {
            sink.record(component, metrics);
        }
    }
}
