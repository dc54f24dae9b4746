use std::{fmt, sync::Arc};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{PlannerError, Result};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// One text-completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub json_mode: bool,
}

/// The generative-model boundary: text in, text out.
///
/// Implementations make exactly one attempt; timeouts and retries are applied
/// by the caller.
#[async_trait]
pub trait CompletionModel: Send + Sync + fmt::Debug {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[async_trait]
impl<T: CompletionModel + ?Sized> CompletionModel for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        (**self).complete(request).await
    }
}

/// OpenAI-compatible chat completions client (OpenRouter by default).
#[derive(Clone, Debug)]
pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn chat_completion(&self, body: &Value) -> Result<Value> {
        let request_url = build_chat_url(&self.base_url);

        let response = self
            .http
            .post(&request_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "trip-agent-rs")
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    PlannerError::Timeout(format!("HTTP request timed out: {err}"))
                } else {
                    PlannerError::Http(format!("HTTP request failed: {err}"))
                }
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let response_text = response
            .text()
            .await
            .map_err(|err| PlannerError::Http(format!("Failed to read response: {err}")))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = headers
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(1);
            return Err(PlannerError::RateLimit {
                retry_after: retry_after.max(1),
            });
        }

        let response_json: Option<Value> = serde_json::from_str(&response_text).ok();

        if !status.is_success() {
            let api_message = response_json
                .as_ref()
                .and_then(|json| json.get("error"))
                .and_then(|error| error.get("message"))
                .and_then(|value| value.as_str())
                .map(|s| s.to_string())
                .unwrap_or(response_text);

            return Err(PlannerError::Api {
                status: status.as_u16(),
                message: api_message,
            });
        }

        let response_json = response_json.ok_or_else(|| {
            PlannerError::Http("Completion response was not valid JSON".to_string())
        })?;

        if let Some(error) = response_json.get("error") {
            let error_message = error
                .get("message")
                .and_then(|value| value.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| error.to_string());
            return Err(PlannerError::Api {
                status: status.as_u16(),
                message: error_message,
            });
        }

        Ok(response_json)
    }
}

#[async_trait]
impl CompletionModel for OpenAIClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut chat_request = ChatCompletionRequest::new(
            request.model.clone(),
            vec![
                json!({ "role": "system", "content": request.system }),
                json!({ "role": "user", "content": request.prompt }),
            ],
        )
        .with_max_tokens(Some(request.max_tokens))
        .with_temperature(Some(request.temperature));

        if request.json_mode {
            chat_request = chat_request.with_response_format(json!({ "type": "json_object" }));
        }

        let response = self.chat_completion(&chat_request.into_value()).await?;
        let content = extract_message_content(&response)?;

        debug!(
            target: "trip_agent::model",
            model = %request.model,
            chars = content.len(),
            "completion received"
        );

        Ok(content)
    }
}

/// `choices[0].message.content`; a null content is treated as an empty answer.
fn extract_message_content(response: &Value) -> Result<String> {
    let first_choice = response
        .get("choices")
        .and_then(|value| value.as_array())
        .and_then(|choices| choices.first())
        .ok_or_else(|| {
            PlannerError::Http("Completion response contained no choices".to_string())
        })?;

    let message = first_choice.get("message").ok_or_else(|| {
        PlannerError::Http("Completion response missing assistant message".to_string())
    })?;

    Ok(message
        .get("content")
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .to_string())
}

fn build_chat_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}

#[derive(Clone, Debug)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Value>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    response_format: Option<Value>,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Value>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            response_format: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_response_format(mut self, response_format: Value) -> Self {
        self.response_format = Some(response_format);
        self
    }

    pub fn into_value(self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.messages,
        });

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }

        if let Some(response_format) = self.response_format {
            body["response_format"] = response_format;
        }

        body
    }
}
