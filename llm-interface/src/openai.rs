use crate::LlmProvider;
use async_trait::async_trait;
use autopost_core::{ApiStyle, LlmConfig, LlmError, PromptMessages};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const PROVIDER: &str = "openai";
const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 20;

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub api: ApiStyle,
    pub max_output_tokens: u32,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn from_llm(llm: &LlmConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            api: llm.api,
            max_output_tokens: llm.max_output_tokens,
            temperature: llm.temperature,
            timeout: Duration::from_secs(llm.timeout_secs),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("api", &self.api)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// `{"error": {"message", "type", "param", "code"}}`
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ApiErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    param: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Map an error response to a typed error from its status and parsed body.
pub fn classify_error(model: &str, status: u16, body: &str, retry_after: Option<u64>) -> LlmError {
    let parsed: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let api = parsed.error;
    let code = api.code.as_deref().unwrap_or_default();
    let message = if api.message.is_empty() {
        body.chars().take(300).collect()
    } else {
        api.message.clone()
    };

    match (status, code) {
        (_, "model_not_found") | (404, _) => LlmError::ModelNotAvailable {
            model: model.to_string(),
        },
        (_, "unsupported_parameter") | (_, "unsupported_value") => {
            LlmError::UnsupportedParameter {
                model: model.to_string(),
                param: api.param.unwrap_or_default(),
                message,
            }
        }
        (401, _) | (_, "invalid_api_key") => LlmError::AuthenticationFailed {
            provider: PROVIDER.to_string(),
        },
        (429, "insufficient_quota") => LlmError::RequestRejected {
            model: model.to_string(),
            status,
            message,
        },
        (429, _) => LlmError::RateLimitExceeded {
            provider: PROVIDER.to_string(),
            retry_after: retry_after.unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS),
        },
        (s, _) if s >= 500 => LlmError::ServiceUnavailable {
            provider: PROVIDER.to_string(),
            status,
        },
        _ => {
            if let Some(kind) = api.kind {
                debug!(error_type = %kind, "OpenAI request rejected");
            }
            LlmError::RequestRejected {
                model: model.to_string(),
                status,
                message,
            }
        }
    }
}

/// Text of a Responses API reply: `output_text` when present, otherwise the
/// concatenated text parts of the `message` output items.
pub fn extract_responses_text(body: &Value) -> Option<String> {
    if let Some(text) = body.get("output_text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Some(text.to_string());
        }
    }

    let parts: Vec<&str> = body
        .get("output")?
        .as_array()?
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str).map_or(true, |t| t == "message"))
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    let text = parts.concat();
    (!text.trim().is_empty()).then_some(text)
}

/// `choices[0].message.content` of a Chat Completions reply.
pub fn extract_chat_text(body: &Value) -> Option<String> {
    let text = body
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()?;
    (!text.trim().is_empty()).then(|| text.to_string())
}

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    http_client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Transport {
                provider: PROVIDER.to_string(),
                details: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn endpoint(&self) -> String {
        match self.config.api {
            ApiStyle::Responses => format!("{}/responses", self.config.base_url),
            ApiStyle::ChatCompletions => format!("{}/chat/completions", self.config.base_url),
        }
    }

    /// Request payload for `model`. Temperature is only sent when configured,
    /// since some models reject any value but the default.
    pub fn request_body(&self, model: &str, prompt: &PromptMessages) -> Value {
        let mut body = match self.config.api {
            ApiStyle::Responses => json!({
                "model": model,
                "input": [
                    {"role": "system", "content": [{"type": "input_text", "text": prompt.system}]},
                    {"role": "user", "content": [{"type": "input_text", "text": prompt.user}]}
                ],
                "max_output_tokens": self.config.max_output_tokens,
            }),
            ApiStyle::ChatCompletions => json!({
                "model": model,
                "messages": [
                    {"role": "system", "content": prompt.system},
                    {"role": "user", "content": prompt.user}
                ],
                "max_completion_tokens": self.config.max_output_tokens,
            }),
        };
        if let (Some(temperature), Some(map)) = (self.config.temperature, body.as_object_mut()) {
            map.insert("temperature".to_string(), json!(temperature));
        }
        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, model: &str, prompt: &PromptMessages) -> Result<String, LlmError> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(model, prompt))
            .send()
            .await
            .map_err(|e| {
                warn!(model = %model, error = %e, "OpenAI request failed");
                if e.is_timeout() {
                    LlmError::RequestTimeout {
                        provider: PROVIDER.to_string(),
                    }
                } else {
                    LlmError::Transport {
                        provider: PROVIDER.to_string(),
                        details: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let error_text = response.text().await.unwrap_or_default();
            warn!(model = %model, status = %status, "OpenAI API error");
            return Err(classify_error(model, status.as_u16(), &error_text, retry_after));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
                details: e.to_string(),
            })?;

        let text = match self.config.api {
            ApiStyle::Responses => extract_responses_text(&body),
            ApiStyle::ChatCompletions => extract_chat_text(&body),
        }
        .ok_or_else(|| LlmError::EmptyCompletion {
            model: model.to_string(),
        })?;

        debug!(
            model = %model,
            chars = text.chars().count(),
            duration_ms = start.elapsed().as_millis(),
            "OpenAI completion"
        );
        Ok(text)
    }
}
