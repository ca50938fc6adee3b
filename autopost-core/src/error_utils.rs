use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        match self {
            CoreError::Source(e) => {
                e.log_error();
            }
            CoreError::Llm(e) => {
                e.log_error();
            }
            CoreError::Publish(e) => {
                e.log_error();
            }
            CoreError::Config(e) => {
                e.log_error();
            }
            _ => error!(code = %self.error_code(), "{}", self),
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(code = %self.error_code(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Source(e) => e.is_retryable(),
            CoreError::Llm(e) => e.is_retryable(),
            CoreError::Publish(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Source(e) => e.retry_after(),
            CoreError::Llm(e) => e.retry_after(),
            _ if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Source(e) => e.user_friendly_message(),
            CoreError::Llm(e) => e.user_friendly_message(),
            CoreError::Publish(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            _ => "An unexpected error occurred.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Source(e) => e.error_code(),
            CoreError::Llm(e) => e.error_code(),
            CoreError::Publish(e) => e.error_code(),
            CoreError::Config(e) => e.error_code(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for SourceError {
    fn log_error(&self) -> &Self {
        error!(kind = "source", code = %self.error_code(), details = ?self, "{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(kind = "source", code = %self.error_code(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            SourceError::RateLimitExceeded { .. } => true,
            SourceError::RequestTimeout => true,
            SourceError::ServerError { status_code } => *status_code >= 500,
            SourceError::ConnectionFailed { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            SourceError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ if self.is_retryable() => Some(Duration::from_secs(2)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            SourceError::ClientError { status, .. } => format!(
                "The product search rejected the request (HTTP {}). Check the keyword and application id.",
                status
            ),
            SourceError::RateLimitExceeded { retry_after } => format!(
                "Too many search requests. Wait {} seconds before trying again.",
                retry_after
            ),
            SourceError::RequestTimeout => "The product search timed out.".to_string(),
            _ => "The product search is unavailable right now.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            SourceError::ClientError { .. } => "SOURCE_CLIENT_ERROR".to_string(),
            SourceError::RateLimitExceeded { .. } => "SOURCE_RATE_LIMIT".to_string(),
            SourceError::ServerError { .. } => "SOURCE_SERVER_ERROR".to_string(),
            SourceError::RequestTimeout => "SOURCE_TIMEOUT".to_string(),
            SourceError::ConnectionFailed { .. } => "SOURCE_CONNECTION_FAILED".to_string(),
            SourceError::InvalidResponse { .. } => "SOURCE_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for LlmError {
    fn log_error(&self) -> &Self {
        error!(kind = "llm", code = %self.error_code(), details = ?self, "{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(kind = "llm", code = %self.error_code(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimitExceeded { .. }
                | LlmError::ServiceUnavailable { .. }
                | LlmError::RequestTimeout { .. }
                | LlmError::Transport { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimitExceeded { retry_after, .. } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ if self.is_retryable() => Some(Duration::from_secs(10)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            LlmError::AuthenticationFailed { provider } => format!(
                "Authentication failed for {}. Please check your API key.",
                provider
            ),
            LlmError::RateLimitExceeded {
                provider,
                retry_after,
            } => format!(
                "Rate limit exceeded for {}. Please wait {} seconds.",
                provider, retry_after
            ),
            LlmError::ModelNotAvailable { model } => format!(
                "Model '{}' is not available. The next fallback model will be used.",
                model
            ),
            LlmError::UnsupportedParameter { model, param, .. } => format!(
                "Model '{}' does not accept the '{}' parameter.",
                model, param
            ),
            LlmError::EmptyCompletion { model } => {
                format!("Model '{}' returned no text.", model)
            }
            LlmError::MalformedJson { model } => {
                format!("Model '{}' did not return a readable JSON plan.", model)
            }
            LlmError::ServiceUnavailable { provider, .. } => format!(
                "{} service is temporarily unavailable. Please try again later.",
                provider
            ),
            _ => "AI service error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            LlmError::AuthenticationFailed { .. } => "LLM_AUTH_FAILED".to_string(),
            LlmError::RateLimitExceeded { .. } => "LLM_RATE_LIMIT".to_string(),
            LlmError::ModelNotAvailable { .. } => "LLM_MODEL_NOT_AVAILABLE".to_string(),
            LlmError::UnsupportedParameter { .. } => "LLM_UNSUPPORTED_PARAMETER".to_string(),
            LlmError::EmptyCompletion { .. } => "LLM_EMPTY_COMPLETION".to_string(),
            LlmError::MalformedJson { .. } => "LLM_MALFORMED_JSON".to_string(),
            LlmError::RequestRejected { .. } => "LLM_REQUEST_REJECTED".to_string(),
            LlmError::ServiceUnavailable { .. } => "LLM_SERVICE_UNAVAILABLE".to_string(),
            LlmError::RequestTimeout { .. } => "LLM_TIMEOUT".to_string(),
            LlmError::Transport { .. } => "LLM_TRANSPORT".to_string(),
            LlmError::InvalidResponseFormat { .. } => "LLM_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for PublishError {
    fn log_error(&self) -> &Self {
        error!(kind = "cms", code = %self.error_code(), details = ?self, "{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(kind = "cms", code = %self.error_code(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            PublishError::RequestFailed { status, .. } => *status >= 500,
            PublishError::Transport { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_secs(5))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            PublishError::AuthenticationFailed { .. } => {
                "CMS login failed. Check the username and application password.".to_string()
            }
            PublishError::PermissionDenied { operation, .. } => format!(
                "The CMS account is not allowed to {}.",
                operation
            ),
            PublishError::SlugExhausted { slug, .. } => {
                format!("Could not find a free slug based on '{}'.", slug)
            }
            _ => "The CMS request failed. The keyword will be retried on a later run.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            PublishError::AuthenticationFailed { .. } => "CMS_AUTH_FAILED".to_string(),
            PublishError::PermissionDenied { .. } => "CMS_PERMISSION_DENIED".to_string(),
            PublishError::SlugExhausted { .. } => "CMS_SLUG_EXHAUSTED".to_string(),
            PublishError::RequestFailed { .. } => "CMS_REQUEST_FAILED".to_string(),
            PublishError::Transport { .. } => "CMS_TRANSPORT".to_string(),
            PublishError::InvalidResponse { .. } => "CMS_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!(kind = "config", code = %self.error_code(), details = ?self, "{}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(kind = "config", code = %self.error_code(), "{}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::InvalidFormat { .. } | ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the YAML syntax.".to_string()
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration rejected: {}", reason)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidFormat { .. } => "CONFIG_INVALID_FORMAT".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "ENV_MISSING".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Logs errors with their code, operator message and retry hint. Either
/// level can be muted.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &CoreError) {
        if !self.report_errors {
            return;
        }
        error.log_error();
        let retry_after = error.retry_after().filter(|_| error.is_retryable());
        info!(
            code = %error.error_code(),
            retry_after_secs = retry_after.map(|d| d.as_secs()),
            "{}",
            error.user_friendly_message()
        );
    }

    pub fn report_warning(&self, error: &CoreError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
