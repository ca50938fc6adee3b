use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Product source error: {0}")]
    Source(#[from] SourceError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("Search request rejected with HTTP {status}: {body}")]
    ClientError { status: u16, body: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Connection failed: {details}")]
    ConnectionFailed { details: String },

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },
}

#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Provider authentication failed: {provider}")]
    AuthenticationFailed { provider: String },

    #[error("Rate limit exceeded for {provider}. Retry after {retry_after} seconds")]
    RateLimitExceeded { provider: String, retry_after: u64 },

    #[error("Model not available: {model}")]
    ModelNotAvailable { model: String },

    #[error("Model {model} rejected parameter '{param}': {message}")]
    UnsupportedParameter {
        model: String,
        param: String,
        message: String,
    },

    #[error("Empty completion from {model}")]
    EmptyCompletion { model: String },

    #[error("Model {model} returned text without a usable JSON document")]
    MalformedJson { model: String },

    #[error("Request rejected for {model} with HTTP {status}: {message}")]
    RequestRejected {
        model: String,
        status: u16,
        message: String,
    },

    #[error("Provider service unavailable: {provider} (HTTP {status})")]
    ServiceUnavailable { provider: String, status: u16 },

    #[error("Request timeout for {provider}")]
    RequestTimeout { provider: String },

    #[error("Transport failure for {provider}: {details}")]
    Transport { provider: String, details: String },

    #[error("Invalid response format from {provider}: {details}")]
    InvalidResponseFormat { provider: String, details: String },
}

#[derive(Error, Debug, Clone)]
pub enum PublishError {
    #[error("CMS authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("CMS denied {operation} with HTTP {status}")]
    PermissionDenied { operation: String, status: u16 },

    #[error("No free slug for '{slug}' after {attempts} attempts")]
    SlugExhausted { slug: String, attempts: u32 },

    #[error("CMS request {operation} failed with HTTP {status}: {body}")]
    RequestFailed {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("CMS unreachable during {operation}: {details}")]
    Transport { operation: String, details: String },

    #[error("Invalid CMS response: {details}")]
    InvalidResponse { details: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format: {details}")]
    InvalidFormat { details: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] serde_yaml::Error),
}
