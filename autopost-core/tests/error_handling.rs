use autopost_core::{
    ConfigError, CoreError, ErrorExt, ErrorReporter, LlmError, PublishError, SourceError,
};
use std::time::Duration;

#[test]
fn test_error_codes() {
    let source_error = CoreError::Source(SourceError::ClientError {
        status: 400,
        body: "wrong_parameter".to_string(),
    });
    assert_eq!(source_error.error_code(), "SOURCE_CLIENT_ERROR");

    let llm_error = CoreError::Llm(LlmError::UnsupportedParameter {
        model: "gpt-5".to_string(),
        param: "temperature".to_string(),
        message: "Unsupported value".to_string(),
    });
    assert_eq!(llm_error.error_code(), "LLM_UNSUPPORTED_PARAMETER");

    let publish_error = CoreError::Publish(PublishError::AuthenticationFailed {
        reason: "HTTP 401".to_string(),
    });
    assert_eq!(publish_error.error_code(), "CMS_AUTH_FAILED");

    let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "WP_APP_PASSWORD".to_string(),
    });
    assert_eq!(config_error.error_code(), "ENV_MISSING");

    let internal = CoreError::Internal {
        message: "webhook returned HTTP 500".to_string(),
    };
    assert_eq!(internal.error_code(), "INTERNAL");
}

#[test]
fn test_retryable_errors() {
    assert!(CoreError::Source(SourceError::RateLimitExceeded { retry_after: 60 }).is_retryable());
    assert!(CoreError::Source(SourceError::ServerError { status_code: 503 }).is_retryable());
    assert!(!CoreError::Source(SourceError::ClientError {
        status: 404,
        body: String::new(),
    })
    .is_retryable());

    assert!(CoreError::Publish(PublishError::RequestFailed {
        operation: "create post".to_string(),
        status: 502,
        body: String::new(),
    })
    .is_retryable());
    assert!(!CoreError::Publish(PublishError::PermissionDenied {
        operation: "create post".to_string(),
        status: 403,
    })
    .is_retryable());

    let non_retryable_error = CoreError::Config(ConfigError::ValidationFailed {
        reason: "posts_per_run".to_string(),
    });
    assert!(!non_retryable_error.is_retryable());
}

#[test]
fn test_retry_after() {
    let rate_limit_error = CoreError::Source(SourceError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(
        rate_limit_error.retry_after(),
        Some(Duration::from_secs(60))
    );

    let server_error = CoreError::Source(SourceError::ServerError { status_code: 503 });
    assert!(server_error.retry_after().is_some());

    let auth = CoreError::Llm(LlmError::AuthenticationFailed {
        provider: "openai".to_string(),
    });
    assert_eq!(auth.retry_after(), None);
}

#[test]
fn test_user_friendly_messages() {
    let llm_error = CoreError::Llm(LlmError::ModelNotAvailable {
        model: "gpt-5".to_string(),
    });
    let message = llm_error.user_friendly_message();
    assert!(message.contains("gpt-5"));
    assert!(message.contains("fallback"));

    let config_error = CoreError::Config(ConfigError::MissingEnvironmentVariable {
        var_name: "RAKUTEN_APP_ID".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("RAKUTEN_APP_ID"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new()
        .with_error_reporting(true)
        .with_warning_reporting(true);
    let error = CoreError::Publish(PublishError::SlugExhausted {
        slug: "usb-65w".to_string(),
        attempts: 5,
    });

    reporter.report_error(&error);
    reporter.report_warning(&error);

    let silent = ErrorReporter::default()
        .with_error_reporting(false)
        .with_warning_reporting(false);
    silent.report_error(&error);
}
