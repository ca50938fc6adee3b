//! Ordered model fallback: try each model once, stop at the first usable
//! reply, and keep a record of every model that failed along the way.

use crate::LlmProvider;
use autopost_core::{ErrorExt, LlmError, PromptMessages};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ModelFailure {
    pub model: String,
    pub error: LlmError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput<T> {
    pub model: String,
    pub value: T,
}

#[derive(Debug, Clone)]
pub struct ChainOutcome<T> {
    pub primary: Option<String>,
    pub output: Option<ModelOutput<T>>,
    pub failures: Vec<ModelFailure>,
}

impl<T> ChainOutcome<T> {
    /// `(from_model, to_model)` when the reply came from a model other than
    /// the primary.
    pub fn fallback(&self) -> Option<(&str, &str)> {
        let primary = self.primary.as_deref()?;
        let used = self.output.as_ref()?.model.as_str();
        (used != primary).then_some((primary, used))
    }

    pub fn succeeded(&self) -> bool {
        self.output.is_some()
    }
}

/// Parser for replies that are used as-is.
pub fn plain_text(model: &str, text: &str) -> Result<String, LlmError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(LlmError::EmptyCompletion {
            model: model.to_string(),
        });
    }
    Ok(text.to_string())
}

/// Run `prompt` through `models` in order. `parse` turns a raw reply into the
/// caller's value; a parse error counts as a failure of that model.
pub async fn generate_with_fallback<P, T, F>(
    provider: &P,
    models: &[String],
    prompt: &PromptMessages,
    parse: F,
) -> ChainOutcome<T>
where
    P: LlmProvider + ?Sized,
    F: Fn(&str, &str) -> Result<T, LlmError>,
{
    let mut failures = Vec::new();

    for model in models {
        let attempt = match provider.complete(model, prompt).await {
            Ok(text) if text.trim().is_empty() => Err(LlmError::EmptyCompletion {
                model: model.clone(),
            }),
            Ok(text) => parse(model, &text),
            Err(e) => Err(e),
        };

        match attempt {
            Ok(value) => {
                info!(
                    provider = provider.name(),
                    model = %model,
                    failed_before = failures.len(),
                    "Model produced a usable reply"
                );
                return ChainOutcome {
                    primary: models.first().cloned(),
                    output: Some(ModelOutput {
                        model: model.clone(),
                        value,
                    }),
                    failures,
                };
            }
            Err(error) => {
                warn!(
                    model = %model,
                    code = %error.error_code(),
                    "Model call failed, trying next model: {}",
                    error
                );
                failures.push(ModelFailure {
                    model: model.clone(),
                    error,
                });
            }
        }
    }

    ChainOutcome {
        primary: models.first().cloned(),
        output: None,
        failures,
    }
}
