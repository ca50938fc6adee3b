pub mod fallback;
pub mod json_salvage;
pub mod openai;

use async_trait::async_trait;
use autopost_core::{LlmError, PromptMessages};

pub use fallback::{generate_with_fallback, plain_text, ChainOutcome, ModelFailure, ModelOutput};
pub use json_salvage::extract_json;
pub use openai::{OpenAiConfig, OpenAiProvider};

/// A text generation backend addressed by model name.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, model: &str, prompt: &PromptMessages) -> Result<String, LlmError>;
}
