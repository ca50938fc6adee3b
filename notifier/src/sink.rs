use crate::event::NotificationEvent;
use async_trait::async_trait;
use autopost_core::CoreError;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Chat services reject message content longer than this many characters.
pub const WEBHOOK_CONTENT_LIMIT: usize = 2000;
const FENCE_CLOSE: &str = "\n```";
const ELLIPSIS: &str = "…";

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, event: &NotificationEvent) -> Result<(), CoreError>;
}

/// Human-readable content block plus the raw event.
pub fn render_webhook_body(event: &NotificationEvent) -> Value {
    let pretty = serde_json::to_string_pretty(event).unwrap_or_else(|_| "{}".to_string());
    let content = format!("{}\n```json\n{}{}", event.title(), pretty, FENCE_CLOSE);

    let content = if content.chars().count() <= WEBHOOK_CONTENT_LIMIT {
        content
    } else {
        let keep = WEBHOOK_CONTENT_LIMIT - FENCE_CLOSE.chars().count() - ELLIPSIS.chars().count();
        let mut cut: String = content.chars().take(keep).collect();
        cut.push_str(ELLIPSIS);
        cut.push_str(FENCE_CLOSE);
        cut
    };

    json!({
        "content": content,
        "event": event,
    })
}

#[derive(Debug, Clone)]
pub struct WebhookSink {
    http_client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CoreError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, event: &NotificationEvent) -> Result<(), CoreError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&render_webhook_body(event))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Internal {
                message: format!("webhook returned HTTP {}", status.as_u16()),
            });
        }
        debug!(event = %event.event, "Webhook notification delivered");
        Ok(())
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<NotificationEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.event).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.event == name).count()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn send(&self, event: &NotificationEvent) -> Result<(), CoreError> {
        self.events
            .lock()
            .map_err(|_| CoreError::Internal {
                message: "notification buffer poisoned".to_string(),
            })?
            .push(event.clone());
        Ok(())
    }
}
