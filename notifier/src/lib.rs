//! Operator notifications: structured events written to the run log and,
//! when a webhook is configured, posted to a chat channel.

pub mod event;
pub mod notifier;
pub mod sink;

pub use event::{events, NotificationEvent, RunContext, Severity};
pub use notifier::Notifier;
pub use sink::{render_webhook_body, MemorySink, NotificationSink, WebhookSink, WEBHOOK_CONTENT_LIMIT};
