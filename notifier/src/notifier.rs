use crate::event::{NotificationEvent, RunContext, Severity};
use crate::sink::{NotificationSink, WebhookSink};
use autopost_core::{ErrorExt, ErrorReporter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Fans an event out to the run log and the optional sink. Never fails.
#[derive(Clone)]
pub struct Notifier {
    sink: Option<Arc<dyn NotificationSink>>,
    ctx: RunContext,
    reporter: ErrorReporter,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("sink", &self.sink.is_some())
            .field("ctx", &self.ctx)
            .finish()
    }
}

impl Notifier {
    /// Log-only notifier.
    pub fn disabled(ctx: RunContext) -> Self {
        Self {
            sink: None,
            ctx,
            reporter: ErrorReporter::default(),
        }
    }

    pub fn with_sink(sink: Arc<dyn NotificationSink>, ctx: RunContext) -> Self {
        Self {
            sink: Some(sink),
            ctx,
            reporter: ErrorReporter::default(),
        }
    }

    /// Webhook notifier when `webhook_url` is set and usable, log-only otherwise.
    pub fn from_webhook(webhook_url: Option<&str>, timeout: Duration, ctx: RunContext) -> Self {
        let Some(url) = webhook_url.map(str::trim).filter(|u| !u.is_empty()) else {
            info!("No alert webhook configured, notifications go to the log only");
            return Self::disabled(ctx);
        };
        match WebhookSink::new(url, timeout) {
            Ok(sink) => Self::with_sink(Arc::new(sink), ctx),
            Err(e) => {
                e.log_warn();
                Self::disabled(ctx)
            }
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub async fn notify(&self, event: NotificationEvent) {
        let event = event.with_context(&self.ctx);
        let payload = serde_json::to_string(&event).unwrap_or_default();
        match event.severity {
            Severity::Info => info!(event = %event.event, "{} {}", event.title(), payload),
            Severity::Warning => warn!(event = %event.event, "{} {}", event.title(), payload),
            Severity::Error => error!(event = %event.event, "{} {}", event.title(), payload),
        }

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.send(&event).await {
                warn!(event = %event.event, "Notification delivery failed");
                self.reporter.report_warning(&e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::events;
    use crate::sink::MemorySink;
    use async_trait::async_trait;
    use autopost_core::CoreError;

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn send(&self, _event: &NotificationEvent) -> Result<(), CoreError> {
            Err(CoreError::Internal {
                message: "webhook returned HTTP 500".to_string(),
            })
        }
    }

    fn ctx() -> RunContext {
        RunContext {
            repo: "acme/autopost".to_string(),
            run_id: "9".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_events_carry_run_context() {
        let sink = Arc::new(MemorySink::new());
        let notifier = Notifier::with_sink(sink.clone(), ctx());
        notifier
            .notify(NotificationEvent::warning(events::CONFIG_DEFAULTED).field("field", "site.affiliate_disclosure"))
            .await;

        let recorded = sink.events();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].ctx.repo, "acme/autopost");
        assert_eq!(recorded[0].field_str("field"), Some("site.affiliate_disclosure"));
    }

    #[tokio::test]
    async fn test_sink_failures_are_swallowed() {
        let notifier = Notifier::with_sink(Arc::new(FailingSink), ctx());
        notifier.notify(NotificationEvent::error(events::RUN_FAILED)).await;
    }

    #[test]
    fn test_blank_webhook_is_log_only() {
        let notifier = Notifier::from_webhook(Some("  "), Duration::from_secs(15), ctx());
        assert!(!notifier.has_sink());
        assert!(!Notifier::from_webhook(None, Duration::from_secs(15), ctx()).has_sink());
        tokio_test::block_on(notifier.notify(NotificationEvent::info(events::KEYWORDS_EMPTY)));
    }

    #[test]
    fn test_webhook_url_enables_sink() {
        let notifier = Notifier::from_webhook(
            Some("https://discord.example/api/webhooks/1/x"),
            Duration::from_secs(15),
            RunContext::default(),
        );
        assert!(notifier.has_sink());
    }
}
