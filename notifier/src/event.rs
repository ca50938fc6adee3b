use autopost_core::clock::now_jst;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event names sent to operators.
pub mod events {
    pub const ENV_MISSING: &str = "ENV_MISSING";
    pub const CONFIG_DEFAULTED: &str = "CONFIG_DEFAULTED";
    pub const CMS_AUTH_FAILED: &str = "CMS_AUTH_FAILED";
    pub const SOURCE_API_ERROR: &str = "SOURCE_API_ERROR";
    pub const LLM_CALL_FAILED: &str = "LLM_CALL_FAILED";
    pub const LLM_MODEL_FALLBACK: &str = "LLM_MODEL_FALLBACK";
    pub const LLM_FAILED_FINAL: &str = "LLM_FAILED_FINAL";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const CMS_POST_DOWNGRADED: &str = "CMS_POST_DOWNGRADED";
    pub const CMS_POST_FAILED: &str = "CMS_POST_FAILED";
    pub const KEYWORDS_EMPTY: &str = "KEYWORDS_EMPTY";
    pub const RUN_SUMMARY: &str = "RUN_SUMMARY";
    pub const RUN_FAILED: &str = "RUN_FAILED";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

/// CI metadata echoed into every event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    pub repo: String,
    pub workflow: String,
    pub run_id: String,
    pub run_attempt: String,
    pub branch: String,
    pub sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_url: Option<String>,
}

impl RunContext {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).unwrap_or_default();
        let repo = get("GITHUB_REPOSITORY");
        let run_id = get("GITHUB_RUN_ID");
        let run_url = (!repo.is_empty() && !run_id.is_empty())
            .then(|| format!("https://github.com/{}/actions/runs/{}", repo, run_id));

        Self {
            workflow: get("GITHUB_WORKFLOW"),
            run_attempt: get("GITHUB_RUN_ATTEMPT"),
            branch: get("GITHUB_REF_NAME"),
            sha: get("GITHUB_SHA"),
            repo,
            run_id,
            run_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub event: String,
    pub severity: Severity,
    pub ts_jst: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(default)]
    pub ctx: RunContext,
}

impl NotificationEvent {
    pub fn new(event: impl Into<String>, severity: Severity) -> Self {
        Self {
            event: event.into(),
            severity,
            ts_jst: now_jst().to_rfc3339_opts(SecondsFormat::Secs, false),
            keyword: None,
            stage: None,
            reason_code: None,
            reason: None,
            extra: Map::new(),
            ctx: RunContext::default(),
        }
    }

    pub fn info(event: impl Into<String>) -> Self {
        Self::new(event, Severity::Info)
    }

    pub fn warning(event: impl Into<String>) -> Self {
        Self::new(event, Severity::Warning)
    }

    pub fn error(event: impl Into<String>) -> Self {
        Self::new(event, Severity::Error)
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn reason(mut self, reason_code: impl Into<String>, reason: impl Into<String>) -> Self {
        self.reason_code = Some(reason_code.into());
        self.reason = Some(reason.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_context(mut self, ctx: &RunContext) -> Self {
        self.ctx = ctx.clone();
        self
    }

    pub fn title(&self) -> String {
        format!("[AUTO-POST][{}] EVENT={}", self.severity.label(), self.event)
    }

    /// Extra field as a string, for assertions and log lines.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_run_url_needs_repo_and_run_id() {
        let ctx = RunContext::from_lookup(lookup(&[
            ("GITHUB_REPOSITORY", "acme/autopost"),
            ("GITHUB_RUN_ID", "123456"),
            ("GITHUB_REF_NAME", "main"),
        ]));
        assert_eq!(
            ctx.run_url.as_deref(),
            Some("https://github.com/acme/autopost/actions/runs/123456")
        );
        assert_eq!(ctx.branch, "main");

        let ctx = RunContext::from_lookup(lookup(&[("GITHUB_REPOSITORY", "acme/autopost")]));
        assert!(ctx.run_url.is_none());
        assert_eq!(RunContext::from_lookup(lookup(&[])), RunContext::default());
    }

    #[test]
    fn test_event_serializes_flat() {
        let event = NotificationEvent::warning(events::LLM_MODEL_FALLBACK)
            .keyword("USB充電器 65W")
            .stage("generate")
            .field("from_model", "gpt-5")
            .field("to_model", "gpt-4o");
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["event"], "LLM_MODEL_FALLBACK");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["from_model"], "gpt-5");
        assert_eq!(value["keyword"], "USB充電器 65W");
        assert!(value.get("reason").is_none());
        assert!(value["ts_jst"].as_str().unwrap().ends_with("+09:00"));
        assert_eq!(event.field_str("to_model"), Some("gpt-4o"));
    }

    #[test]
    fn test_title_format() {
        let event = NotificationEvent::error(events::CMS_POST_FAILED);
        assert_eq!(event.title(), "[AUTO-POST][ERROR] EVENT=CMS_POST_FAILED");
    }
}
