//! Run configuration loaded once from YAML and read-only afterwards.
//!
//! Every section carries serde defaults, so a partial file is merged over the
//! built-in values key by key.

use crate::error::ConfigError;
use crate::types::PostStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/app.yaml";
pub const DEFAULT_DISCLOSURE: &str =
    "当サイトはアフィリエイト広告（Amazonアソシエイト含む）を利用しています。";

/// Hard ceiling the search API puts on results per request.
pub const MAX_HITS_PER_REQUEST: u32 = 30;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub site: SiteConfig,
    pub keywords: KeywordConfig,
    pub content: ContentConfig,
    pub llm: LlmConfig,
    pub source: SourceConfig,
    pub cms: CmsConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Any violation blocks publication.
    Strict,
    /// Violations are reported and the draft is published anyway.
    LenientWithWarning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionPolicy {
    /// Retry a 401/403 create-post once with `status = draft`.
    DowngradeToDraft,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub affiliate_disclosure: String,
    pub post_status: PostStatus,
    pub categories: Vec<String>,
    pub default_category_id: u64,
    pub posts_per_run: u32,
    pub validation_policy: ValidationPolicy,
    pub permission_policy: PermissionPolicy,
    pub title_templates: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            affiliate_disclosure: DEFAULT_DISCLOSURE.to_string(),
            post_status: PostStatus::Publish,
            categories: Vec::new(),
            default_category_id: 1,
            posts_per_run: 1,
            validation_policy: ValidationPolicy::LenientWithWarning,
            permission_policy: PermissionPolicy::DowngradeToDraft,
            title_templates: default_title_templates(),
        }
    }
}

fn default_title_templates() -> Vec<String> {
    vec![
        "{keyword}の選び方とおすすめ比較【最新ガイド】".to_string(),
        "{keyword}おすすめ人気比較｜失敗しない選び方".to_string(),
        "{keyword}を徹底比較｜用途別のおすすめと注意点".to_string(),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMode {
    Seeds,
    /// Every seed plus every `seed modifier` combination.
    Expand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub mode: KeywordMode,
    pub seeds: Vec<String>,
    pub modifiers: Vec<String>,
    pub max_candidates: usize,
    pub shuffle: bool,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            mode: KeywordMode::Seeds,
            seeds: [
                "USB充電器 65W",
                "電動歯ブラシ コスパ",
                "空気清浄機 小型",
                "コーヒーメーカー 大容量",
                "ロボット掃除機 静音",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            modifiers: vec![
                "おすすめ".to_string(),
                "比較".to_string(),
                "人気".to_string(),
            ],
            max_candidates: 5,
            shuffle: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub min_items: usize,
    pub price_floor: u64,
    pub review_floor: f64,
    pub min_chars: usize,
    pub max_chars: usize,
    pub min_cta: usize,
    pub cta_phrases: Vec<String>,
    pub prompt_items: usize,
    pub strict_markup: bool,
    pub required_sections: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_items: 3,
            price_floor: 0,
            review_floor: 0.0,
            min_chars: 1400,
            max_chars: 12000,
            min_cta: 2,
            cta_phrases: default_cta_phrases(),
            prompt_items: 8,
            strict_markup: false,
            required_sections: Vec::new(),
        }
    }
}

fn default_cta_phrases() -> Vec<String> {
    vec![
        "楽天で見る".to_string(),
        "公式で見る".to_string(),
        "Amazonで見る".to_string(),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Markdown,
    JsonPlan,
    Template,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStyle {
    Responses,
    ChatCompletions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub mode: GenerationMode,
    pub api: ApiStyle,
    pub base_url: String,
    pub model_primary: String,
    pub model_fallback: Vec<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
    pub repair_attempts: u32,
    pub template_on_failure: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::Markdown,
            api: ApiStyle::Responses,
            base_url: "https://api.openai.com/v1".to_string(),
            model_primary: "gpt-5".to_string(),
            model_fallback: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
            temperature: None,
            max_output_tokens: 3600,
            timeout_secs: 120,
            repair_attempts: 1,
            template_on_failure: false,
        }
    }
}

impl LlmConfig {
    /// Primary model followed by the non-empty fallbacks, duplicates removed.
    pub fn model_chain(&self) -> Vec<String> {
        let mut chain: Vec<String> = Vec::with_capacity(1 + self.model_fallback.len());
        for model in std::iter::once(&self.model_primary).chain(self.model_fallback.iter()) {
            let model = model.trim();
            if !model.is_empty() && !chain.iter().any(|m| m == model) {
                chain.push(model.to_string());
            }
        }
        chain
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: String,
    pub hits: u32,
    pub sort: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://app.rakuten.co.jp/services/api/IchibaItem/Search/20220601"
                .to_string(),
            hits: MAX_HITS_PER_REQUEST,
            sort: "-reviewAverage".to_string(),
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    pub timeout_secs: u64,
    pub slug_max_attempts: u32,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            slug_max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub timeout_secs: u64,
    pub run_summary: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            run_summary: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
    pub max_bytes: u64,
    pub keep: u32,
    pub debug_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("run.log"),
            max_bytes: 5 * 1024 * 1024,
            keep: 3,
            debug_dir: None,
        }
    }
}

/// A key that was present but empty and has been replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultedField {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    BuiltIn,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RunConfig,
    pub origin: ConfigOrigin,
    pub defaulted: Vec<DefaultedField>,
}

impl RunConfig {
    /// Load from `path`. A missing file falls back to the built-in defaults
    /// unless `require_file` is set.
    pub fn load(path: &Path, require_file: bool) -> Result<LoadedConfig, ConfigError> {
        if !path.exists() {
            if require_file {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            warn!(path = %path.display(), "Config file not found, using built-in defaults");
            let (config, defaulted) = Self::finish(RunConfig::default())?;
            return Ok(LoadedConfig {
                config,
                origin: ConfigOrigin::BuiltIn,
                defaulted,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidFormat {
            details: format!("cannot read {}: {}", path.display(), e),
        })?;
        let (config, defaulted) = Self::from_yaml_str(&raw)?;
        info!(path = %path.display(), "Loaded run configuration");

        Ok(LoadedConfig {
            config,
            origin: ConfigOrigin::File(path.to_path_buf()),
            defaulted,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<(Self, Vec<DefaultedField>), ConfigError> {
        let parsed = if raw.trim().is_empty() {
            RunConfig::default()
        } else {
            serde_yaml::from_str::<RunConfig>(raw)?
        };
        Self::finish(parsed)
    }

    fn finish(mut config: RunConfig) -> Result<(Self, Vec<DefaultedField>), ConfigError> {
        let defaulted = config.fill_empty_values();
        config.validate()?;
        Ok((config, defaulted))
    }

    fn fill_empty_values(&mut self) -> Vec<DefaultedField> {
        let mut defaulted = Vec::new();

        if self.site.affiliate_disclosure.trim().is_empty() {
            self.site.affiliate_disclosure = DEFAULT_DISCLOSURE.to_string();
            defaulted.push(DefaultedField {
                field: "site.affiliate_disclosure",
                value: DEFAULT_DISCLOSURE.to_string(),
            });
        }
        if self.site.title_templates.iter().all(|t| t.trim().is_empty()) {
            self.site.title_templates = default_title_templates();
            defaulted.push(DefaultedField {
                field: "site.title_templates",
                value: self.site.title_templates.join(" / "),
            });
        }
        if self.content.cta_phrases.iter().all(|p| p.trim().is_empty()) {
            self.content.cta_phrases = default_cta_phrases();
            defaulted.push(DefaultedField {
                field: "content.cta_phrases",
                value: self.content.cta_phrases.join(" / "),
            });
        }
        self.site.title_templates.retain(|t| !t.trim().is_empty());
        self.content.cta_phrases.retain(|p| !p.trim().is_empty());

        defaulted
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.posts_per_run == 0 {
            return Err(invalid("site.posts_per_run", self.site.posts_per_run));
        }
        if !(0.0..=5.0).contains(&self.content.review_floor) {
            return Err(invalid("content.review_floor", self.content.review_floor));
        }
        if !(6..=10).contains(&self.content.prompt_items) {
            return Err(invalid("content.prompt_items", self.content.prompt_items));
        }
        if self.content.min_chars > self.content.max_chars {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "content.min_chars ({}) exceeds content.max_chars ({})",
                    self.content.min_chars, self.content.max_chars
                ),
            });
        }
        if self.llm.model_primary.trim().is_empty() && self.llm.mode != GenerationMode::Template {
            return Err(ConfigError::ValidationFailed {
                reason: "llm.model_primary must name a model".to_string(),
            });
        }
        if self.llm.repair_attempts > 2 {
            return Err(invalid("llm.repair_attempts", self.llm.repair_attempts));
        }
        if self.source.hits == 0 {
            return Err(invalid("source.hits", self.source.hits));
        }
        if self.cms.slug_max_attempts == 0 {
            return Err(invalid("cms.slug_max_attempts", self.cms.slug_max_attempts));
        }
        for template in &self.site.title_templates {
            if !template.contains("{keyword}") {
                return Err(ConfigError::InvalidValue {
                    field: "site.title_templates".to_string(),
                    value: template.clone(),
                });
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Secrets and endpoints read from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub rakuten_app_id: String,
    pub rakuten_affiliate_id: Option<String>,
    pub wp_site_url: String,
    pub wp_username: String,
    pub wp_app_password: String,
    pub alert_webhook_url: Option<String>,
}

impl Credentials {
    pub const REQUIRED: [&'static str; 5] = [
        "OPENAI_API_KEY",
        "RAKUTEN_APP_ID",
        "WP_SITE_URL",
        "WP_USERNAME",
        "WP_APP_PASSWORD",
    ];

    /// Build from an arbitrary lookup; blank values count as missing.
    /// Fails on the first missing name in `REQUIRED` order.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| {
            optional(name).ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: name.to_string(),
            })
        };

        if let Some(missing) = Self::REQUIRED.into_iter().find(|&name| optional(name).is_none()) {
            return Err(ConfigError::MissingEnvironmentVariable {
                var_name: missing.to_string(),
            });
        }

        Ok(Self {
            openai_api_key: required("OPENAI_API_KEY")?,
            rakuten_app_id: required("RAKUTEN_APP_ID")?,
            rakuten_affiliate_id: optional("RAKUTEN_AFFILIATE_ID"),
            wp_site_url: required("WP_SITE_URL")?,
            wp_username: required("WP_USERNAME")?,
            wp_app_password: required("WP_APP_PASSWORD")?,
            alert_webhook_url: optional("ALERT_WEBHOOK_URL"),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"<redacted>")
            .field("rakuten_app_id", &"<redacted>")
            .field("rakuten_affiliate_id", &self.rakuten_affiliate_id.is_some())
            .field("wp_site_url", &self.wp_site_url)
            .field("wp_username", &self.wp_username)
            .field("wp_app_password", &"<redacted>")
            .field("alert_webhook_url", &self.alert_webhook_url.is_some())
            .finish()
    }
}
