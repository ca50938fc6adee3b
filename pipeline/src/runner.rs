use crate::artifacts::DebugArtifacts;
use crate::generate::{generate_draft, repair_draft};
use crate::keywords::select_keywords;
use crate::report::{KeywordOutcome, RunReport};
use autopost_core::clock::today_jst;
use autopost_core::{ErrorExt, GenerationMode, PublishError, RunConfig, ValidationPolicy};
use chrono::NaiveDate;
use cms_publisher::{publish_with_policy, resolve_categories, resolve_unique_slug, CmsPublisher, CmsUser, NewPost};
use content_engine::{excerpt_from_body, rank_candidates, slugify, validate, ValidationRules};
use llm_interface::{LlmProvider, ModelFailure};
use notifier::{events, NotificationEvent, Notifier};
use product_source::ProductSource;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    /// Overrides `site.posts_per_run`.
    pub posts_per_run: Option<u32>,
    /// Explicit keywords; bypasses keyword selection when non-empty.
    pub keywords: Vec<String>,
    /// Date used for slug collision suffixes; today in JST when unset.
    pub date: Option<NaiveDate>,
}

fn skipped(keyword: &str, stage: &str, reason: impl Into<String>) -> KeywordOutcome {
    KeywordOutcome::Skipped {
        keyword: keyword.to_string(),
        stage: stage.to_string(),
        reason: reason.into(),
    }
}

fn string_array(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

pub struct Pipeline<'a> {
    config: &'a RunConfig,
    source: &'a dyn ProductSource,
    llm: &'a dyn LlmProvider,
    cms: &'a dyn CmsPublisher,
    notifier: &'a Notifier,
    artifacts: DebugArtifacts,
    options: RunOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a RunConfig,
        source: &'a dyn ProductSource,
        llm: &'a dyn LlmProvider,
        cms: &'a dyn CmsPublisher,
        notifier: &'a Notifier,
        options: RunOptions,
    ) -> Self {
        Self {
            config,
            source,
            llm,
            cms,
            notifier,
            artifacts: DebugArtifacts::new(config.logging.debug_dir.clone()),
            options,
        }
    }

    fn run_date(&self) -> NaiveDate {
        self.options.date.unwrap_or_else(today_jst)
    }

    fn post_target(&self) -> usize {
        self.options
            .posts_per_run
            .unwrap_or(self.config.site.posts_per_run) as usize
    }

    /// Confirm the CMS credentials before any keyword is processed.
    pub async fn verify_cms(&self) -> Result<CmsUser, PublishError> {
        match self.cms.current_user().await {
            Ok(user) => Ok(user),
            Err(e) => {
                e.log_error();
                self.notifier
                    .notify(
                        NotificationEvent::error(events::CMS_AUTH_FAILED)
                            .stage("preflight")
                            .reason(e.error_code(), e.to_string()),
                    )
                    .await;
                Err(e)
            }
        }
    }

    pub async fn run(&self) -> RunReport {
        let keywords = select_keywords(&self.config.keywords, &self.options.keywords);
        let target = self.post_target();
        let mut report = RunReport::default();

        if keywords.is_empty() {
            warn!("No keywords to process");
            self.notifier
                .notify(NotificationEvent::warning(events::KEYWORDS_EMPTY).stage("keywords"))
                .await;
            return report;
        }

        info!(
            keywords = keywords.len(),
            target,
            dry_run = self.options.dry_run,
            "Starting run"
        );
        for keyword in &keywords {
            if report.successes() >= target {
                break;
            }
            info!(keyword = %keyword, "Processing keyword");
            let outcome = self.process_keyword(keyword).await;
            if let KeywordOutcome::Skipped { stage, reason, .. } = &outcome {
                info!(keyword = %keyword, stage = %stage, reason = %reason, "Keyword skipped");
            }
            report.record(outcome);
        }

        info!(
            attempted = report.attempted,
            posted = report.posted,
            dry_run = report.dry_run,
            skipped = report.skipped,
            "Run finished"
        );
        if self.config.notifications.run_summary {
            self.notifier
                .notify(
                    NotificationEvent::info(events::RUN_SUMMARY)
                        .field("attempted", report.attempted)
                        .field("posted", report.posted)
                        .field("dry_run", report.dry_run)
                        .field("skipped", report.skipped),
                )
                .await;
        }
        report
    }

    async fn report_model_failures(&self, keyword: &str, stage: &str, failures: &[ModelFailure]) {
        for failure in failures {
            self.notifier
                .notify(
                    NotificationEvent::warning(events::LLM_CALL_FAILED)
                        .keyword(keyword)
                        .stage(stage)
                        .field("model", failure.model.as_str())
                        .reason(failure.error.error_code(), failure.error.to_string()),
                )
                .await;
        }
    }

    async fn publish_failed(&self, keyword: &str, stage: &str, error: PublishError) -> KeywordOutcome {
        error.log_error();
        self.notifier
            .notify(
                NotificationEvent::error(events::CMS_POST_FAILED)
                    .keyword(keyword)
                    .stage(stage)
                    .reason(error.error_code(), error.to_string()),
            )
            .await;
        skipped(keyword, stage, error.error_code())
    }

    /// Run one keyword to completion. Every failure ends in a `Skipped`
    /// outcome; nothing here aborts the run.
    pub async fn process_keyword(&self, keyword: &str) -> KeywordOutcome {
        let config = self.config;
        let content = &config.content;

        let items = match self.source.search(keyword, config.source.hits as usize).await {
            Ok(items) => items,
            Err(e) => {
                e.log_warn();
                self.notifier
                    .notify(
                        NotificationEvent::error(events::SOURCE_API_ERROR)
                            .keyword(keyword)
                            .stage("search")
                            .reason(e.error_code(), e.to_string()),
                    )
                    .await;
                return skipped(keyword, "search", e.error_code());
            }
        };

        let fetched = items.len();
        let mut ranked = rank_candidates(items, content.price_floor, content.review_floor);
        if ranked.len() < content.min_items {
            info!(
                keyword = %keyword,
                fetched,
                kept = ranked.len(),
                min_items = content.min_items,
                "Too few candidates after filtering"
            );
            return skipped(keyword, "filter", "thin_result");
        }
        ranked.truncate(content.prompt_items);

        let outcome = generate_draft(self.llm, config, keyword, &ranked, &self.artifacts).await;
        self.report_model_failures(keyword, "generate", &outcome.failures).await;
        if let Some((from, to)) = &outcome.fallback {
            self.notifier
                .notify(
                    NotificationEvent::warning(events::LLM_MODEL_FALLBACK)
                        .keyword(keyword)
                        .stage("generate")
                        .field("from_model", from.as_str())
                        .field("to_model", to.as_str()),
                )
                .await;
        }
        let Some(generated) = outcome.draft else {
            let tried: Vec<String> = outcome.failures.iter().map(|f| f.model.clone()).collect();
            self.notifier
                .notify(
                    NotificationEvent::error(events::LLM_FAILED_FINAL)
                        .keyword(keyword)
                        .stage("generate")
                        .field("models", string_array(&tried)),
                )
                .await;
            return skipped(keyword, "generate", "LLM_FAILED_FINAL");
        };
        let mut draft = generated.draft;

        let rules = ValidationRules::from_config(content);
        let mut result = validate(&draft.body, &rules);
        if !result.ok && !generated.from_template {
            for attempt in 1..=config.llm.repair_attempts {
                let repair = repair_draft(
                    self.llm,
                    config,
                    keyword,
                    &draft.body,
                    &result.violations,
                    &self.artifacts,
                )
                .await;
                self.report_model_failures(keyword, "repair", &repair.failures).await;
                let Some(output) = repair.output else {
                    break;
                };

                let repaired = validate(&output.value, &rules);
                if repaired.violations.len() >= result.violations.len() {
                    info!(
                        keyword = %keyword,
                        attempt,
                        before = result.violations.len(),
                        after = repaired.violations.len(),
                        "Repair did not reduce violations, keeping draft"
                    );
                    continue;
                }
                info!(
                    keyword = %keyword,
                    attempt,
                    model = %output.model,
                    remaining = repaired.violations.len(),
                    "Repaired draft accepted"
                );
                draft.body = output.value;
                draft.model_used = output.model;
                if config.llm.mode != GenerationMode::JsonPlan {
                    draft.excerpt = excerpt_from_body(&draft.body, &config.site.affiliate_disclosure);
                }
                result = repaired;
                if result.ok {
                    break;
                }
            }
        }

        if !result.ok {
            let strict = config.site.validation_policy == ValidationPolicy::Strict;
            let event = if strict {
                NotificationEvent::error(events::VALIDATION_FAILED)
            } else {
                NotificationEvent::warning(events::VALIDATION_FAILED)
            };
            warn!(keyword = %keyword, violations = ?result.violations, strict, "Draft failed validation");
            self.notifier
                .notify(
                    event
                        .keyword(keyword)
                        .stage("validate")
                        .field("violations", string_array(&result.violations))
                        .field("model", draft.model_used.as_str())
                        .field("published_anyway", !strict),
                )
                .await;
            if strict {
                return skipped(keyword, "validate", "VALIDATION_FAILED");
            }
        }

        let categories =
            resolve_categories(self.cms, &config.site.categories, config.site.default_category_id).await;
        let slug = match resolve_unique_slug(
            self.cms,
            &slugify(keyword),
            self.run_date(),
            config.cms.slug_max_attempts,
        )
        .await
        {
            Ok(slug) => slug,
            Err(e) => return self.publish_failed(keyword, "slug", e).await,
        };

        let status = config.site.post_status;
        if self.options.dry_run {
            info!(
                keyword = %keyword,
                slug = %slug,
                status = %status,
                title = %draft.title,
                "Dry run, not creating post"
            );
            return KeywordOutcome::DryRun {
                keyword: keyword.to_string(),
                slug,
                status,
                model: draft.model_used,
            };
        }

        let post = NewPost {
            title: draft.title,
            content: draft.body,
            excerpt: draft.excerpt,
            slug,
            status,
            categories,
        };
        match publish_with_policy(self.cms, post, config.site.permission_policy).await {
            Ok(receipt) => {
                if receipt.downgraded {
                    self.notifier
                        .notify(
                            NotificationEvent::warning(events::CMS_POST_DOWNGRADED)
                                .keyword(keyword)
                                .stage("publish")
                                .field("requested_status", status.as_str())
                                .field("post_id", receipt.post.id)
                                .field("link", receipt.post.link.as_str()),
                        )
                        .await;
                }
                info!(
                    keyword = %keyword,
                    post_id = receipt.post.id,
                    status = %receipt.status,
                    link = %receipt.post.link,
                    "Article published"
                );
                KeywordOutcome::Posted {
                    keyword: keyword.to_string(),
                    post_id: receipt.post.id,
                    link: receipt.post.link,
                    slug: receipt.post.slug,
                    status: receipt.status,
                    model: draft.model_used,
                    downgraded: receipt.downgraded,
                }
            }
            Err(e) => self.publish_failed(keyword, "publish", e).await,
        }
    }
}
