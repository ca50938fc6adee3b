use async_trait::async_trait;
use autopost_core::{
    LlmError, PostStatus, ProductCandidate, PromptMessages, PublishError, RunConfig, SourceError,
    ValidationPolicy, DEFAULT_DISCLOSURE,
};
use chrono::NaiveDate;
use cms_publisher::{CmsPublisher, CmsUser, CreatedPost, NewPost};
use llm_interface::LlmProvider;
use notifier::{events, MemorySink, Notifier, RunContext};
use pipeline::{KeywordOutcome, Pipeline, RunOptions};
use product_source::{collect_paginated, parse_search_page, PageFetcher, ProductSource, SearchPage};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

const KEYWORD: &str = "USB充電器 65W";

struct FixtureSearch {
    body: String,
}

#[async_trait]
impl PageFetcher for FixtureSearch {
    async fn fetch_page(&self, _keyword: &str, _page: u32, _hits: u32) -> Result<SearchPage, SourceError> {
        parse_search_page(&self.body)
    }
}

#[async_trait]
impl ProductSource for FixtureSearch {
    async fn search(&self, keyword: &str, max_results: usize) -> Result<Vec<ProductCandidate>, SourceError> {
        collect_paginated(self, keyword, max_results).await
    }
}

struct FailingSearch;

#[async_trait]
impl ProductSource for FailingSearch {
    async fn search(&self, _keyword: &str, _max_results: usize) -> Result<Vec<ProductCandidate>, SourceError> {
        Err(SourceError::ClientError {
            status: 400,
            body: "wrong_parameter".to_string(),
        })
    }
}

fn rakuten_fixture(count: usize) -> String {
    let items: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "Item": {
                    "itemName": format!("急速充電器 65W モデル{}", i),
                    "itemPrice": 2980 + i as u64 * 400,
                    "itemUrl": format!("https://item.rakuten.example/shop/{}", i),
                    "affiliateUrl": format!("https://hb.afl.rakuten.example/{}", i),
                    "shopName": "充電ストア",
                    "reviewCount": 1200 - i as u64 * 150,
                    "reviewAverage": 4.6 - i as f64 * 0.1,
                    "mediumImageUrls": [{"imageUrl": format!("https://img.example/{}.jpg", i)}]
                }
            })
        })
        .collect();
    serde_json::json!({ "Items": items, "pageCount": 1, "count": count }).to_string()
}

/// Markdown of roughly 4000 characters with one pipe table and three CTAs.
fn article_markdown() -> String {
    let mut body = format!("{}\n\n65W対応の充電器を選ぶときのポイントをまとめました。\n\n## 比較表\n\n", DEFAULT_DISCLOSURE);
    body.push_str("| 商品 | 参考価格 | レビュー |\n|---|---|---|\n");
    for i in 0..5 {
        body.push_str(&format!("| 急速充電器 65W モデル{} | {}円 | ★4.5 |\n", i, 2980 + i * 400));
    }
    body.push('\n');
    for i in 0..3 {
        body.push_str(&format!("👉 [楽天で見る](https://hb.afl.rakuten.example/{})\n\n", i));
    }
    while body.chars().count() < 4000 {
        body.push_str("ノートパソコンまで充電するなら出力と安全規格を確認し、ケーブルの対応電力もあわせて選びましょう。\n\n");
    }
    body
}

struct ScriptedLlm {
    replies: HashMap<String, Vec<Result<String, LlmError>>>,
    prompts: Mutex<Vec<(String, PromptMessages)>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<(&str, Vec<Result<String, LlmError>>)>) -> Self {
        Self {
            replies: replies.into_iter().map(|(m, r)| (m.to_string(), r)).collect(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.prompts.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, model: &str, prompt: &PromptMessages) -> Result<String, LlmError> {
        let mut prompts = self.prompts.lock().unwrap();
        let call_index = prompts.iter().filter(|(m, _)| m == model).count();
        prompts.push((model.to_string(), prompt.clone()));

        match self.replies.get(model) {
            Some(replies) if !replies.is_empty() => replies[call_index.min(replies.len() - 1)].clone(),
            _ => Err(LlmError::ModelNotAvailable {
                model: model.to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct FakeCms {
    reject_auth: bool,
    taken_slugs: HashSet<String>,
    deny_publish: bool,
    fail_create: bool,
    slug_checks: Mutex<Vec<String>>,
    posts: Mutex<Vec<NewPost>>,
}

#[async_trait]
impl CmsPublisher for FakeCms {
    async fn current_user(&self) -> Result<CmsUser, PublishError> {
        if self.reject_auth {
            return Err(PublishError::AuthenticationFailed {
                reason: "HTTP 401".to_string(),
            });
        }
        Ok(CmsUser {
            id: 3,
            name: "Bot".to_string(),
            slug: "bot".to_string(),
        })
    }

    async fn find_category_id(&self, _name: &str) -> Result<Option<u64>, PublishError> {
        Ok(None)
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, PublishError> {
        self.slug_checks.lock().unwrap().push(slug.to_string());
        Ok(self.taken_slugs.contains(slug))
    }

    async fn create_post(&self, post: &NewPost) -> Result<CreatedPost, PublishError> {
        if self.fail_create {
            return Err(PublishError::RequestFailed {
                operation: "create post".to_string(),
                status: 500,
                body: "internal".to_string(),
            });
        }
        if self.deny_publish && post.status == PostStatus::Publish {
            return Err(PublishError::PermissionDenied {
                operation: "create post".to_string(),
                status: 403,
            });
        }
        let mut posts = self.posts.lock().unwrap();
        posts.push(post.clone());
        Ok(CreatedPost {
            id: 100 + posts.len() as u64,
            link: format!("https://blog.example/{}/", post.slug),
            status: post.status.as_str().to_string(),
            slug: post.slug.clone(),
        })
    }
}

fn options() -> RunOptions {
    RunOptions {
        keywords: vec![KEYWORD.to_string()],
        date: NaiveDate::from_ymd_opt(2024, 5, 7),
        ..Default::default()
    }
}

fn recording_notifier() -> (Arc<MemorySink>, Notifier) {
    let sink = Arc::new(MemorySink::new());
    let notifier = Notifier::with_sink(sink.clone(), RunContext::default());
    (sink, notifier)
}

#[tokio::test]
async fn test_usb_charger_publishes_cleanly() {
    let config = RunConfig::default();
    let source = FixtureSearch {
        body: rakuten_fixture(5),
    };
    let llm = ScriptedLlm::new(vec![("gpt-5", vec![Ok(article_markdown())])]);
    let cms = FakeCms::default();
    let (sink, notifier) = recording_notifier();

    let pipeline = Pipeline::new(&config, &source, &llm, &cms, &notifier, options());
    let report = pipeline.run().await;

    assert_eq!(report.attempted, 1);
    assert_eq!(report.posted, 1);
    assert_eq!(report.skipped, 0);

    let prompts = llm.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    for i in 0..5 {
        assert!(prompts[0].1.user.contains(&format!("急速充電器 65W モデル{}", i)));
        assert!(prompts[0].1.user.contains(&format!("https://hb.afl.rakuten.example/{}", i)));
    }

    let posts = cms.posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].status, PostStatus::Publish);
    assert!(posts[0].slug.starts_with("usb-65w-"));
    assert!(!posts[0].slug.contains("20240507"));
    assert_eq!(posts[0].categories, vec![1]);
    assert!(posts[0].title.contains(KEYWORD));
    assert!(!posts[0].excerpt.is_empty());

    match &report.outcomes[0] {
        KeywordOutcome::Posted { model, downgraded, .. } => {
            assert_eq!(model, "gpt-5");
            assert!(!downgraded);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(sink.events().is_empty(), "{:?}", sink.names());
}

#[tokio::test]
async fn test_fallback_emits_single_event() {
    let config = RunConfig::default();
    let source = FixtureSearch {
        body: rakuten_fixture(5),
    };
    let llm = ScriptedLlm::new(vec![
        (
            "gpt-5",
            vec![Err(LlmError::UnsupportedParameter {
                model: "gpt-5".to_string(),
                param: "temperature".to_string(),
                message: "Unsupported value".to_string(),
            })],
        ),
        ("gpt-4o", vec![Ok(article_markdown())]),
    ]);
    let cms = FakeCms::default();
    let (sink, notifier) = recording_notifier();

    let report = Pipeline::new(&config, &source, &llm, &cms, &notifier, options())
        .run()
        .await;

    assert_eq!(report.posted, 1);
    assert_eq!(llm.calls(), vec!["gpt-5", "gpt-4o"]);
    assert_eq!(cms.posts.lock().unwrap()[0].content, article_markdown().trim());

    assert_eq!(sink.count(events::LLM_MODEL_FALLBACK), 1);
    assert_eq!(sink.count(events::LLM_CALL_FAILED), 1);
    let fallback = sink
        .events()
        .into_iter()
        .find(|e| e.event == events::LLM_MODEL_FALLBACK)
        .unwrap();
    assert_eq!(fallback.field_str("from_model"), Some("gpt-5"));
    assert_eq!(fallback.field_str("to_model"), Some("gpt-4o"));
    assert_eq!(fallback.keyword.as_deref(), Some(KEYWORD));
}

#[tokio::test]
async fn test_thin_result_skips_without_model_call() {
    let config = RunConfig::default();
    let source = FixtureSearch {
        body: rakuten_fixture(2),
    };
    let llm = ScriptedLlm::new(vec![("gpt-5", vec![Ok(article_markdown())])]);
    let cms = FakeCms::default();
    let (sink, notifier) = recording_notifier();

    let report = Pipeline::new(&config, &source, &llm, &cms, &notifier, options())
        .run()
        .await;

    assert_eq!(report.skipped, 1);
    assert!(matches!(
        &report.outcomes[0],
        KeywordOutcome::Skipped { stage, reason, .. } if stage == "filter" && reason == "thin_result"
    ));
    assert!(llm.calls().is_empty());
    assert!(cms.posts.lock().unwrap().is_empty());
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_slug_collision_appends_date() {
    let config = RunConfig::default();
    let source = FixtureSearch {
        body: rakuten_fixture(5),
    };
    let llm = ScriptedLlm::new(vec![("gpt-5", vec![Ok(article_markdown())])]);
    let base = content_engine::slugify(KEYWORD);
    let cms = FakeCms {
        taken_slugs: [base.clone()].into_iter().collect(),
        ..Default::default()
    };
    let (_sink, notifier) = recording_notifier();

    Pipeline::new(&config, &source, &llm, &cms, &notifier, options())
        .run()
        .await;

    let posts = cms.posts.lock().unwrap();
    assert_eq!(posts[0].slug, format!("{}-20240507", base));
    assert_eq!(*cms.slug_checks.lock().unwrap(), vec![base.clone(), format!("{}-20240507", base)]);
}

#[tokio::test]
async fn test_source_error_notifies_and_continues() {
    let config = RunConfig::default();
    let llm = ScriptedLlm::new(vec![]);
    let cms = FakeCms::default();
    let (sink, notifier) = recording_notifier();
    let mut opts = options();
    opts.keywords = vec!["電気ケトル".to_string(), "加湿器".to_string()];
    opts.posts_per_run = Some(5);

    let report = Pipeline::new(&config, &FailingSearch, &llm, &cms, &notifier, opts)
        .run()
        .await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(sink.count(events::SOURCE_API_ERROR), 2);
    let event = &sink.events()[0];
    assert_eq!(event.reason_code.as_deref(), Some("SOURCE_CLIENT_ERROR"));
    assert_eq!(event.stage.as_deref(), Some("search"));
}

#[tokio::test]
async fn test_all_models_failing_is_final() {
    let config = RunConfig::default();
    let source = FixtureSearch {
        body: rakuten_fixture(5),
    };
    let llm = ScriptedLlm::new(vec![]);
    let cms = FakeCms::default();
    let (sink, notifier) = recording_notifier();

    let report = Pipeline::new(&config, &source, &llm, &cms, &notifier, options())
        .run()
        .await;

    assert_eq!(report.skipped, 1);
    assert_eq!(sink.count(events::LLM_CALL_FAILED), 3);
    assert_eq!(sink.count(events::LLM_FAILED_FINAL), 1);
    assert_eq!(sink.count(events::LLM_MODEL_FALLBACK), 0);
    assert!(cms.posts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_repair_replaces_draft_with_fewer_violations() {
    let config = RunConfig::default();
    let source = FixtureSearch {
        body: rakuten_fixture(5),
    };
    let short = "短すぎる記事です。".to_string();
    let llm = ScriptedLlm::new(vec![("gpt-5", vec![Ok(short), Ok(article_markdown())])]);
    let cms = FakeCms::default();
    let (sink, notifier) = recording_notifier();

    let report = Pipeline::new(&config, &source, &llm, &cms, &notifier, options())
        .run()
        .await;

    assert_eq!(report.posted, 1);
    assert_eq!(llm.calls(), vec!["gpt-5", "gpt-5"]);
    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[1].1.user.contains("短すぎる記事です。"));
    assert_eq!(cms.posts.lock().unwrap()[0].content, article_markdown().trim());
    assert!(sink.events().is_empty(), "{:?}", sink.names());
}

#[tokio::test]
async fn test_strict_policy_blocks_invalid_draft() {
    let mut config = RunConfig::default();
    config.site.validation_policy = ValidationPolicy::Strict;
    config.llm.repair_attempts = 0;
    let source = FixtureSearch {
        body: rakuten_fixture(5),
    };
    let llm = ScriptedLlm::new(vec![("gpt-5", vec![Ok("短い".to_string())])]);
    let cms = FakeCms::default();
    let (sink, notifier) = recording_notifier();

    let report = Pipeline::new(&config, &source, &llm, &cms, &notifier, options())
        .run()
        .await;

    assert_eq!(report.skipped, 1);
    assert_eq!(sink.count(events::VALIDATION_FAILED), 1);
    assert!(cms.posts.lock().unwrap().is_empty());
    assert_eq!(llm.calls().len(), 1);
}

#[tokio::test]
async fn test_lenient_policy_publishes_with_warning() {
    let mut config = RunConfig::default();
    config.llm.repair_attempts = 0;
    let source = FixtureSearch {
        body: rakuten_fixture(5),
    };
    let llm = ScriptedLlm::new(vec![("gpt-5", vec![Ok("短い".to_string())])]);
    let cms = FakeCms::default();
    let (sink, notifier) = recording_notifier();

    let report = Pipeline::new(&config, &source, &llm, &cms, &notifier, options())
        .run()
        .await;

    assert_eq!(report.posted, 1);
    let event = &sink.events()[0];
    assert_eq!(event.event, events::VALIDATION_FAILED);
    let violations = event.extra["violations"].as_array().unwrap();
    assert!(violations.iter().any(|v| v.as_str().unwrap().starts_with("too_short")));
}

#[tokio::test]
async fn test_permission_denied_downgrades_and_notifies() {
    let config = RunConfig::default();
    let source = FixtureSearch {
        body: rakuten_fixture(5),
    };
    let llm = ScriptedLlm::new(vec![("gpt-5", vec![Ok(article_markdown())])]);
    let cms = FakeCms {
        deny_publish: true,
        ..Default::default()
    };
    let (sink, notifier) = recording_notifier();

    let report = Pipeline::new(&config, &source, &llm, &cms, &notifier, options())
        .run()
        .await;

    assert_eq!(report.posted, 1);
    assert_eq!(cms.posts.lock().unwrap()[0].status, PostStatus::Draft);
    assert_eq!(sink.names(), vec![events::CMS_POST_DOWNGRADED]);
}

#[tokio::test]
async fn test_create_failure_is_per_keyword() {
    let config = RunConfig::default();
    let source = FixtureSearch {
        body: rakuten_fixture(5),
    };
    let llm = ScriptedLlm::new(vec![("gpt-5", vec![Ok(article_markdown())])]);
    let cms = FakeCms {
        fail_create: true,
        ..Default::default()
    };
    let (sink, notifier) = recording_notifier();
    let mut opts = options();
    opts.keywords = vec!["a".to_string(), "b".to_string()];

    let report = Pipeline::new(&config, &source, &llm, &cms, &notifier, opts)
        .run()
        .await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(sink.count(events::CMS_POST_FAILED), 2);
}

#[tokio::test]
async fn test_dry_run_skips_create_and_stops_at_target() {
    let config = RunConfig::default();
    let source = FixtureSearch {
        body: rakuten_fixture(5),
    };
    let llm = ScriptedLlm::new(vec![("gpt-5", vec![Ok(article_markdown())])]);
    let cms = FakeCms::default();
    let (_sink, notifier) = recording_notifier();
    let mut opts = options();
    opts.dry_run = true;
    opts.keywords = vec!["電気ケトル".to_string(), "加湿器".to_string()];

    let report = Pipeline::new(&config, &source, &llm, &cms, &notifier, opts)
        .run()
        .await;

    assert_eq!(report.attempted, 1);
    assert_eq!(report.dry_run, 1);
    assert!(cms.posts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_keywords_notify() {
    let mut config = RunConfig::default();
    config.keywords.seeds.clear();
    let llm = ScriptedLlm::new(vec![]);
    let cms = FakeCms::default();
    let (sink, notifier) = recording_notifier();
    let opts = RunOptions::default();

    let report = Pipeline::new(&config, &FailingSearch, &llm, &cms, &notifier, opts)
        .run()
        .await;

    assert_eq!(report.attempted, 0);
    assert_eq!(sink.names(), vec![events::KEYWORDS_EMPTY]);
}

#[tokio::test]
async fn test_run_summary_when_enabled() {
    let mut config = RunConfig::default();
    config.notifications.run_summary = true;
    config.llm.mode = autopost_core::GenerationMode::Template;
    let source = FixtureSearch {
        body: rakuten_fixture(5),
    };
    let llm = ScriptedLlm::new(vec![]);
    let cms = FakeCms::default();
    let (sink, notifier) = recording_notifier();

    let report = Pipeline::new(&config, &source, &llm, &cms, &notifier, options())
        .run()
        .await;

    assert_eq!(report.posted, 1);
    assert!(llm.calls().is_empty());
    assert_eq!(sink.names(), vec![events::RUN_SUMMARY]);
    assert_eq!(sink.events()[0].extra["posted"], 1);
}

#[tokio::test]
async fn test_rejected_cms_credentials_notify() {
    let config = RunConfig::default();
    let llm = ScriptedLlm::new(vec![]);
    let cms = FakeCms {
        reject_auth: true,
        ..Default::default()
    };
    let (sink, notifier) = recording_notifier();
    let pipeline = Pipeline::new(&config, &FailingSearch, &llm, &cms, &notifier, options());

    assert!(pipeline.verify_cms().await.is_err());
    assert_eq!(sink.names(), vec![events::CMS_AUTH_FAILED]);
    assert_eq!(sink.events()[0].stage.as_deref(), Some("preflight"));

    let cms = FakeCms::default();
    let pipeline = Pipeline::new(&config, &FailingSearch, &llm, &cms, &notifier, options());
    assert_eq!(pipeline.verify_cms().await.unwrap().slug, "bot");
    assert_eq!(sink.count(events::CMS_AUTH_FAILED), 1);
}
