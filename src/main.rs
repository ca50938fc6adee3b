mod cli;
mod logging;

use anyhow::Context;
use autopost_core::{
    ConfigError, ConfigOrigin, Credentials, ErrorExt, LoadedConfig, NotificationConfig, RunConfig,
    DEFAULT_CONFIG_PATH,
};
use clap::Parser;
use cli::Cli;
use cms_publisher::{WordPressClient, WordPressConfig};
use llm_interface::{OpenAiConfig, OpenAiProvider};
use notifier::{events, NotificationEvent, Notifier, RunContext};
use pipeline::{Pipeline, RunOptions};
use product_source::{RakutenClient, RakutenConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let (path, require_file) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let loaded = RunConfig::load(&path, require_file);
    let logging_config = loaded
        .as_ref()
        .map(|l| l.config.logging.clone())
        .unwrap_or_default();
    logging::init(&logging_config);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting autopost");

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Could not start the async runtime");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async {
        let timeout_secs = loaded
            .as_ref()
            .map(|l| l.config.notifications.timeout_secs)
            .unwrap_or(NotificationConfig::default().timeout_secs);
        let webhook = std::env::var("ALERT_WEBHOOK_URL").ok();
        let notifier = Notifier::from_webhook(
            webhook.as_deref(),
            Duration::from_secs(timeout_secs),
            RunContext::from_env(),
        );

        match run(cli, loaded, |name| std::env::var(name).ok(), &notifier).await {
            Ok(code) => code,
            Err(e) => {
                error!("Run failed: {:#}", e);
                notifier
                    .notify(
                        NotificationEvent::error(events::RUN_FAILED)
                            .stage("run")
                            .reason("RUN_FAILED", format!("{:#}", e)),
                    )
                    .await;
                ExitCode::FAILURE
            }
        }
    })
}

/// Resolve the required environment before anything leaves the process.
/// A gap is reported as `ENV_MISSING` and yields `None`.
async fn check_credentials<F>(lookup: F, notifier: &Notifier) -> Option<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    match Credentials::from_lookup(lookup) {
        Ok(credentials) => Some(credentials),
        Err(e) => {
            e.log_error();
            let mut event = NotificationEvent::error(events::ENV_MISSING)
                .stage("preflight")
                .reason(e.error_code(), e.user_friendly_message());
            if let ConfigError::MissingEnvironmentVariable { var_name } = &e {
                event = event.field("var_name", var_name.as_str());
            }
            notifier.notify(event).await;
            None
        }
    }
}

/// Fatal conditions that have already been reported return `Ok(FAILURE)`;
/// anything else surfaces as `Err` and is reported by the caller.
async fn run<F>(
    cli: Cli,
    loaded: Result<LoadedConfig, ConfigError>,
    env: F,
    notifier: &Notifier,
) -> anyhow::Result<ExitCode>
where
    F: Fn(&str) -> Option<String>,
{
    let loaded = loaded.context("loading run configuration")?;
    match &loaded.origin {
        ConfigOrigin::File(path) => info!(path = %path.display(), "Using configuration file"),
        ConfigOrigin::BuiltIn => warn!(path = DEFAULT_CONFIG_PATH, "No configuration file, using built-in defaults"),
    }
    let Some(credentials) = check_credentials(env, notifier).await else {
        return Ok(ExitCode::FAILURE);
    };
    for defaulted in &loaded.defaulted {
        warn!(field = defaulted.field, "Empty config value replaced by default");
        notifier
            .notify(
                NotificationEvent::warning(events::CONFIG_DEFAULTED)
                    .stage("config")
                    .field("field", defaulted.field)
                    .field("value", defaulted.value.as_str()),
            )
            .await;
    }
    let config = loaded.config;

    let source = RakutenClient::new(RakutenConfig::from_source(
        &config.source,
        credentials.rakuten_app_id.clone(),
        credentials.rakuten_affiliate_id.clone(),
    ))
    .context("building product search client")?;
    let llm = OpenAiProvider::new(OpenAiConfig::from_llm(
        &config.llm,
        credentials.openai_api_key.clone(),
    ))
    .context("building text generation client")?;
    let cms = WordPressClient::new(WordPressConfig {
        site_url: credentials.wp_site_url.clone(),
        username: credentials.wp_username.clone(),
        app_password: credentials.wp_app_password.clone(),
        timeout: Duration::from_secs(config.cms.timeout_secs),
    })
    .context("building WordPress client")?;

    let options = RunOptions {
        dry_run: cli.dry_run,
        posts_per_run: cli.posts,
        keywords: cli.keywords,
        date: None,
    };
    let pipeline = Pipeline::new(&config, &source, &llm, &cms, notifier, options);

    if pipeline.verify_cms().await.is_err() {
        return Ok(ExitCode::FAILURE);
    }

    let report = pipeline.run().await;
    info!(
        attempted = report.attempted,
        posted = report.posted,
        dry_run = report.dry_run,
        skipped = report.skipped,
        "Done"
    );
    Ok(ExitCode::SUCCESS)
}
