use crate::artifacts::DebugArtifacts;
use autopost_core::{ArticleDraft, GenerationMode, LlmError, ProductCandidate, RunConfig};
use content_engine::{
    build_article_prompt, build_repair_prompt, choose_title, excerpt_from_body, render_template_article,
    template_model_name, ArticlePlan, PromptOptions,
};
use llm_interface::{extract_json, generate_with_fallback, plain_text, ChainOutcome, LlmProvider, ModelFailure};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDraft {
    pub draft: ArticleDraft,
    /// Built from the candidates without a model call.
    pub from_template: bool,
}

#[derive(Debug, Clone)]
pub struct DraftOutcome {
    pub draft: Option<GeneratedDraft>,
    pub failures: Vec<ModelFailure>,
    /// `(from_model, to_model)` when a fallback model produced the draft.
    pub fallback: Option<(String, String)>,
}

fn template_draft(config: &RunConfig, keyword: &str, items: &[ProductCandidate]) -> GeneratedDraft {
    let disclosure = &config.site.affiliate_disclosure;
    let body = render_template_article(keyword, items, disclosure, &config.content.cta_phrases);
    GeneratedDraft {
        draft: ArticleDraft {
            title: choose_title(keyword, &config.site.title_templates),
            excerpt: excerpt_from_body(&body, disclosure),
            body,
            model_used: template_model_name().to_string(),
        },
        from_template: true,
    }
}

fn parse_plan(model: &str, text: &str) -> Result<ArticlePlan, LlmError> {
    extract_json(text)
        .and_then(ArticlePlan::from_value)
        .ok_or_else(|| LlmError::MalformedJson {
            model: model.to_string(),
        })
}

fn owned_fallback<T>(outcome: &ChainOutcome<T>) -> Option<(String, String)> {
    outcome
        .fallback()
        .map(|(from, to)| (from.to_string(), to.to_string()))
}

/// Draft an article for `keyword` from the ranked `items`, walking the model
/// chain in the configured generation mode.
pub async fn generate_draft<P: LlmProvider + ?Sized>(
    llm: &P,
    config: &RunConfig,
    keyword: &str,
    items: &[ProductCandidate],
    artifacts: &DebugArtifacts,
) -> DraftOutcome {
    if config.llm.mode == GenerationMode::Template {
        let generated = template_draft(config, keyword, items);
        artifacts.write_output(&generated.draft.body);
        return DraftOutcome {
            draft: Some(generated),
            failures: Vec::new(),
            fallback: None,
        };
    }

    let prompt = build_article_prompt(keyword, items, &PromptOptions::from_config(config));
    artifacts.write_prompt(&prompt.transcript());
    let chain = config.llm.model_chain();
    let title = choose_title(keyword, &config.site.title_templates);
    let disclosure = &config.site.affiliate_disclosure;

    let (draft, failures, fallback) = match config.llm.mode {
        GenerationMode::JsonPlan => {
            let outcome = generate_with_fallback(llm, &chain, &prompt, parse_plan).await;
            let fallback = owned_fallback(&outcome);
            let draft = outcome.output.map(|output| {
                let body = output.value.render_markdown();
                ArticleDraft {
                    title: output.value.title().map(str::to_string).unwrap_or(title),
                    excerpt: output
                        .value
                        .meta_description()
                        .map(str::to_string)
                        .unwrap_or_else(|| excerpt_from_body(&body, disclosure)),
                    body,
                    model_used: output.model,
                }
            });
            (draft, outcome.failures, fallback)
        }
        _ => {
            let outcome = generate_with_fallback(llm, &chain, &prompt, plain_text).await;
            let fallback = owned_fallback(&outcome);
            let draft = outcome.output.map(|output| ArticleDraft {
                title,
                excerpt: excerpt_from_body(&output.value, disclosure),
                body: output.value,
                model_used: output.model,
            });
            (draft, outcome.failures, fallback)
        }
    };

    let draft = match draft {
        Some(draft) => Some(GeneratedDraft {
            draft,
            from_template: false,
        }),
        None if config.llm.template_on_failure => {
            warn!(keyword = %keyword, failed = failures.len(), "Every model failed, using the template article");
            Some(template_draft(config, keyword, items))
        }
        None => None,
    };

    if let Some(generated) = &draft {
        info!(
            keyword = %keyword,
            model = %generated.draft.model_used,
            chars = generated.draft.body.chars().count(),
            "Draft generated"
        );
        artifacts.write_output(&generated.draft.body);
    }

    DraftOutcome {
        draft,
        failures,
        fallback,
    }
}

/// One repair round-trip: the draft and its violation codes go back through
/// the model chain and a full corrected body comes back.
pub async fn repair_draft<P: LlmProvider + ?Sized>(
    llm: &P,
    config: &RunConfig,
    keyword: &str,
    body: &str,
    violations: &[String],
    artifacts: &DebugArtifacts,
) -> ChainOutcome<String> {
    let prompt = build_repair_prompt(keyword, body, violations, &PromptOptions::from_config(config));
    artifacts.write_prompt(&prompt.transcript());
    let outcome = generate_with_fallback(llm, &config.llm.model_chain(), &prompt, plain_text).await;
    if let Some(output) = &outcome.output {
        artifacts.write_output(&output.value);
    }
    outcome
}
