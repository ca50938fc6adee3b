//! Candidate ranking, prompt rendering, draft validation and the article
//! metadata (title, slug, excerpt) derived from a keyword.

pub mod article;
pub mod plan;
pub mod prompt;
pub mod ranking;
pub mod template;
pub mod validator;

pub use article::{bucket, choose_title, cta_labels, excerpt_from_body, slugify};
pub use plan::{ArticlePlan, PlanCta};
pub use prompt::{build_article_prompt, build_repair_prompt, format_yen, PromptOptions};
pub use ranking::{compare_rank, price_stats, rank_candidates, sort_by_rank, PriceStats};
pub use template::{render_template_article, template_model_name};
pub use validator::{validate, visible_char_count, ValidationRules};
