use serde::{Deserialize, Serialize};

/// Longest slug ever sent to the CMS, collision suffix included.
pub const SLUG_MAX_LEN: usize = 120;

/// A product record normalized from one search result item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCandidate {
    pub name: String,
    pub url: String,
    /// Price in whole yen.
    pub price: u64,
    pub review_average: f64,
    pub review_count: u64,
    pub image_url: String,
    pub shop: String,
    score: f64,
}

impl ProductCandidate {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        price: u64,
        review_average: f64,
        review_count: u64,
        image_url: impl Into<String>,
    ) -> Self {
        let review_average = if review_average.is_finite() {
            review_average.clamp(0.0, 5.0)
        } else {
            0.0
        };
        Self {
            name: name.into(),
            url: url.into(),
            price,
            review_average,
            review_count,
            image_url: image_url.into(),
            shop: String::new(),
            score: Self::popularity_score(review_average, review_count),
        }
    }

    pub fn with_shop(mut self, shop: impl Into<String>) -> Self {
        self.shop = shop.into();
        self
    }

    /// `review_average * ln(1 + count)`, with a zero count treated as one review.
    pub fn popularity_score(review_average: f64, review_count: u64) -> f64 {
        let count = review_count.max(1) as f64;
        review_average * count.ln_1p()
    }

    pub fn score(&self) -> f64 {
        self.score
    }
}

/// System and user instructions for one generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessages {
    pub system: String,
    pub user: String,
}

impl PromptMessages {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Both messages as one text block, for debug artifacts.
    pub fn transcript(&self) -> String {
        format!("[system]\n{}\n\n[user]\n{}\n", self.system, self.user)
    }
}

/// Generated article before publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub model_used: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub violations: Vec<String>,
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<String>) -> Self {
        Self {
            ok: violations.is_empty(),
            violations,
        }
    }
}

/// Post status values accepted by the CMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Publish,
    Draft,
    Pending,
    Private,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Publish => "publish",
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Private => "private",
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
