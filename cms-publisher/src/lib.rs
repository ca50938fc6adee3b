//! Publishing articles to a WordPress site over its REST API.

pub mod publish;
pub mod wordpress;


pub use publish::{publish_with_policy, resolve_categories, resolve_unique_slug, slug_candidates, PublishReceipt};
pub use wordpress::{WordPressClient, WordPressConfig};

use async_trait::async_trait;
use autopost_core::{PostStatus, PublishError};
use serde::{Deserialize, Serialize};

/// The account the CMS credentials resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CmsUser {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub slug: String,
    pub status: PostStatus,
    pub categories: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedPost {
    pub id: u64,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub slug: String,
}

#[async_trait]
pub trait CmsPublisher: Send + Sync {
    /// Resolve the authenticated user. Fails when the credentials are rejected.
    async fn current_user(&self) -> Result<CmsUser, PublishError>;

    /// Exact-name lookup of a category id.
    async fn find_category_id(&self, name: &str) -> Result<Option<u64>, PublishError>;

    /// Whether any post, in any status, already uses `slug`.
    async fn slug_exists(&self, slug: &str) -> Result<bool, PublishError>;

    async fn create_post(&self, post: &NewPost) -> Result<CreatedPost, PublishError>;
}
