use crate::{CmsPublisher, CmsUser, CreatedPost, NewPost};
use async_trait::async_trait;
use autopost_core::{ConfigError, CoreError, PublishError};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

const REST_PREFIX: &str = "wp-json/wp/v2/";
const ERROR_BODY_LIMIT: usize = 500;

#[derive(Clone)]
pub struct WordPressConfig {
    pub site_url: String,
    pub username: String,
    pub app_password: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for WordPressConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordPressConfig")
            .field("site_url", &self.site_url)
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct Category {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    slug: String,
}

#[derive(Debug, Deserialize)]
struct PostSummary {
    id: u64,
}

/// Category names come back HTML-escaped from the REST API.
fn unescape_html(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#8217;", "\u{2019}")
}

fn category_matches(category: &Category, name: &str) -> bool {
    let wanted = name.trim();
    unescape_html(&category.name).trim() == wanted || category.slug.eq_ignore_ascii_case(wanted)
}

fn truncate_body(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut cut = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body[..cut].to_string()
}

/// Error for a non-success reply to `operation`.
pub fn classify_status(operation: &str, status: StatusCode, body: &str) -> PublishError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublishError::PermissionDenied {
            operation: operation.to_string(),
            status: status.as_u16(),
        },
        _ => PublishError::RequestFailed {
            operation: operation.to_string(),
            status: status.as_u16(),
            body: truncate_body(body),
        },
    }
}

/// REST base of the site, e.g. `https://example.com/blog/wp-json/wp/v2/`.
pub fn rest_base(site_url: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        field: "WP_SITE_URL".to_string(),
        value: site_url.to_string(),
    };
    let mut site = Url::parse(site_url.trim()).map_err(|_| invalid())?;
    if !matches!(site.scheme(), "http" | "https") {
        return Err(invalid());
    }
    if !site.path().ends_with('/') {
        let path = format!("{}/", site.path());
        site.set_path(&path);
    }
    site.join(REST_PREFIX).map_err(|_| invalid())
}

#[derive(Debug, Clone)]
pub struct WordPressClient {
    http_client: Client,
    config: WordPressConfig,
    base: Url,
}

impl WordPressClient {
    pub fn new(config: WordPressConfig) -> Result<Self, CoreError> {
        let base = rest_base(&config.site_url)?;
        let http_client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            config,
            base,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        self.base
            .join(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.base, path))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.config.username, Some(&self.config.app_password))
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response, PublishError> {
        let start = Instant::now();
        let response = self.authorized(request).send().await.map_err(|e| {
            warn!(operation, error = %e, "WordPress request failed");
            PublishError::Transport {
                operation: operation.to_string(),
                details: e.to_string(),
            }
        })?;

        let status = response.status();
        debug!(operation, status = %status, elapsed_ms = start.elapsed().as_millis() as u64, "WordPress response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(operation, status = %status, "WordPress API error");
        Err(classify_status(operation, status, &body))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, PublishError> {
        response
            .json::<T>()
            .await
            .map_err(|e| PublishError::InvalidResponse {
                details: e.to_string(),
            })
    }
}

#[async_trait]
impl CmsPublisher for WordPressClient {
    async fn current_user(&self) -> Result<CmsUser, PublishError> {
        let request = self
            .http_client
            .get(self.endpoint("users/me"))
            .query(&[("context", "edit")]);
        let response = self.send("identity check", request).await.map_err(|e| match e {
            PublishError::PermissionDenied { status, .. } => PublishError::AuthenticationFailed {
                reason: format!("users/me returned HTTP {}", status),
            },
            other => other,
        })?;
        let user: CmsUser = Self::read_json(response).await?;
        info!(user_id = user.id, user = %user.slug, "WordPress credentials accepted");
        Ok(user)
    }

    async fn find_category_id(&self, name: &str) -> Result<Option<u64>, PublishError> {
        let request = self
            .http_client
            .get(self.endpoint("categories"))
            .query(&[("search", name), ("per_page", "100")]);
        let response = self.send("category lookup", request).await?;
        let categories: Vec<Category> = Self::read_json(response).await?;
        Ok(categories
            .iter()
            .find(|c| category_matches(c, name))
            .map(|c| c.id))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, PublishError> {
        let request = self.http_client.get(self.endpoint("posts")).query(&[
            ("slug", slug),
            ("status", "publish,future,draft,pending,private"),
            ("context", "edit"),
            ("_fields", "id"),
        ]);
        let response = self.send("slug check", request).await?;
        let posts: Vec<PostSummary> = Self::read_json(response).await?;
        match posts.first() {
            Some(existing) => {
                debug!(slug = %slug, post_id = existing.id, "Slug already taken");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_post(&self, post: &NewPost) -> Result<CreatedPost, PublishError> {
        let request = self.http_client.post(self.endpoint("posts")).json(post);
        let response = self.send("create post", request).await?;
        let created: CreatedPost = Self::read_json(response).await?;
        info!(
            post_id = created.id,
            status = %created.status,
            link = %created.link,
            "Post created"
        );
        Ok(created)
    }
}
