use crate::retry::{RetryConfig, RetryExecutor};
use async_trait::async_trait;
use autopost_core::{ProductCandidate, SourceConfig, SourceError, MAX_HITS_PER_REQUEST};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The search API refuses page numbers above this.
pub const MAX_PAGE: u32 = 100;

const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// One page of normalized search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub items: Vec<ProductCandidate>,
    /// Raw item count in the response, before unusable records were dropped.
    pub received: usize,
    pub page_count: Option<u32>,
}

/// A single paginated search request. Implemented by the HTTP client and by
/// in-memory fakes in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, keyword: &str, page: u32, hits: u32)
        -> Result<SearchPage, SourceError>;
}

/// Keyword search returning up to `max_results` candidates.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn search(
        &self,
        keyword: &str,
        max_results: usize,
    ) -> Result<Vec<ProductCandidate>, SourceError>;
}

/// Trim and collapse internal whitespace.
pub fn sanitize_keyword(keyword: &str) -> String {
    keyword.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Request pages until `max_results` is reached, a page comes back short, or
/// the reported page count is exhausted. A failure after at least one good page
/// keeps what was already collected.
pub async fn collect_paginated<F>(
    fetcher: &F,
    keyword: &str,
    max_results: usize,
) -> Result<Vec<ProductCandidate>, SourceError>
where
    F: PageFetcher + ?Sized,
{
    let keyword = sanitize_keyword(keyword);
    if keyword.is_empty() || max_results == 0 {
        return Ok(Vec::new());
    }

    let mut collected: Vec<ProductCandidate> = Vec::new();
    let mut page = 1;

    while collected.len() < max_results && page <= MAX_PAGE {
        let remaining = max_results - collected.len();
        let hits = remaining.min(MAX_HITS_PER_REQUEST as usize) as u32;

        let batch = match fetcher.fetch_page(&keyword, page, hits).await {
            Ok(batch) => batch,
            Err(e) if !collected.is_empty() => {
                warn!(
                    keyword = %keyword,
                    page,
                    collected = collected.len(),
                    "Search page failed, keeping earlier pages: {}",
                    e
                );
                break;
            }
            Err(e) => return Err(e),
        };

        let exhausted = batch.received < hits as usize
            || batch.page_count.map_or(false, |count| page >= count);
        collected.extend(batch.items.into_iter().take(remaining));

        if exhausted {
            debug!(keyword = %keyword, page, "Search results exhausted");
            break;
        }
        page += 1;
    }

    info!(keyword = %keyword, total = collected.len(), pages = page, "Collected search results");
    Ok(collected)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "Items", default)]
    items: Vec<ItemEnvelope>,
    #[serde(rename = "pageCount", default)]
    page_count: Option<u32>,
}

/// `formatVersion=1` wraps each record as `{"Item": {...}}`; version 2 does not.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemEnvelope {
    Wrapped {
        #[serde(rename = "Item")]
        item: RawItem,
    },
    Flat(RawItem),
}

impl ItemEnvelope {
    fn into_item(self) -> RawItem {
        match self {
            ItemEnvelope::Wrapped { item } => item,
            ItemEnvelope::Flat(item) => item,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawItem {
    item_name: String,
    item_price: Value,
    item_url: String,
    affiliate_url: Option<String>,
    medium_image_urls: Vec<Value>,
    shop_name: String,
    review_count: Value,
    review_average: Value,
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn first_image(images: &[Value]) -> String {
    images
        .first()
        .and_then(|image| match image {
            Value::String(url) => Some(url.clone()),
            Value::Object(map) => map
                .get("imageUrl")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .unwrap_or_default()
}

fn normalize(raw: RawItem) -> Option<ProductCandidate> {
    let url = raw
        .affiliate_url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or(raw.item_url);
    let name = raw.item_name.trim().to_string();
    if name.is_empty() || url.trim().is_empty() {
        return None;
    }

    let price = number(&raw.item_price).unwrap_or(0.0).max(0.0).round() as u64;
    let review_count = number(&raw.review_count).unwrap_or(0.0).max(0.0) as u64;
    let review_average = number(&raw.review_average).unwrap_or(0.0);

    Some(
        ProductCandidate::new(
            name,
            url,
            price,
            review_average,
            review_count,
            first_image(&raw.medium_image_urls),
        )
        .with_shop(raw.shop_name),
    )
}

/// Parse a search response body into a normalized page.
pub fn parse_search_page(body: &str) -> Result<SearchPage, SourceError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| SourceError::InvalidResponse {
            details: e.to_string(),
        })?;

    let received = response.items.len();
    let items: Vec<ProductCandidate> = response
        .items
        .into_iter()
        .filter_map(|envelope| normalize(envelope.into_item()))
        .collect();

    if items.len() < received {
        debug!(
            dropped = received - items.len(),
            "Dropped search records without a name or URL"
        );
    }

    Ok(SearchPage {
        items,
        received,
        page_count: response.page_count,
    })
}

/// Map a non-success status to the error taxonomy.
pub fn classify_status(status: StatusCode, retry_after: Option<&str>, body: String) -> SourceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = retry_after
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return SourceError::RateLimitExceeded { retry_after };
    }
    if status.is_server_error() {
        return SourceError::ServerError {
            status_code: status.as_u16(),
        };
    }
    let mut body = body;
    if body.len() > 500 {
        let cut = (0..=500).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        body.truncate(cut);
    }
    SourceError::ClientError {
        status: status.as_u16(),
        body,
    }
}

#[derive(Debug, Clone)]
pub struct RakutenConfig {
    pub endpoint: String,
    pub application_id: String,
    pub affiliate_id: Option<String>,
    pub sort: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl RakutenConfig {
    pub fn from_source(
        source: &SourceConfig,
        application_id: impl Into<String>,
        affiliate_id: Option<String>,
    ) -> Self {
        Self {
            endpoint: source.endpoint.clone(),
            application_id: application_id.into(),
            affiliate_id,
            sort: source.sort.clone(),
            timeout: Duration::from_secs(source.timeout_secs),
            retry: RetryConfig::search(source.max_retries),
        }
    }
}

#[derive(Debug)]
pub struct RakutenClient {
    http_client: Client,
    config: RakutenConfig,
    retry: RetryExecutor,
}

impl RakutenClient {
    pub fn new(config: RakutenConfig) -> Result<Self, SourceError> {
        let http_client = Client::builder()
            .user_agent(concat!("autopost/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::ConnectionFailed {
                details: format!("failed to build HTTP client: {}", e),
            })?;
        let retry = RetryExecutor::new(config.retry.clone());

        Ok(Self {
            http_client,
            config,
            retry,
        })
    }

    async fn make_request(&self, keyword: &str, page: u32, hits: u32) -> Result<Response, SourceError> {
        let hits = hits.clamp(1, MAX_HITS_PER_REQUEST).to_string();
        let page = page.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("applicationId", self.config.application_id.as_str()),
            ("keyword", keyword),
            ("hits", hits.as_str()),
            ("page", page.as_str()),
            ("format", "json"),
            ("imageFlag", "1"),
        ];
        if !self.config.sort.is_empty() {
            query.push(("sort", self.config.sort.as_str()));
        }
        if let Some(affiliate_id) = &self.config.affiliate_id {
            query.push(("affiliateId", affiliate_id.as_str()));
        }

        debug!(keyword = %keyword, page = %page, hits = %hits, "Making product search request");
        let response = self
            .http_client
            .get(&self.config.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                error!("Network error for product search: {}", e);
                if e.is_timeout() {
                    SourceError::RequestTimeout
                } else {
                    SourceError::ConnectionFailed {
                        details: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), keyword = %keyword, "Product search failed");
        Err(classify_status(status, retry_after.as_deref(), body))
    }

    async fn request_page(&self, keyword: &str, page: u32, hits: u32) -> Result<SearchPage, SourceError> {
        let response = self.make_request(keyword, page, hits).await?;
        let body = response.text().await.map_err(|e| SourceError::InvalidResponse {
            details: e.to_string(),
        })?;
        parse_search_page(&body)
    }
}

#[async_trait]
impl PageFetcher for RakutenClient {
    async fn fetch_page(
        &self,
        keyword: &str,
        page: u32,
        hits: u32,
    ) -> Result<SearchPage, SourceError> {
        self.retry
            .execute("product search", move || self.request_page(keyword, page, hits))
            .await
    }
}

#[async_trait]
impl ProductSource for RakutenClient {
    async fn search(
        &self,
        keyword: &str,
        max_results: usize,
    ) -> Result<Vec<ProductCandidate>, SourceError> {
        collect_paginated(self, keyword, max_results).await
    }
}
