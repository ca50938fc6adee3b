//! Keyword product search against the Rakuten Ichiba item search API.

pub mod api;
pub mod retry;

mod tests;

pub use api::{
    collect_paginated, parse_search_page, sanitize_keyword, PageFetcher, ProductSource,
    RakutenClient, RakutenConfig, SearchPage,
};
pub use retry::{calculate_delay, get_retry_strategy, RetryConfig, RetryExecutor, RetryStrategy};
