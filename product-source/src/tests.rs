#[cfg(test)]
mod tests {
    use crate::api::{collect_paginated, PageFetcher, SearchPage};
    use async_trait::async_trait;
    use autopost_core::{ProductCandidate, SourceError};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted pages and records every request it sees.
    struct ScriptedFetcher {
        pages: Mutex<VecDeque<Result<SearchPage, SourceError>>>,
        requests: Mutex<Vec<(String, u32, u32)>>,
    }

    impl ScriptedFetcher {
        fn new(pages: Vec<Result<SearchPage, SourceError>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<(String, u32, u32)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_page(
            &self,
            keyword: &str,
            page: u32,
            hits: u32,
        ) -> Result<SearchPage, SourceError> {
            self.requests
                .lock()
                .unwrap()
                .push((keyword.to_string(), page, hits));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(SearchPage::default()))
        }
    }

    fn page_of(n: usize, offset: usize, page_count: Option<u32>) -> SearchPage {
        let items = (0..n)
            .map(|i| {
                let id = offset + i;
                ProductCandidate::new(
                    format!("item-{}", id),
                    format!("https://item.example/{}", id),
                    1000 + id as u64,
                    4.0,
                    10,
                    "",
                )
            })
            .collect();
        SearchPage {
            items,
            received: n,
            page_count,
        }
    }

    #[tokio::test]
    async fn test_single_page_caps_hits_at_request_ceiling() {
        let fetcher = ScriptedFetcher::new(vec![Ok(page_of(30, 0, Some(9)))]);
        let items = collect_paginated(&fetcher, "USB充電器 65W", 30).await.unwrap();

        assert_eq!(items.len(), 30);
        assert_eq!(fetcher.requests(), vec![("USB充電器 65W".to_string(), 1, 30)]);
    }

    #[tokio::test]
    async fn test_paginates_until_total_reached() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(page_of(30, 0, Some(10))),
            Ok(page_of(15, 30, Some(10))),
        ]);
        let items = collect_paginated(&fetcher, "空気清浄機 小型", 45).await.unwrap();

        assert_eq!(items.len(), 45);
        let requests = fetcher.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!((requests[0].1, requests[0].2), (1, 30));
        assert_eq!((requests[1].1, requests[1].2), (2, 15));
        assert_eq!(items[44].name, "item-44");
    }

    #[tokio::test]
    async fn test_short_page_signals_exhaustion() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(page_of(30, 0, None)),
            Ok(page_of(4, 30, None)),
            Ok(page_of(30, 34, None)),
        ]);
        let items = collect_paginated(&fetcher, "kw", 90).await.unwrap();

        assert_eq!(items.len(), 34);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_page_count_stops_pagination() {
        let fetcher = ScriptedFetcher::new(vec![Ok(page_of(30, 0, Some(1)))]);
        let items = collect_paginated(&fetcher, "kw", 60).await.unwrap();

        assert_eq!(items.len(), 30);
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_records_do_not_end_pagination_early() {
        let mut first = page_of(28, 0, None);
        first.received = 30;
        let fetcher = ScriptedFetcher::new(vec![Ok(first), Ok(page_of(2, 28, None))]);
        let items = collect_paginated(&fetcher, "kw", 60).await.unwrap();

        assert_eq!(items.len(), 30);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_response_is_empty_list() {
        let fetcher = ScriptedFetcher::new(vec![Ok(SearchPage::default())]);
        let items = collect_paginated(&fetcher, "kw", 30).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_first_page_error_is_returned() {
        let fetcher = ScriptedFetcher::new(vec![Err(SourceError::ClientError {
            status: 400,
            body: "wrong_parameter".to_string(),
        })]);
        let result = collect_paginated(&fetcher, "kw", 30).await;
        assert!(matches!(result, Err(SourceError::ClientError { status: 400, .. })));
    }

    #[tokio::test]
    async fn test_later_page_error_keeps_collected_items() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(page_of(30, 0, None)),
            Err(SourceError::ServerError { status_code: 503 }),
        ]);
        let items = collect_paginated(&fetcher, "kw", 60).await.unwrap();
        assert_eq!(items.len(), 30);
    }

    #[test]
    fn test_blank_keyword_makes_no_request() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let items = tokio_test::block_on(collect_paginated(&fetcher, "  \t ", 30)).unwrap();
        assert!(items.is_empty());
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn test_keyword_is_sanitized_before_request() {
        let fetcher = ScriptedFetcher::new(vec![Ok(page_of(1, 0, None))]);
        tokio_test::block_on(collect_paginated(&fetcher, "  ロボット掃除機   静音 ", 5)).unwrap();
        assert_eq!(fetcher.requests()[0].0, "ロボット掃除機 静音");
        assert_eq!(fetcher.requests()[0].2, 5);
    }
}
