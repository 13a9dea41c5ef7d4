//! Cursor-paginated conversation fetcher
//!
//! Walks the upstream listing one page at a time, each request carrying the
//! previous page's cursor, until upstream reports `has_more = false`.

use tracing::{debug, info, warn};
use voxroute_core::{ConversationQuery, ConversationRecord, DateRange, Error, Upstream};

/// Pagination settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Records requested per page
    pub page_size: u32,

    /// Hard ceiling on pages per fetch
    pub max_pages: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 1000,
        }
    }
}

/// All records of one fetch, in arrival order
#[derive(Debug, Clone, Default)]
pub struct FetchedConversations {
    pub records: Vec<ConversationRecord>,
    pub pages: u32,
}

/// Fetch every conversation matching `range`
///
/// Pages are requested sequentially. The first non-success upstream answer
/// aborts the fetch and is returned as-is (no retry). Records are not
/// deduplicated.
pub async fn fetch_all_conversations(
    upstream: &dyn Upstream,
    range: &DateRange,
    config: &PaginationConfig,
) -> voxroute_core::Result<FetchedConversations> {
    let mut query = ConversationQuery::for_range(range, config.page_size);
    let mut fetched = FetchedConversations::default();

    loop {
        let page = upstream.list_conversations(&query).await?;
        fetched.pages += 1;

        debug!(
            "Page {}: {} conversations (has_more={})",
            fetched.pages,
            page.conversations.len(),
            page.has_more
        );
        fetched.records.extend(page.conversations);

        if !page.has_more {
            break;
        }

        let Some(cursor) = page.next_cursor else {
            warn!(
                "Upstream reported has_more without next_cursor after page {}, stopping",
                fetched.pages
            );
            break;
        };

        if fetched.pages >= config.max_pages {
            return Err(Error::PaginationLimit {
                max_pages: config.max_pages,
            });
        }

        query = query.with_cursor(cursor);
    }

    info!(
        "Fetched {} conversations in {} page(s)",
        fetched.records.len(),
        fetched.pages
    );

    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;
    use voxroute_core::ConversationPage;

    /// Serves canned pages in order and records every query it saw
    struct ScriptedUpstream {
        pages: Mutex<Vec<voxroute_core::Result<ConversationPage>>>,
        queries: Mutex<Vec<ConversationQuery>>,
    }

    impl ScriptedUpstream {
        fn new(pages: Vec<voxroute_core::Result<ConversationPage>>) -> Self {
            let mut pages = pages;
            pages.reverse();
            Self {
                pages: Mutex::new(pages),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<ConversationQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Upstream for ScriptedUpstream {
        async fn list_conversations(
            &self,
            query: &ConversationQuery,
        ) -> voxroute_core::Result<ConversationPage> {
            self.queries.lock().unwrap().push(query.clone());
            self.pages
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(ConversationPage::default()))
        }

        async fn get_conversation(&self, _id: &str) -> voxroute_core::Result<Value> {
            Ok(Value::Null)
        }

        async fn get_voices(&self, _voice_id: Option<&str>) -> voxroute_core::Result<Value> {
            Ok(Value::Null)
        }
    }

    fn page(start: usize, count: usize, next: Option<&str>) -> voxroute_core::Result<ConversationPage> {
        Ok(ConversationPage {
            conversations: (start..start + count)
                .map(|i| ConversationRecord {
                    conversation_id: Some(format!("conv_{}", i)),
                    start_time_unix_secs: Some(i as i64),
                    ..Default::default()
                })
                .collect(),
            has_more: next.is_some(),
            next_cursor: next.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_three_pages_accumulate_in_order() {
        let upstream = ScriptedUpstream::new(vec![
            page(0, 100, Some("c1")),
            page(100, 100, Some("c2")),
            page(200, 37, None),
        ]);

        let fetched = fetch_all_conversations(&upstream, &DateRange::all(), &PaginationConfig::default())
            .await
            .unwrap();

        assert_eq!(fetched.records.len(), 237);
        assert_eq!(fetched.pages, 3);
        assert_eq!(fetched.records[0].conversation_id.as_deref(), Some("conv_0"));
        assert_eq!(fetched.records[236].conversation_id.as_deref(), Some("conv_236"));

        let cursors: Vec<_> = upstream.queries().into_iter().map(|q| q.cursor).collect();
        assert_eq!(cursors, vec![None, Some("c1".to_string()), Some("c2".to_string())]);
    }

    #[tokio::test]
    async fn test_filter_carried_on_every_page() {
        let upstream = ScriptedUpstream::new(vec![page(0, 1, Some("c1")), page(1, 1, None)]);
        let range = DateRange::parse(Some("2024-01-01"), Some("2024-01-01")).unwrap();

        fetch_all_conversations(&upstream, &range, &PaginationConfig { page_size: 10, max_pages: 5 })
            .await
            .unwrap();

        for query in upstream.queries() {
            assert_eq!(query.call_start_after_unix, Some(1_704_067_200));
            assert_eq!(query.call_start_before_unix, Some(1_704_153_600));
            assert_eq!(query.page_size, 10);
        }
    }

    #[tokio::test]
    async fn test_unpaginated_upstream_single_iteration() {
        let upstream = ScriptedUpstream::new(vec![page(0, 5, None)]);

        let fetched = fetch_all_conversations(&upstream, &DateRange::all(), &PaginationConfig::default())
            .await
            .unwrap();

        assert_eq!(fetched.records.len(), 5);
        assert_eq!(upstream.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_has_more_without_cursor_terminates() {
        let upstream = ScriptedUpstream::new(vec![Ok(ConversationPage {
            conversations: vec![ConversationRecord::default()],
            has_more: true,
            next_cursor: None,
        })]);

        let fetched = fetch_all_conversations(&upstream, &DateRange::all(), &PaginationConfig::default())
            .await
            .unwrap();

        assert_eq!(fetched.pages, 1);
        assert_eq!(fetched.records.len(), 1);
    }

    #[tokio::test]
    async fn test_upstream_error_aborts_without_retry() {
        let upstream = ScriptedUpstream::new(vec![
            page(0, 100, Some("c1")),
            Err(Error::Upstream {
                status_code: 503,
                body: "overloaded".to_string(),
            }),
            page(200, 1, None),
        ]);

        let err = fetch_all_conversations(&upstream, &DateRange::all(), &PaginationConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err.upstream_status(), Some(503));
        assert_eq!(upstream.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_max_pages_ceiling() {
        let upstream = ScriptedUpstream::new(vec![
            page(0, 1, Some("c1")),
            page(1, 1, Some("c2")),
            page(2, 1, Some("c3")),
        ]);

        let err = fetch_all_conversations(
            &upstream,
            &DateRange::all(),
            &PaginationConfig {
                page_size: 1,
                max_pages: 2,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::PaginationLimit { max_pages: 2 }));
    }
}
