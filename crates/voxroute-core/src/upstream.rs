//! Upstream API trait definitions

use crate::{Result, types::ConversationRecord, types::DateRange};
use serde_json::Value;

/// One request against the cursor-paginated conversation listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationQuery {
    pub call_start_after_unix: Option<i64>,
    pub call_start_before_unix: Option<i64>,
    pub page_size: u32,
    pub cursor: Option<String>,
}

impl ConversationQuery {
    /// First-page query for a date range
    pub fn for_range(range: &DateRange, page_size: u32) -> Self {
        Self {
            call_start_after_unix: range.start_after_unix(),
            call_start_before_unix: range.start_before_unix(),
            page_size,
            cursor: None,
        }
    }

    /// Same filter, next cursor
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

/// One page of upstream conversations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationPage {
    pub conversations: Vec<ConversationRecord>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl ConversationPage {
    /// Parse a page body leniently
    ///
    /// A body without `has_more` is treated as the final page, which covers
    /// upstream shapes that do not paginate at all.
    pub fn from_upstream(body: Value) -> Self {
        let Value::Object(mut map) = body else {
            return Self::default();
        };

        let conversations = match map.remove("conversations") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(ConversationRecord::from_upstream)
                .collect(),
            _ => Vec::new(),
        };

        let has_more = map
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let next_cursor = map
            .get("next_cursor")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Self {
            conversations,
            has_more,
            next_cursor,
        }
    }
}

/// Upstream conversational-AI API
///
/// Implementations:
/// - `ElevenLabsConnector` (voxroute-egress): reqwest against the real API
/// - test doubles in the ingress and integration tests
#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch a single page of conversations
    async fn list_conversations(&self, query: &ConversationQuery) -> Result<ConversationPage>;

    /// Fetch one conversation's detail, passed through untouched
    async fn get_conversation(&self, conversation_id: &str) -> Result<Value>;

    /// Fetch all voices, or a single voice when `voice_id` is given
    async fn get_voices(&self, voice_id: Option<&str>) -> Result<Value>;
}
