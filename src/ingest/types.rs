// src/ingest/types.rs
use crate::model::Category;

/// One item as it came off a feed. Never persisted.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub published_at: Option<String>, // RFC 3339, UTC
    pub origin_url: String,           // feed endpoint the item was read from
}

/// One feed URL belonging to a category group.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedEndpoint {
    pub category: Category,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("http status {0}")]
    Status(u16),
    #[error("feed parse error: {0}")]
    Parse(String),
}

#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, endpoint: &FeedEndpoint) -> Result<Vec<RawItem>, FetchError>;
    fn name(&self) -> &'static str;
}
