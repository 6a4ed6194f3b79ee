pub mod fetcher;
pub mod parser;
pub mod source;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use fetcher::HttpFetcher;
pub use parser::parse_entries;
pub use source::{load_sources, FeedSource};

/// One item read from a fetched feed. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub title: String,
    /// Identity used for deduplication. Items without one cannot be forwarded.
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

impl Entry {
    #[allow(dead_code)]
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        published: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            title: title.into(),
            link: Some(link.into()),
            published,
        }
    }
}

/// Anything that goes wrong between requesting a feed and holding its entries.
/// All variants are recoverable: the feed is skipped for this run.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("timed out reading feed")]
    Timeout,

    #[error("cannot access feed: {0}")]
    Connect(String),

    #[error("feed responded with HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to parse feed: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FeedError::Timeout
        } else if e.is_connect() {
            FeedError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            FeedError::Status(status.as_u16())
        } else {
            FeedError::Request(e.to_string())
        }
    }
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FeedError>;
}
