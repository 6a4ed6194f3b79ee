use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use std::path::PathBuf;

use crate::bookmark::{BookmarkError, Bookmarker};
use crate::dispatch::{dispatch, sort_entries};
use crate::feed::{parse_entries, Entry, FeedError, FeedFetcher, FeedSource};
use crate::store::WatermarkStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub feeds_total: usize,
    pub feeds_skipped: usize,
    pub forwarded: usize,
    pub failed: usize,
}

pub struct Pipeline {
    sources: Vec<FeedSource>,
    fetcher: Box<dyn FeedFetcher>,
    bookmarker: Box<dyn Bookmarker>,
    store_path: PathBuf,
}

impl Pipeline {
    /// One pass over every feed. The watermark store is loaded first and
    /// written back only after the last feed; a fatal error skips the write.
    pub async fn run_once(&self, run_at: DateTime<Utc>) -> Result<RunSummary> {
        tracing::info!(feeds = self.sources.len(), "Running pipeline once");

        let mut store = WatermarkStore::load(&self.store_path)?;
        let summary = self.dispatch_all(&mut store, run_at).await?;
        store.persist(&self.store_path)?;

        Ok(summary)
    }

    pub async fn dispatch_all(
        &self,
        store: &mut WatermarkStore,
        run_at: DateTime<Utc>,
    ) -> Result<RunSummary, BookmarkError> {
        let mut summary = RunSummary {
            feeds_total: self.sources.len(),
            ..Default::default()
        };

        for source in &self.sources {
            tracing::info!(feed = %source.url, "Checking feed");
            if let Some(filter) = &source.filter {
                tracing::debug!(feed = %source.url, filter, "Feed filters are not applied");
            }

            let mut entries = match self.read_feed(source).await {
                Ok(entries) => entries,
                Err(e) => {
                    log_feed_error(source, &e);
                    summary.feeds_skipped += 1;
                    continue;
                }
            };
            if entries.is_empty() {
                tracing::info!(feed = %source.url, "Feed has no entries");
                continue;
            }
            if let Err(e) = sort_entries(&mut entries) {
                tracing::warn!(feed = %source.url, error = %e, "Cannot order feed entries, skipping feed");
                summary.feeds_skipped += 1;
                continue;
            }

            let (record, first_run) = store.get_or_create(&source.url);
            if first_run {
                tracing::info!(feed = %source.url, "New feed, forwarding only its latest entry");
            }

            let report = dispatch(
                source,
                &entries,
                record,
                first_run,
                run_at,
                self.bookmarker.as_ref(),
            )
            .await?;
            tracing::info!(
                feed = %source.url,
                forwarded = report.forwarded.len(),
                failed = report.failed.len(),
                caught_up = report.stopped_at_watermark,
                "Feed done"
            );
            summary.forwarded += report.forwarded.len();
            summary.failed += report.failed.len();
        }

        Ok(summary)
    }

    async fn read_feed(&self, source: &FeedSource) -> Result<Vec<Entry>, FeedError> {
        let body = self.fetcher.fetch(&source.url).await?;
        parse_entries(&body)
    }
}

fn log_feed_error(source: &FeedSource, e: &FeedError) {
    match e {
        FeedError::Timeout => {
            tracing::warn!(feed = %source.url, "Timeout when reading feed")
        }
        FeedError::Connect(reason) => {
            tracing::warn!(feed = %source.url, reason = %reason, "Cannot access feed")
        }
        other => tracing::error!(feed = %source.url, error = %other, "Unexpected error"),
    }
}

pub struct PipelineBuilder {
    sources: Vec<FeedSource>,
    fetcher: Option<Box<dyn FeedFetcher>>,
    bookmarker: Option<Box<dyn Bookmarker>>,
    store_path: Option<PathBuf>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            sources: vec![],
            fetcher: None,
            bookmarker: None,
            store_path: None,
        }
    }

    pub fn build(self) -> Result<Pipeline> {
        Ok(Pipeline {
            sources: self.sources,
            fetcher: self.fetcher.ok_or(anyhow!("Pipeline needs a feed fetcher"))?,
            bookmarker: self
                .bookmarker
                .ok_or(anyhow!("Pipeline needs a bookmark client"))?,
            store_path: self
                .store_path
                .ok_or(anyhow!("Pipeline needs a store path"))?,
        })
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = FeedSource>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl FeedFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    pub fn with_bookmarker(mut self, bookmarker: impl Bookmarker + 'static) -> Self {
        self.bookmarker = Some(Box::new(bookmarker));
        self
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }
}
