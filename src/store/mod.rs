pub mod table;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::path::Path;

/// The last two links forwarded for one feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkRecord {
    pub feed_url: String,
    #[serde(rename = "saved_item_link_latest")]
    pub latest_link: Option<String>,
    #[serde(rename = "saved_item_link_second_latest")]
    pub second_latest_link: Option<String>,
    #[serde(rename = "updated_time")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WatermarkRecord {
    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            latest_link: None,
            second_latest_link: None,
            updated_at: None,
        }
    }

    /// Whether `link` is one of the two stored watermarks.
    pub fn is_seen(&self, link: &str) -> bool {
        self.latest_link.as_deref() == Some(link) || self.second_latest_link.as_deref() == Some(link)
    }

    /// Shifts `link` in as the latest watermark, at most once per run.
    ///
    /// A second forward within the same run (same `run_at`) leaves the record
    /// untouched, so after several forwards the pair holds the first link
    /// forwarded this run and the latest link from before the run.
    pub fn advance(&mut self, link: &str, run_at: DateTime<Utc>) -> bool {
        if self.updated_at == Some(run_at) {
            return false;
        }

        self.second_latest_link = self.latest_link.take();
        self.latest_link = Some(link.to_string());
        self.updated_at = Some(run_at);
        true
    }
}

/// All watermarks, keyed and ordered by feed url.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatermarkStore {
    records: BTreeMap<String, WatermarkRecord>,
}

impl WatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the persisted table, or an empty store when nothing was persisted
    /// yet. A file that exists but cannot be decoded is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No watermark store yet, starting empty");
            return Ok(Self::new());
        }

        let mut store = Self::new();
        for record in table::read_compressed(path)? {
            if let Some(prev) = store.insert(record) {
                tracing::warn!(feed = %prev.feed_url, "Duplicate watermark row, keeping the last one");
            }
        }
        tracing::info!(path = %path.display(), feeds = store.len(), "Loaded watermark store");

        Ok(store)
    }

    /// Replaces whatever was persisted at `path` with the full current table.
    pub fn persist(&self, path: &Path) -> Result<()> {
        table::write_compressed(path, self.records())?;
        tracing::info!(path = %path.display(), feeds = self.len(), "Persisted watermark store");
        Ok(())
    }

    #[allow(dead_code)]
    pub fn get(&self, feed_url: &str) -> Option<&WatermarkRecord> {
        self.records.get(feed_url)
    }

    /// Returns the feed's record and whether this is the feed's first run.
    pub fn get_or_create(&mut self, feed_url: &str) -> (&mut WatermarkRecord, bool) {
        let first_run = !self.records.contains_key(feed_url);
        let record = self
            .records
            .entry(feed_url.to_string())
            .or_insert_with(|| WatermarkRecord::new(feed_url));
        (record, first_run)
    }

    pub fn insert(&mut self, record: WatermarkRecord) -> Option<WatermarkRecord> {
        self.records.insert(record.feed_url.clone(), record)
    }

    pub fn records(&self) -> impl Iterator<Item = &WatermarkRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_get_or_create() {
        let mut store = WatermarkStore::new();

        let (record, first_run) = store.get_or_create("https://a");
        assert!(first_run);
        assert_eq!(*record, WatermarkRecord::new("https://a"));
        record.advance("https://a/1", at(1));

        let (record, first_run) = store.get_or_create("https://a");
        assert!(!first_run);
        assert_eq!(record.latest_link.as_deref(), Some("https://a/1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_advance_shifts_once_per_run() {
        let mut record = WatermarkRecord::new("https://a");
        record.latest_link = Some("B".into());
        record.second_latest_link = Some("A".into());
        record.updated_at = Some(at(100));

        assert!(record.advance("D", at(200)));
        assert!(!record.advance("C", at(200)));

        assert_eq!(record.latest_link.as_deref(), Some("D"));
        assert_eq!(record.second_latest_link.as_deref(), Some("B"));
        assert_eq!(record.updated_at, Some(at(200)));

        // next run shifts again
        assert!(record.advance("E", at(300)));
        assert_eq!(record.latest_link.as_deref(), Some("E"));
        assert_eq!(record.second_latest_link.as_deref(), Some("D"));
    }

    #[test]
    fn test_is_seen() {
        let mut record = WatermarkRecord::new("https://a");
        assert!(!record.is_seen("X"));
        record.latest_link = Some("X".into());
        record.second_latest_link = Some("Y".into());
        assert!(record.is_seen("X"));
        assert!(record.is_seen("Y"));
        assert!(!record.is_seen("Z"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = WatermarkStore::load(&dir.path().join("rss_database.csv.gz")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rss_database.csv.gz");

        let mut store = WatermarkStore::new();
        store.insert(WatermarkRecord {
            feed_url: "https://z.example/feed".into(),
            latest_link: Some("https://z.example/2".into()),
            second_latest_link: Some("https://z.example/1".into()),
            updated_at: Some(Utc.timestamp_opt(1_750_000_000, 123_456_789).unwrap()),
        });
        store.insert(WatermarkRecord::new("https://a.example/feed"));
        store.insert(WatermarkRecord {
            feed_url: "https://m.example/feed".into(),
            latest_link: Some("https://m.example/, with comma".into()),
            second_latest_link: None,
            updated_at: Some(at(1_700_000_000)),
        });

        store.persist(&path).unwrap();
        let loaded = WatermarkStore::load(&path).unwrap();
        assert_eq!(loaded, store);

        let urls: Vec<_> = loaded.records().map(|r| r.feed_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://a.example/feed",
                "https://m.example/feed",
                "https://z.example/feed"
            ]
        );
    }

    #[test]
    fn test_persist_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rss_database.csv.gz");

        let mut store = WatermarkStore::new();
        store.insert(WatermarkRecord::new("https://a"));
        store.insert(WatermarkRecord::new("https://b"));
        store.persist(&path).unwrap();

        let mut smaller = WatermarkStore::new();
        smaller.insert(WatermarkRecord::new("https://c"));
        smaller.persist(&path).unwrap();

        assert_eq!(WatermarkStore::load(&path).unwrap(), smaller);
    }

    #[test]
    fn test_load_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rss_database.csv.gz");
        std::fs::write(&path, b"definitely not gzip").unwrap();
        assert!(WatermarkStore::load(&path).is_err());
    }
}
