use chrono::{DateTime, Utc};
use thiserror::Error;

use std::collections::HashSet;

use crate::bookmark::{BookmarkError, Bookmarker};
use crate::feed::{Entry, FeedSource};
use crate::store::WatermarkRecord;

#[derive(Debug, Error)]
#[error("{undated} of {total} entries have no published time")]
pub struct MissingSortKey {
    pub undated: usize,
    pub total: usize,
}

/// Orders entries newest first. The sort is stable, so equal timestamps keep
/// feed order. A feed that dates none of its entries is left in feed order; a
/// feed that dates only some of them cannot be ordered.
pub fn sort_entries(entries: &mut [Entry]) -> Result<(), MissingSortKey> {
    let undated = entries.iter().filter(|e| e.published.is_none()).count();
    if undated == entries.len() {
        return Ok(());
    }
    if undated > 0 {
        return Err(MissingSortKey {
            undated,
            total: entries.len(),
        });
    }

    entries.sort_by(|a, b| b.published.cmp(&a.published));
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Links the bookmark service accepted, in the order they were sent.
    pub forwarded: Vec<String>,
    /// Links the bookmark service turned down.
    pub failed: Vec<String>,
    /// Whether the walk ended on an already forwarded link.
    pub stopped_at_watermark: bool,
}

/// Walks `entries` (newest first) and forwards every link newer than the
/// feed's watermarks. On a feed's first run only the newest entry is tried.
///
/// Only a fatal bookmark error is returned; a link the service turns down is
/// logged, left out of the watermark, and the walk moves on.
pub async fn dispatch(
    source: &FeedSource,
    entries: &[Entry],
    record: &mut WatermarkRecord,
    first_run: bool,
    run_at: DateTime<Utc>,
    bookmarker: &dyn Bookmarker,
) -> Result<DispatchReport, BookmarkError> {
    let mut report = DispatchReport::default();
    let mut walked = HashSet::new();
    // Stop links are the watermarks as they stood before this walk; `advance`
    // below pushes the older one out of the live record.
    let watermarks = record.clone();

    for entry in entries {
        let Some(link) = entry.link.as_deref() else {
            tracing::warn!(feed = %source.url, title = %entry.title, "Entry has no link, skipping");
            continue;
        };

        if watermarks.is_seen(link) || !walked.insert(link) {
            tracing::debug!(feed = %source.url, link, "Reached an already forwarded entry");
            report.stopped_at_watermark = true;
            break;
        }

        tracing::info!(
            feed = %source.url,
            title = %entry.title,
            published = ?entry.published,
            link,
            "New article"
        );

        if bookmarker.add(link, &source.tags).await? {
            record.advance(link, run_at);
            tracing::info!(link, "Article added");
            report.forwarded.push(link.to_string());
        } else {
            tracing::warn!(link, "Article not added");
            report.failed.push(link.to_string());
        }

        if first_run {
            break;
        }
    }

    Ok(report)
}
