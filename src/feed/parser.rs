use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::{Entry, FeedError};

/// Turns raw feed bytes into entries, in the order the feed lists them.
///
/// RSS 2.0 goes through the `rss` crate. Anything it refuses (Atom, RSS 1.0,
/// JSON Feed) is handed to `feed-rs`.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<Entry>, FeedError> {
    match rss::Channel::read_from(bytes) {
        Ok(channel) => Ok(channel.items().iter().map(entry_from_rss).collect()),
        Err(rss_err) => {
            tracing::debug!(error = %rss_err, "not an RSS 2.0 channel, trying generic parser");
            let feed =
                feed_rs::parser::parse(bytes).map_err(|e| FeedError::Parse(e.to_string()))?;
            Ok(feed.entries.into_iter().map(entry_from_generic).collect())
        }
    }
}

fn entry_from_rss(item: &rss::Item) -> Entry {
    Entry {
        title: item.title().unwrap_or_default().trim().to_string(),
        link: non_empty(item.link()),
        published: item.pub_date().and_then(parse_date),
    }
}

fn entry_from_generic(entry: feed_rs::model::Entry) -> Entry {
    let link = entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| entry.links.first())
        .and_then(|l| non_empty(Some(l.href.as_str())));

    Entry {
        title: entry
            .title
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default(),
        link,
        published: entry.published.or(entry.updated),
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

/// RSS dates are RFC 2822 on paper; plenty of feeds ship RFC 3339 instead,
/// or something close to either. Strict formats are tried first.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_date_lenient(raw))
        .or_else(|| {
            tracing::debug!(date = raw, "unparseable entry date");
            None
        })
}

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%d %b %Y %H:%M %z",
];

/// Read as UTC.
const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

fn parse_date_lenient(raw: &str) -> Option<DateTime<Utc>> {
    // A weekday that disagrees with the date fails strict RFC 2822; the
    // weekday is optional there, so drop it and try again.
    if let Some((day, rest)) = raw.split_once(',') {
        if day.trim().chars().all(|c| c.is_ascii_alphabetic()) {
            if let Ok(dt) = DateTime::parse_from_rfc2822(rest.trim()) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Some(dt) = parse_date_lenient(rest.trim()) {
                return Some(dt);
            }
        }
    }

    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
