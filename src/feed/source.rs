use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use std::collections::HashSet;
use std::path::Path;

use crate::constant::DEFAULT_TAG;

/// A feed to poll, as listed in the feed list file. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    /// Tags sent along with every bookmark; always ends with the default tag.
    pub tags: Vec<String>,
    /// Accepted for forward compatibility, never applied.
    pub filter: Option<String>,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, tags: Vec<String>, filter: Option<String>) -> Self {
        let mut seen = HashSet::new();
        let mut tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();
        if !seen.contains(DEFAULT_TAG) {
            tags.push(DEFAULT_TAG.to_string());
        }

        Self {
            url: url.into(),
            tags,
            filter,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedList {
    Wrapped { feeds: Vec<FeedItem> },
    Bare(Vec<FeedItem>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedItem {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        filter: Option<String>,
    },
}

/// Reads the feed list. `.yaml`/`.yml` files are parsed as YAML; anything else
/// is one URL per line, with blank lines and `#` comments skipped.
pub fn load_sources(path: &Path) -> Result<Vec<FeedSource>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed list {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let sources = match ext.as_str() {
        "yaml" | "yml" => parse_yaml(&content)
            .with_context(|| format!("Failed to parse feed list {}", path.display()))?,
        _ => parse_lines(&content),
    };

    Ok(dedup(sources))
}

fn parse_lines(content: &str) -> Vec<FeedSource> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|url| FeedSource::new(url, vec![], None))
        .collect()
}

fn parse_yaml(content: &str) -> Result<Vec<FeedSource>> {
    let items = match serde_yaml::from_str::<Option<FeedList>>(content)? {
        Some(FeedList::Wrapped { feeds }) | Some(FeedList::Bare(feeds)) => feeds,
        None => vec![],
    };

    items
        .into_iter()
        .map(|item| {
            let (url, tags, filter) = match item {
                FeedItem::Url(url) => (url, vec![], None),
                FeedItem::Detailed { url, tags, filter } => (url, tags, filter),
            };
            let url = url.trim();
            if url.is_empty() {
                return Err(anyhow!("feed entry with an empty url"));
            }
            Ok(FeedSource::new(url, tags, filter))
        })
        .collect()
}

fn dedup(sources: Vec<FeedSource>) -> Vec<FeedSource> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|s| {
            let fresh = seen.insert(s.url.clone());
            if !fresh {
                tracing::warn!(feed = %s.url, "Feed listed more than once, ignoring duplicate");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_tag_appended_once() {
        let source = FeedSource::new("https://a", vec!["tech".into(), " tech ".into()], None);
        assert_eq!(source.tags, vec!["tech", "feed"]);

        let source = FeedSource::new("https://a", vec!["feed".into(), "news".into()], None);
        assert_eq!(source.tags, vec!["feed", "news"]);
    }

    #[test]
    fn test_line_based_list() {
        let file = write_temp(
            ".txt",
            "# my feeds\nhttps://a.example/rss\n\n  https://b.example/atom  \n#https://c.example\n",
        );
        let sources = load_sources(file.path()).unwrap();
        let urls: Vec<_> = sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.example/rss", "https://b.example/atom"]);
        assert!(sources.iter().all(|s| s.tags == vec!["feed"]));
    }

    #[test]
    fn test_yaml_list() {
        let file = write_temp(
            ".yaml",
            r#"
feeds:
  - https://a.example/rss
  - url: https://b.example/atom
    tags: [rust, blogs]
    filter: "release"
"#,
        );
        let sources = load_sources(file.path()).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0], FeedSource::new("https://a.example/rss", vec![], None));
        assert_eq!(sources[1].tags, vec!["rust", "blogs", "feed"]);
        assert_eq!(sources[1].filter.as_deref(), Some("release"));
    }

    #[test]
    fn test_yaml_bare_sequence() {
        let file = write_temp(".yml", "- https://a.example/rss\n- url: https://b.example\n");
        let sources = load_sources(file.path()).unwrap();
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn test_duplicates_dropped() {
        let file = write_temp(".txt", "https://a.example\nhttps://a.example\n");
        assert_eq!(load_sources(file.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_sources(&dir.path().join("rss.txt")).is_err());
    }

    #[test]
    fn test_bad_yaml_is_error() {
        let file = write_temp(".yaml", "feeds:\n  - url: [unclosed\n");
        assert!(load_sources(file.path()).is_err());

        let file = write_temp(".yaml", "feeds:\n  - url: \"  \"\n");
        assert!(load_sources(file.path()).is_err());
    }
}
