use anyhow::{anyhow, Context, Result};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constant::*;

#[derive(Clone)]
pub struct Config {
    // Bookmark service credentials
    pub consumer_key: String,
    pub access_token: String,
    pub bookmark_endpoint: String,
    pub bookmark_timeout: Duration,

    // Feeds
    pub feeds_path: PathBuf,
    pub fetch_timeout: Duration,

    // store path
    pub store_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} is not set"))
        };

        let consumer_key = required("CONSUMER_KEY")?;
        let access_token = required("ACCESS_TOKEN")?;

        let bookmark_endpoint =
            lookup("BOOKMARK_ENDPOINT").unwrap_or_else(|| POCKET_ADD_URL.into());
        let bookmark_timeout = Duration::from_secs(parse_or(
            &lookup,
            "BOOKMARK_TIMEOUT_SECS",
            DEFAULT_BOOKMARK_TIMEOUT_SECS,
        )?);

        let feeds_path = lookup("FEEDS_PATH")
            .unwrap_or_else(|| DEFAULT_FEEDS_PATH.into())
            .into();
        let fetch_timeout = Duration::from_secs(parse_or(
            &lookup,
            "FETCH_TIMEOUT_SECS",
            DEFAULT_FETCH_TIMEOUT_SECS,
        )?);

        let store_path = lookup("STORE_PATH")
            .unwrap_or_else(|| DEFAULT_STORE_PATH.into())
            .into();

        Ok(Config {
            consumer_key,
            access_token,
            bookmark_endpoint,
            bookmark_timeout,
            feeds_path,
            fetch_timeout,
            store_path,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number, got {raw:?}")),
        None => Ok(default),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("consumer_key", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("bookmark_endpoint", &self.bookmark_endpoint)
            .field("bookmark_timeout", &self.bookmark_timeout)
            .field("feeds_path", &self.feeds_path)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("store_path", &self.store_path)
            .finish()
    }
}
