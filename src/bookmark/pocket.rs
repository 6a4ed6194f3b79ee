use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::client::build_http_client;
use crate::config::Config;

use super::{BookmarkError, Bookmarker};

/// Client for the Pocket `v3/add` endpoint.
pub struct PocketClient {
    client: reqwest::Client,
    endpoint: String,
    consumer_key: String,
    access_token: String,
}

impl PocketClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.bookmark_timeout)?,
            endpoint: config.bookmark_endpoint.clone(),
            consumer_key: config.consumer_key.clone(),
            access_token: config.access_token.clone(),
        })
    }
}

#[async_trait]
impl Bookmarker for PocketClient {
    async fn add(&self, url: &str, tags: &[String]) -> Result<bool, BookmarkError> {
        let tags = tags.join(",");
        let form = [
            ("consumer_key", self.consumer_key.as_str()),
            ("access_token", self.access_token.as_str()),
            ("url", url),
            ("tags", tags.as_str()),
        ];

        let resp = match self.client.post(&self.endpoint).form(&form).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(url, error = %e, "Bookmark request failed");
                return Ok(false);
            }
        };

        let status = resp.status();
        let service_error = resp
            .headers()
            .get("X-Error")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(url, error = %e, "Failed to read bookmark response");
                return Ok(false);
            }
        };

        if body.trim().is_empty() {
            tracing::warn!(
                url,
                http_status = status.as_u16(),
                service_error = service_error.as_deref().unwrap_or_default(),
                "Bookmark service returned an empty response"
            );
            return Ok(false);
        }

        interpret_response(&body)
    }
}

/// `{"status": 1}` is accepted, `{"status": 0}` rejected. Anything without a
/// status means the service is unusable for this run.
fn interpret_response(body: &str) -> Result<bool, BookmarkError> {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) => {
            let snippet: String = body.chars().take(200).collect();
            tracing::error!(body = %snippet, "Bookmark service returned an unreadable response");
            return Err(BookmarkError::Fatal {
                error: "unreadable response".to_string(),
                message: snippet,
            });
        }
    };

    match json.get("status") {
        Some(status) if !status.is_null() => Ok(is_truthy(status)),
        _ => {
            let error = field_text(&json, "error");
            let message = field_text(&json, "message");
            tracing::error!("{}: {}", error, message);
            Err(BookmarkError::Fatal { error, message })
        }
    }
}

fn is_truthy(status: &Value) -> bool {
    match status {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(s.trim(), "" | "0" | "false"),
        _ => false,
    }
}

fn field_text(json: &Value, key: &str) -> String {
    match json.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => format!("no {key} given"),
        Some(other) => other.to_string(),
    }
}
