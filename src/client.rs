use std::time::Duration;

use anyhow::{Context, Result};

use crate::constant::USER_AGENT;

/// Every outbound request carries a timeout; a hung peer must not stall the run.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}
