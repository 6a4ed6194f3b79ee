pub mod pocket;

use async_trait::async_trait;
use thiserror::Error;

pub use pocket::PocketClient;

#[derive(Debug, Error)]
pub enum BookmarkError {
    /// The service rejected the request in a way that will affect every
    /// further call (bad credentials, unknown endpoint). Ends the run.
    #[error("bookmark service refused the request: {error}: {message}")]
    Fatal { error: String, message: String },
}

#[async_trait]
pub trait Bookmarker: Send + Sync {
    /// Saves `url` with `tags`. `Ok(false)` means this one link was not saved
    /// and the run can carry on.
    async fn add(&self, url: &str, tags: &[String]) -> Result<bool, BookmarkError>;
}
