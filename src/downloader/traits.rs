// Seams between the pipeline and the external media fetcher

use async_trait::async_trait;

use super::errors::{FetchError, ProbeError};
use super::models::{FetchOptions, ProgressEvent};

/// External collaborator that resolves URLs and writes media to disk
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Name of the fetcher (for logging)
    fn name(&self) -> &'static str;

    /// Non-downloading metadata query; returns the raw metadata document
    async fn probe(&self, url: &str) -> Result<serde_json::Value, ProbeError>;

    /// Download, post-process and write the media described by `options`
    async fn download(&self, url: &str, options: FetchOptions) -> Result<(), FetchError>;
}

/// Receives progress events; may be called from any thread, once per event
pub trait ProgressListener: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

impl<F> ProgressListener for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProgressEvent) {
        self(event)
    }
}
