// Downloader module - classify, plan and fetch media through an external fetcher

pub mod backends;
pub mod classifier;
pub mod config;
pub mod errors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod planner;
pub mod progress;
pub mod tools;
pub mod traits;
pub mod utils;

pub use config::DownloaderConfig;
pub use errors::{DownloadError, FetchError, ProbeError};
pub use models::{
    FetchOptions, MediaKind, MediaRequest, OutputPlan, PostProcessor, ProbeResult, ProgressEvent,
    ProgressStatus,
};
pub use orchestrator::Downloader;
pub use progress::{ConsoleProgress, RenderStyle};
pub use traits::{MediaFetcher, ProgressListener};
