// Error types for the probe and fetch stages

use thiserror::Error;

/// Failure while classifying a URL (the non-downloading probe).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// yt-dlp binary could not be started
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// URL is malformed or empty
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No extractor recognises the URL
    #[error("Unsupported source: {0}")]
    Unsupported(String),

    /// Connection refused, DNS failure, HTTP errors
    #[error("Network error: {0}")]
    Network(String),

    /// Probe did not finish within the configured bound
    #[error("Probe timed out after {0}s")]
    Timeout(u64),

    /// Probe output was not the JSON we expect
    #[error("Parse error: {0}")]
    Parse(String),

    /// Process failed for a reason we could not classify
    #[error("Execution error: {0}")]
    Execution(String),
}

impl ProbeError {
    /// Classify yt-dlp stderr into a probe error.
    pub fn from_stderr(stderr: &str) -> Self {
        let lower = stderr.to_lowercase();
        let message = first_error_line(stderr);

        if lower.contains("unsupported url") || lower.contains("no suitable extractor") {
            return Self::Unsupported(message);
        }

        if lower.contains("is not a valid url") || lower.contains("invalid url") {
            return Self::InvalidUrl(message);
        }

        if is_network_failure(&lower) {
            return Self::Network(message);
        }

        Self::Execution(message)
    }
}

/// Failure while downloading, transcoding or writing media.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// yt-dlp binary could not be started
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Destination directory could not be created
    #[error("Cannot create destination directory {path}: {reason}")]
    Directory { path: String, reason: String },

    /// Transfer interrupted or refused
    #[error("Network error: {0}")]
    Network(String),

    /// No stream matched the format selector, or the transcode target is unusable
    #[error("Requested format is not available: {0}")]
    UnsupportedFormat(String),

    /// Non-zero exit for any other reason (disk full, postprocessor failure, ...)
    #[error("Execution error: {0}")]
    Execution(String),
}

impl FetchError {
    /// Classify yt-dlp stderr into a fetch error.
    pub fn from_stderr(stderr: &str) -> Self {
        let lower = stderr.to_lowercase();
        let message = first_error_line(stderr);

        if lower.contains("requested format is not available")
            || lower.contains("format not available")
            || lower.contains("no video formats found")
        {
            return Self::UnsupportedFormat(message);
        }

        if is_network_failure(&lower) {
            return Self::Network(message);
        }

        Self::Execution(message)
    }
}

/// Anything that can end a pipeline run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

fn is_network_failure(lower: &str) -> bool {
    lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("name or service not known")
        || lower.contains("temporary failure in name resolution")
        || lower.contains("unable to download webpage")
        || lower.contains("http error")
}

/// Pick the most useful line of yt-dlp stderr, falling back to the whole text.
fn first_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| stderr.lines().rev().find(|line| !line.trim().is_empty()))
        .unwrap_or(stderr)
        .trim()
        .to_string()
}
