// Runtime configuration threaded through classifier, planner and fetcher

use std::path::{Path, PathBuf};

/// Default root for everything the pipeline writes.
pub const DEFAULT_BASE_DIR: &str = "downloads";

/// Configuration for a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    /// Root directory; media lands in `<base_dir>/audio` or `<base_dir>/videos`
    pub base_dir: PathBuf,
    /// Explicit yt-dlp binary (auto-detected when None)
    pub ytdlp_path: Option<PathBuf>,
    /// SOCKS5/HTTP proxy URL handed to yt-dlp
    pub proxy: Option<String>,
    /// yt-dlp socket timeout in seconds
    pub socket_timeout: Option<u32>,
    /// Optional upper bound for the probe subprocess; unbounded when None
    pub probe_timeout_secs: Option<u64>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            ytdlp_path: None,
            proxy: None,
            socket_timeout: None,
            probe_timeout_secs: None,
        }
    }
}

impl DownloaderConfig {
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_ytdlp_path(mut self, path: Option<PathBuf>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_socket_timeout(mut self, seconds: Option<u32>) -> Self {
        self.socket_timeout = seconds;
        self
    }

    pub fn with_probe_timeout(mut self, seconds: Option<u64>) -> Self {
        self.probe_timeout_secs = seconds;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Network arguments shared by probe and download invocations.
    pub fn network_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        if let Some(timeout) = self.socket_timeout {
            args.push("--socket-timeout".to_string());
            args.push(timeout.to_string());
        }

        args
    }
}
