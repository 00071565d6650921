// Orchestrator - classify, plan, prepare the destination, fetch

use std::sync::Arc;

use super::classifier::classify;
use super::config::DownloaderConfig;
use super::errors::{DownloadError, FetchError};
use super::models::{FetchOptions, MediaRequest, OutputPlan, PostProcessor};
use super::planner::plan;
use super::tools::{ToolManager, ToolType};
use super::traits::{MediaFetcher, ProgressListener};

/// One download pipeline over a fetcher
pub struct Downloader {
    fetcher: Box<dyn MediaFetcher>,
    config: DownloaderConfig,
    check_ffmpeg: bool,
}

impl Downloader {
    pub fn new(fetcher: Box<dyn MediaFetcher>, config: DownloaderConfig) -> Self {
        Self {
            fetcher,
            config,
            check_ffmpeg: true,
        }
    }

    /// Skip the ffmpeg availability warning (used by tests and dry runs)
    pub fn without_ffmpeg_check(mut self) -> Self {
        self.check_ffmpeg = false;
        self
    }

    /// Classify and plan without touching the filesystem
    pub async fn prepare(
        &self,
        url: &str,
        request: &MediaRequest,
    ) -> Result<OutputPlan, DownloadError> {
        let probe = classify(self.fetcher.as_ref(), url).await?;
        Ok(plan(&probe, request, self.config.base_dir()))
    }

    /// Run the whole pipeline for `url`, returning the plan that was executed
    pub async fn run(
        &self,
        url: &str,
        request: &MediaRequest,
        listener: Arc<dyn ProgressListener>,
    ) -> Result<OutputPlan, DownloadError> {
        let url = url.trim();
        let output_plan = self.prepare(url, request).await?;

        let chain: Vec<&str> = output_plan
            .postprocessors
            .iter()
            .map(PostProcessor::key)
            .collect();
        tracing::info!(
            request = %request,
            template = %output_plan.template,
            collection = output_plan.is_collection,
            chain = %chain.join(","),
            "planned"
        );

        if self.check_ffmpeg {
            warn_if_ffmpeg_missing().await;
        }

        ensure_destination(&output_plan).await?;

        let options = FetchOptions::from_plan(output_plan.clone()).with_progress(listener);
        tracing::debug!(fetcher = self.fetcher.name(), ?options, "fetching");
        self.fetcher.download(url, options).await?;

        tracing::info!(url, "fetch complete");
        Ok(output_plan)
    }
}

/// Every request embeds metadata, so every fetch runs ffmpeg
async fn warn_if_ffmpeg_missing() {
    let lookup =
        tokio::task::spawn_blocking(|| ToolManager::new().get_tool_info(ToolType::Ffmpeg)).await;

    match lookup {
        Ok(ffmpeg) if !ffmpeg.is_available => {
            tracing::warn!("ffmpeg not found; post-processing will likely fail");
        }
        Ok(_) => {}
        Err(e) => tracing::debug!("ffmpeg lookup failed: {}", e),
    }
}

/// Create the destination directory; idempotent
async fn ensure_destination(output_plan: &OutputPlan) -> Result<(), FetchError> {
    tokio::fs::create_dir_all(&output_plan.destination)
        .await
        .map_err(|e| FetchError::Directory {
            path: output_plan.destination.display().to_string(),
            reason: e.to_string(),
        })
}
