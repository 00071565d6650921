// Common data models for the download pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::format_selector::{AudioBitrate, FormatSelector, HeightCeiling};
use super::traits::ProgressListener;

/// Whether a URL points at one item or an ordered group of items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaKind {
    Single,
    /// Playlist, album or set; title is None when the source does not report one
    Collection { title: Option<String> },
}

/// Outcome of the non-downloading probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub kind: MediaKind,
    /// Display title of the item (or of the collection itself)
    pub title: Option<String>,
    /// Number of members, when the probe reports it
    pub entry_count: Option<u64>,
}

impl ProbeResult {
    pub fn single(title: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Single,
            title: Some(title.into()),
            entry_count: None,
        }
    }

    pub fn collection(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            kind: MediaKind::Collection {
                title: Some(title.clone()),
            },
            title: Some(title),
            entry_count: None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, MediaKind::Collection { .. })
    }

    pub fn collection_title(&self) -> Option<&str> {
        match &self.kind {
            MediaKind::Collection { title } => title.as_deref(),
            MediaKind::Single => None,
        }
    }
}

/// What the user asked for; selects format, post-processing and destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MediaRequest {
    /// Best audio, re-encoded to MP3 at the given bitrate
    AudioTranscode { bitrate: AudioBitrate },
    /// Best audio exactly as served, metadata embedded
    AudioKeepOriginal,
    /// Best video up to the ceiling merged with best audio
    Video { ceiling: HeightCeiling },
}

impl MediaRequest {
    /// Build an audio request from raw CLI input; bad bitrates become 320.
    pub fn audio(quality: &str, keep_original: bool) -> Self {
        if keep_original {
            Self::AudioKeepOriginal
        } else {
            Self::AudioTranscode {
                bitrate: AudioBitrate::from_preference(quality),
            }
        }
    }

    /// Build a video request from a resolution label; bad labels become 1080p.
    pub fn video(label: &str) -> Self {
        Self::Video {
            ceiling: HeightCeiling::from_label(label),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video { .. })
    }

    /// Subdirectory of the base directory this request writes into
    pub fn media_dir(&self) -> &'static str {
        match self {
            Self::Video { .. } => "videos",
            Self::AudioTranscode { .. } | Self::AudioKeepOriginal => "audio",
        }
    }

    pub fn format_selector(&self) -> String {
        match self {
            Self::Video { ceiling } => FormatSelector::video(*ceiling),
            Self::AudioTranscode { .. } | Self::AudioKeepOriginal => FormatSelector::audio(),
        }
    }

    pub fn postprocessors(&self) -> Vec<PostProcessor> {
        match self {
            Self::AudioTranscode { bitrate } => vec![
                PostProcessor::Transcode {
                    codec: "mp3".to_string(),
                    quality: bitrate.to_string(),
                },
                PostProcessor::Metadata,
            ],
            Self::AudioKeepOriginal | Self::Video { .. } => vec![PostProcessor::Metadata],
        }
    }

    /// Container for merged video+audio streams
    pub fn merge_output_format(&self) -> Option<String> {
        match self {
            Self::Video { .. } => Some("mp4".to_string()),
            Self::AudioTranscode { .. } | Self::AudioKeepOriginal => None,
        }
    }
}

impl fmt::Display for MediaRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AudioTranscode { bitrate } => write!(f, "audio (mp3 {} kbps)", bitrate),
            Self::AudioKeepOriginal => write!(f, "audio (original)"),
            Self::Video { ceiling } => write!(f, "video (up to {})", ceiling),
        }
    }
}

/// Post-download step run by the fetcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key")]
pub enum PostProcessor {
    /// Extract and re-encode the audio track
    #[serde(rename = "FFmpegExtractAudio")]
    Transcode { codec: String, quality: String },
    /// Embed title/artist/etc. into the container
    #[serde(rename = "FFmpegMetadata")]
    Metadata,
}

impl PostProcessor {
    /// Fetcher-side identifier of the step
    pub fn key(&self) -> &'static str {
        match self {
            Self::Transcode { .. } => "FFmpegExtractAudio",
            Self::Metadata => "FFmpegMetadata",
        }
    }

    pub fn is_transcode(&self) -> bool {
        matches!(self, Self::Transcode { .. })
    }
}

/// Everything the fetcher needs besides the URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPlan {
    /// Path template with fetcher placeholders (`%(title)s`, `%(ext)s`, ...)
    pub template: String,
    pub is_collection: bool,
    /// Directory that must exist before the fetch starts
    pub destination: PathBuf,
    pub format: String,
    pub postprocessors: Vec<PostProcessor>,
    pub merge_output_format: Option<String>,
}

/// Declarative options handed to a [`MediaFetcher`](super::traits::MediaFetcher)
#[derive(Clone)]
pub struct FetchOptions {
    pub format: String,
    pub output_template: String,
    /// Download every member of a collection instead of only the addressed item
    pub collection_mode: bool,
    pub postprocessors: Vec<PostProcessor>,
    pub merge_output_format: Option<String>,
    pub progress: Option<Arc<dyn ProgressListener>>,
}

impl FetchOptions {
    pub fn from_plan(plan: OutputPlan) -> Self {
        Self {
            format: plan.format,
            output_template: plan.template,
            collection_mode: plan.is_collection,
            postprocessors: plan.postprocessors,
            merge_output_format: plan.merge_output_format,
            progress: None,
        }
    }

    pub fn with_progress(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.progress = Some(listener);
        self
    }

    /// Forward an event to the listener, if any
    pub fn report(&self, event: &ProgressEvent) {
        if let Some(listener) = &self.progress {
            listener.on_event(event);
        }
    }
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("format", &self.format)
            .field("output_template", &self.output_template)
            .field("collection_mode", &self.collection_mode)
            .field("postprocessors", &self.postprocessors)
            .field("merge_output_format", &self.merge_output_format)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Downloading,
    Finished,
}

/// Status update emitted by the fetcher while it works
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    pub percent: Option<f32>,
    /// Remaining time as reported by the fetcher (e.g. "01:23")
    pub eta: Option<String>,
    pub title: Option<String>,
    pub filename: Option<PathBuf>,
}

impl ProgressEvent {
    pub fn downloading(percent: f32) -> Self {
        Self {
            status: ProgressStatus::Downloading,
            percent: Some(percent),
            eta: None,
            title: None,
            filename: None,
        }
    }

    pub fn finished(filename: impl Into<PathBuf>) -> Self {
        Self {
            status: ProgressStatus::Finished,
            percent: Some(100.0),
            eta: None,
            title: None,
            filename: Some(filename.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcode_request_plans_mp3_then_metadata() {
        let request = MediaRequest::audio("256", false);
        assert_eq!(
            request.postprocessors(),
            vec![
                PostProcessor::Transcode {
                    codec: "mp3".to_string(),
                    quality: "256".to_string()
                },
                PostProcessor::Metadata,
            ]
        );
        assert_eq!(request.format_selector(), "bestaudio/best");
        assert_eq!(request.merge_output_format(), None);
    }

    #[test]
    fn keep_original_ignores_quality() {
        let request = MediaRequest::audio("128", true);
        assert_eq!(request, MediaRequest::AudioKeepOriginal);
        let chain = request.postprocessors();
        assert_eq!(chain, vec![PostProcessor::Metadata]);
        assert!(!chain.iter().any(PostProcessor::is_transcode));
    }

    #[test]
    fn video_request_merges_to_mp4() {
        let request = MediaRequest::video("720p");
        assert!(request.is_video());
        assert_eq!(request.media_dir(), "videos");
        assert_eq!(request.merge_output_format().as_deref(), Some("mp4"));
        assert_eq!(request.to_string(), "video (up to 720p)");
    }

    #[test]
    fn postprocessor_serializes_with_fetcher_keys() {
        let json = serde_json::to_value(PostProcessor::Transcode {
            codec: "mp3".to_string(),
            quality: "320".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"key": "FFmpegExtractAudio", "codec": "mp3", "quality": "320"})
        );

        let json = serde_json::to_value(PostProcessor::Metadata).unwrap();
        assert_eq!(json, serde_json::json!({"key": "FFmpegMetadata"}));
        assert_eq!(json["key"], PostProcessor::Metadata.key());
    }

    #[test]
    fn probe_result_helpers() {
        let single = ProbeResult::single("Song A");
        assert!(!single.is_collection());
        assert_eq!(single.collection_title(), None);

        let mix = ProbeResult::collection("Mix1");
        assert!(mix.is_collection());
        assert_eq!(mix.collection_title(), Some("Mix1"));
    }

    #[test]
    fn fetch_options_debug_hides_listener() {
        let plan = OutputPlan {
            template: "t".to_string(),
            is_collection: false,
            destination: PathBuf::from("downloads/audio"),
            format: "bestaudio/best".to_string(),
            postprocessors: vec![PostProcessor::Metadata],
            merge_output_format: None,
        };
        let options = FetchOptions::from_plan(plan);
        let debug = format!("{options:?}");
        assert!(debug.contains("progress: false"));
    }
}
