// FormatSelector - maps user quality preferences to yt-dlp format expressions
//
// Handles:
// - Video resolution ceilings from the 144p..2160p vocabulary
// - Audio bitrate targets for MP3 transcoding
// - Permissive normalization: unknown input falls back to a default, never errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution labels accepted as a video ceiling, lowest first.
pub const RESOLUTION_ORDER: [&str; 8] = [
    "144p", "240p", "360p", "480p", "720p", "1080p", "1440p", "2160p",
];

/// Ceiling used when the label is not in the vocabulary.
pub const DEFAULT_VIDEO_HEIGHT: u32 = 1080;

/// MP3 bitrate used when the preference is not a usable number.
pub const DEFAULT_AUDIO_BITRATE: u32 = 320;

/// Accepted MP3 bitrate range in kbps.
const AUDIO_BITRATE_RANGE: std::ops::RangeInclusive<u32> = 8..=512;

/// Maximum video height requested from the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightCeiling(u32);

impl HeightCeiling {
    /// Parse a label such as `720p`; anything outside the vocabulary yields 1080.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();

        RESOLUTION_ORDER
            .iter()
            .find(|known| **known == label)
            .and_then(|known| known.trim_end_matches('p').parse().ok())
            .map(Self)
            .unwrap_or_default()
    }

    pub fn height(self) -> u32 {
        self.0
    }
}

impl Default for HeightCeiling {
    fn default() -> Self {
        Self(DEFAULT_VIDEO_HEIGHT)
    }
}

impl fmt::Display for HeightCeiling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.0)
    }
}

/// MP3 transcoding target in kbps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioBitrate(u32);

impl AudioBitrate {
    /// Parse `"256"` or `"256k"`; unusable values yield 320.
    pub fn from_preference(preference: &str) -> Self {
        let trimmed = preference.trim();
        let digits = trimmed
            .strip_suffix('k')
            .or_else(|| trimmed.strip_suffix('K'))
            .unwrap_or(trimmed);

        digits
            .parse::<u32>()
            .ok()
            .filter(|kbps| AUDIO_BITRATE_RANGE.contains(kbps))
            .map(Self)
            .unwrap_or_default()
    }

    pub fn kbps(self) -> u32 {
        self.0
    }
}

impl Default for AudioBitrate {
    fn default() -> Self {
        Self(DEFAULT_AUDIO_BITRATE)
    }
}

impl fmt::Display for AudioBitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Format selector builder
pub struct FormatSelector;

impl FormatSelector {
    /// Best audio-only stream, or the best muxed stream when none exists.
    pub fn audio() -> String {
        "bestaudio/best".to_string()
    }

    /// Best video not taller than the ceiling plus best audio, else best muxed.
    pub fn video(ceiling: HeightCeiling) -> String {
        format!("bestvideo[height<={}]+bestaudio/best", ceiling.height())
    }
}
