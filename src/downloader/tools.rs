use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::utils::{locate_binary, tool_version};

/// Environment variable that overrides yt-dlp discovery.
pub const YTDLP_PATH_ENV: &str = "YTDLP_PATH";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version", // ffmpeg uses a single dash
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub is_available: bool,
}

#[derive(Debug, Default)]
pub struct ToolManager {
    ytdlp_override: Option<PathBuf>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this yt-dlp binary instead of searching for one
    pub fn with_ytdlp_override(mut self, path: Option<PathBuf>) -> Self {
        self.ytdlp_override = path;
        self
    }

    pub fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.detect_tool(tool_type);
        let version = path
            .as_deref()
            .and_then(|p| tool_version(p, tool_type.version_arg()));

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            // a binary that cannot report its version does not run
            is_available: version.is_some(),
            version,
            path,
        }
    }

    pub fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp),
            self.get_tool_info(ToolType::Ffmpeg),
        ]
    }

    /// Path to invoke yt-dlp with; falls back to the bare name so PATH lookup
    /// happens at spawn time and a missing tool surfaces as a spawn error.
    pub fn ytdlp_command(&self) -> PathBuf {
        self.detect_tool(ToolType::YtDlp)
            .unwrap_or_else(|| PathBuf::from(ToolType::YtDlp.as_str()))
    }

    fn detect_tool(&self, tool_type: ToolType) -> Option<PathBuf> {
        if tool_type == ToolType::YtDlp {
            if let Some(path) = &self.ytdlp_override {
                return Some(path.clone());
            }
            if let Some(path) = std::env::var_os(YTDLP_PATH_ENV).filter(|p| !p.is_empty()) {
                return Some(PathBuf::from(path));
            }
        }

        locate_binary(tool_type.as_str())
    }
}

/// Render tool status as aligned text lines
pub fn format_tool_report(tools: &[ToolInfo]) -> String {
    tools
        .iter()
        .map(|tool| {
            let status = if tool.is_available { "ok" } else { "missing" };
            let version = tool.version.as_deref().unwrap_or("-");
            let path = tool
                .path
                .as_deref()
                .map(Path::display)
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            format!("{:<8} {:<8} {:<24} {}", tool.name, status, version, path)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
