//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::downloader::config::{DownloaderConfig, DEFAULT_BASE_DIR};
use crate::downloader::format_selector::DEFAULT_AUDIO_BITRATE;
use crate::downloader::MediaRequest;

#[derive(Debug, Parser)]
#[command(name = "media-downloader")]
#[command(about = "Download audio or video (single items or playlists) through yt-dlp")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Debug, clap::Args)]
pub struct GlobalArgs {
    /// Root directory for downloads (media goes to <DIR>/audio or <DIR>/videos)
    #[arg(long, global = true, env = "MEDIA_DOWNLOADER_DIR", default_value = DEFAULT_BASE_DIR)]
    pub output_dir: PathBuf,

    /// Path to the yt-dlp binary (auto-detected by default)
    #[arg(long = "ytdlp", global = true, env = "YTDLP_PATH")]
    pub ytdlp: Option<PathBuf>,

    /// Proxy URL passed to yt-dlp, e.g. socks5://127.0.0.1:1080
    #[arg(long, global = true, env = "MEDIA_DOWNLOADER_PROXY")]
    pub proxy: Option<String>,

    /// Socket timeout in seconds passed to yt-dlp
    #[arg(long, global = true)]
    pub socket_timeout: Option<u32>,

    /// Give up on the metadata lookup after this many seconds (no limit by default)
    #[arg(long, global = true)]
    pub probe_timeout: Option<u64>,
}

impl From<&GlobalArgs> for DownloaderConfig {
    fn from(args: &GlobalArgs) -> Self {
        DownloaderConfig::default()
            .with_base_dir(args.output_dir.clone())
            .with_ytdlp_path(args.ytdlp.clone())
            .with_proxy(args.proxy.clone())
            .with_socket_timeout(args.socket_timeout)
            .with_probe_timeout(args.probe_timeout)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download best audio from a track, video or playlist
    Audio(AudioArgs),

    /// Download video up to a maximum resolution
    Video(VideoArgs),

    /// Show detected yt-dlp and ffmpeg installations
    Tools(ToolsArgs),
}

#[derive(Debug, clap::Args)]
pub struct AudioArgs {
    /// Track, video or playlist URL (prompted for when omitted)
    #[arg(long)]
    pub url: Option<String>,

    /// MP3 bitrate in kbps, e.g. 320, 256, 192 (ignored with --keep-original)
    #[arg(long, default_value_t = DEFAULT_AUDIO_BITRATE.to_string())]
    pub quality: String,

    /// Skip re-encoding; save exactly what the source delivers
    #[arg(long)]
    pub keep_original: bool,
}

#[derive(Debug, clap::Args)]
pub struct VideoArgs {
    /// Video or playlist URL (prompted for when omitted)
    #[arg(long)]
    pub url: Option<String>,

    /// Maximum resolution, e.g. 1080p, 720p (prompted for when omitted)
    #[arg(long)]
    pub quality: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct ToolsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Print `message`, read one line, return it trimmed.
pub fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str) -> io::Result<String> {
    write!(output, "{}", message)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

impl AudioArgs {
    /// Fill in anything missing interactively and build the request.
    pub fn resolve<R: BufRead, W: Write>(
        self,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<(String, MediaRequest)> {
        let url = match self.url {
            Some(url) => url.trim().to_string(),
            None => prompt(input, output, "🎧 Enter URL (track, video or playlist): ")?,
        };

        Ok((url, MediaRequest::audio(&self.quality, self.keep_original)))
    }
}

impl VideoArgs {
    /// Fill in anything missing interactively and build the request.
    pub fn resolve<R: BufRead, W: Write>(
        self,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<(String, MediaRequest)> {
        let url = match self.url {
            Some(url) => url.trim().to_string(),
            None => prompt(input, output, "🎥 Enter video or playlist URL: ")?,
        };

        let quality = match self.quality {
            Some(quality) => quality,
            None => prompt(input, output, "🎯 Max quality (e.g. 1080p, 720p): ")?,
        };

        Ok((url, MediaRequest::video(&quality)))
    }
}
