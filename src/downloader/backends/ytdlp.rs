// yt-dlp backend - drives the native `yt-dlp` binary
//
// Probe: `yt-dlp -J --flat-playlist` (metadata only, collection members unresolved)
// Download: streams stdout line by line and turns progress lines into events

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;

use crate::downloader::config::DownloaderConfig;
use crate::downloader::errors::{FetchError, ProbeError};
use crate::downloader::models::{FetchOptions, PostProcessor, ProgressEvent, ProgressStatus};
use crate::downloader::tools::ToolManager;
use crate::downloader::traits::MediaFetcher;
use crate::downloader::utils::{run_output_with_timeout, RunError};

/// Marks lines produced by our progress template.
const PROGRESS_PREFIX: &str = "[progress]";

/// ASCII unit separator; titles and paths may contain any printable character.
const FIELD_SEP: char = '\u{1f}';

/// Values yt-dlp prints for fields it does not know
const MISSING_VALUES: [&str; 3] = ["NA", "Unknown", "N/A"];

fn progress_template() -> String {
    [
        "%(progress.status)s",
        "%(progress._percent_str)s",
        "%(progress._eta_str)s",
        "%(info.title)s",
        "%(progress.filename)s",
    ]
    .join(&FIELD_SEP.to_string())
}

/// Fetcher backed by the yt-dlp command-line program
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    ytdlp_path: PathBuf,
    config: DownloaderConfig,
}

impl YtDlpFetcher {
    pub fn new(config: &DownloaderConfig) -> Self {
        let ytdlp_path = ToolManager::new()
            .with_ytdlp_override(config.ytdlp_path.clone())
            .ytdlp_command();

        Self {
            ytdlp_path,
            config: config.clone(),
        }
    }

    pub fn ytdlp_path(&self) -> &Path {
        &self.ytdlp_path
    }

    /// Build probe arguments
    pub fn probe_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "-J".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
        ];
        args.extend(self.config.network_args());
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    /// Build download arguments from the declarative options
    pub fn download_args(&self, url: &str, options: &FetchOptions) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            options.format.clone(),
            "-o".to_string(),
            options.output_template.clone(),
            if options.collection_mode {
                "--yes-playlist".to_string()
            } else {
                "--no-playlist".to_string()
            },
            "--newline".to_string(),
            "--progress-template".to_string(),
            format!("download:{}{}", PROGRESS_PREFIX, progress_template()),
        ];

        if let Some(container) = &options.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(container.clone());
        }

        for step in &options.postprocessors {
            match step {
                PostProcessor::Transcode { codec, quality } => {
                    args.extend([
                        "-x".to_string(),
                        "--audio-format".to_string(),
                        codec.clone(),
                        "--audio-quality".to_string(),
                        format!("{}K", quality),
                    ]);
                }
                PostProcessor::Metadata => args.push("--embed-metadata".to_string()),
            }
        }

        args.extend(self.config.network_args());
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<serde_json::Value, ProbeError> {
        let args = self.probe_args(url);
        tracing::debug!("Running: {} {}", self.ytdlp_path.display(), args.join(" "));

        let output = run_output_with_timeout(&self.ytdlp_path, &args, self.config.probe_timeout_secs)
            .await
            .map_err(|e| match e {
                RunError::TimedOut(secs) => ProbeError::Timeout(secs),
                e if e.is_not_found() => ProbeError::ToolNotFound(e.to_string()),
                e => ProbeError::Execution(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(status = %output.status, "probe failed: {}", stderr.trim());
            if stderr.trim().is_empty() {
                return Err(ProbeError::Execution(format!(
                    "yt-dlp exited with {}",
                    output.status
                )));
            }
            return Err(ProbeError::from_stderr(&stderr));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ProbeError::Parse(format!("Invalid JSON: {}", e)))
    }

    async fn download(&self, url: &str, options: FetchOptions) -> Result<(), FetchError> {
        let args = self.download_args(url, &options);
        tracing::debug!("Running: {} {}", self.ytdlp_path.display(), args.join(" "));

        let mut child = TokioCommand::new(&self.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                let msg = format!("Failed to start {}: {}", self.ytdlp_path.display(), e);
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::ToolNotFound(msg)
                } else {
                    FetchError::Execution(msg)
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::Execution("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::Execution("Failed to capture stderr".to_string()))?;

        // Drain stderr concurrently so a chatty child never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "yt-dlp", "{}", line);
                collected.push(line);
            }
            collected.join("\n")
        });

        // Titles are not guaranteed to be valid UTF-8, so split on raw bytes
        let mut segments = BufReader::new(stdout).split(b'\n');
        loop {
            match segments.next_segment().await {
                Ok(Some(bytes)) => {
                    let line = String::from_utf8_lossy(&bytes);
                    match parse_progress_line(&line) {
                        Some(event) => options.report(&event),
                        None => tracing::debug!(target: "yt-dlp", "{}", line),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to read yt-dlp output: {}", e);
                    break;
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| FetchError::Execution(format!("Process error: {}", e)))?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if status.success() {
            return Ok(());
        }

        if stderr_output.trim().is_empty() {
            return Err(FetchError::Execution(format!("yt-dlp exited with {}", status)));
        }
        Err(FetchError::from_stderr(&stderr_output))
    }
}

lazy_static::lazy_static! {
    // [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)
    static ref CLASSIC_PROGRESS_RE: Regex = Regex::new(
        r"^\[download\]\s+(\d+(?:\.\d+)?)%\s+of\s+~?\s*\S+(?:\s+at\s+\S+)?(?:\s+ETA\s+(\S+))?"
    ).expect("valid progress regex");
    // [download] downloads/audio/all/Song.mp3 has already been downloaded
    static ref ALREADY_RE: Regex = Regex::new(
        r"^\[download\]\s+(.+?)\s+has already been downloaded"
    ).expect("valid already-downloaded regex");
}

/// Parse one line of yt-dlp stdout into a progress event.
///
/// Understands our `--progress-template` lines first, then the classic
/// `[download]` lines yt-dlp prints when no template applies.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        return parse_template_fields(rest);
    }

    if let Some(caps) = CLASSIC_PROGRESS_RE.captures(line) {
        let percent = caps.get(1).and_then(|m| m.as_str().parse().ok());
        return Some(ProgressEvent {
            status: ProgressStatus::Downloading,
            percent,
            eta: caps.get(2).and_then(|m| present(m.as_str())),
            title: None,
            filename: None,
        });
    }

    if let Some(caps) = ALREADY_RE.captures(line) {
        return Some(ProgressEvent::finished(caps.get(1)?.as_str()));
    }

    None
}

fn parse_template_fields(rest: &str) -> Option<ProgressEvent> {
    let mut fields = rest.splitn(5, FIELD_SEP);

    let status = match fields.next()?.trim() {
        "downloading" => ProgressStatus::Downloading,
        "finished" => ProgressStatus::Finished,
        _ => return None,
    };
    let percent = fields
        .next()
        .and_then(present)
        .and_then(|p| p.trim_end_matches('%').trim().parse().ok());
    let eta = fields.next().and_then(present);
    let title = fields.next().and_then(present);
    let filename = fields.next().and_then(present).map(PathBuf::from);

    Some(ProgressEvent {
        status,
        percent,
        eta,
        title,
        filename,
    })
}

fn present(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && !MISSING_VALUES.contains(&value)).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::{MediaRequest, ProbeResult};
    use crate::downloader::planner::plan;

    fn fetcher() -> YtDlpFetcher {
        let config = DownloaderConfig::default().with_ytdlp_path(Some(PathBuf::from("/usr/bin/yt-dlp")));
        YtDlpFetcher::new(&config)
    }

    fn template_line(fields: [&str; 5]) -> String {
        format!("{}{}", PROGRESS_PREFIX, fields.join(&FIELD_SEP.to_string()))
    }

    #[test]
    fn probe_args_are_flat_and_metadata_only() {
        let args = fetcher().probe_args("https://example.com/list");
        assert_eq!(
            args,
            vec!["-J", "--flat-playlist", "--no-warnings", "--", "https://example.com/list"]
        );
    }

    #[test]
    fn transcode_download_args() {
        let plan = plan(
            &ProbeResult::single("Song A"),
            &MediaRequest::audio("256", false),
            Path::new("downloads"),
        );
        let args = fetcher().download_args("https://example.com/a", &FetchOptions::from_plan(plan));

        let joined = args.join(" ");
        assert!(joined.starts_with("-f bestaudio/best -o "));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(joined.contains("-x --audio-format mp3 --audio-quality 256K --embed-metadata"));
        assert!(!args.contains(&"--merge-output-format".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/a"));
    }

    #[test]
    fn keep_original_download_args_skip_extraction() {
        let plan = plan(
            &ProbeResult::collection("Set"),
            &MediaRequest::AudioKeepOriginal,
            Path::new("downloads"),
        );
        let args = fetcher().download_args("u", &FetchOptions::from_plan(plan));

        assert!(args.contains(&"--yes-playlist".to_string()));
        assert!(!args.contains(&"-x".to_string()));
        assert_eq!(args.iter().filter(|a| *a == "--embed-metadata").count(), 1);
    }

    #[test]
    fn video_download_args_merge_to_mp4() {
        let plan = plan(
            &ProbeResult::single("Clip"),
            &MediaRequest::video("720p"),
            Path::new("downloads"),
        );
        let args = fetcher().download_args("u", &FetchOptions::from_plan(plan));
        let joined = args.join(" ");

        assert!(joined.contains("-f bestvideo[height<=720]+bestaudio/best"));
        assert!(joined.contains("--merge-output-format mp4"));
    }

    #[test]
    fn network_args_are_forwarded() {
        let config = DownloaderConfig::default()
            .with_ytdlp_path(Some(PathBuf::from("yt-dlp")))
            .with_proxy(Some("socks5://127.0.0.1:1080".to_string()));
        let args = YtDlpFetcher::new(&config).probe_args("u");
        assert!(args.join(" ").contains("--proxy socks5://127.0.0.1:1080 -- u"));
    }

    #[test]
    fn parses_template_downloading_line() {
        let line = template_line(["downloading", " 45.3%", "00:12", "Song A", "downloads/audio/all/Song A.webm"]);
        let event = parse_progress_line(&line).unwrap();

        assert_eq!(event.status, ProgressStatus::Downloading);
        assert_eq!(event.percent, Some(45.3));
        assert_eq!(event.eta.as_deref(), Some("00:12"));
        assert_eq!(event.title.as_deref(), Some("Song A"));
        assert_eq!(event.filename, Some(PathBuf::from("downloads/audio/all/Song A.webm")));
    }

    #[test]
    fn parses_template_finished_line_with_missing_fields() {
        let line = template_line(["finished", "100.0%", "NA", "NA", "out.webm"]);
        let event = parse_progress_line(&line).unwrap();

        assert_eq!(event.status, ProgressStatus::Finished);
        assert_eq!(event.eta, None);
        assert_eq!(event.title, None);
        assert_eq!(event.filename, Some(PathBuf::from("out.webm")));
    }

    #[test]
    fn title_with_pipes_survives() {
        let line = template_line(["downloading", "1.0%", "Unknown", "A | B | C", "a.webm"]);
        let event = parse_progress_line(&line).unwrap();
        assert_eq!(event.title.as_deref(), Some("A | B | C"));
    }

    #[test]
    fn unknown_template_status_is_ignored() {
        let line = template_line(["error", "NA", "NA", "NA", "NA"]);
        assert_eq!(parse_progress_line(&line), None);
    }

    #[test]
    fn parses_classic_progress_line() {
        let event = parse_progress_line(
            "[download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)",
        )
        .unwrap();
        assert_eq!(event.status, ProgressStatus::Downloading);
        assert_eq!(event.percent, Some(12.5));
        assert_eq!(event.eta.as_deref(), Some("11:59"));
    }

    #[test]
    fn parses_already_downloaded_line() {
        let event = parse_progress_line(
            "[download] downloads/audio/all/Song A.mp3 has already been downloaded",
        )
        .unwrap();
        assert_eq!(event.status, ProgressStatus::Finished);
        assert_eq!(event.filename, Some(PathBuf::from("downloads/audio/all/Song A.mp3")));
    }

    #[test]
    fn other_lines_are_not_progress() {
        assert_eq!(parse_progress_line("[youtube] abc: Downloading webpage"), None);
        assert_eq!(parse_progress_line("[ExtractAudio] Destination: a.mp3"), None);
    }

    #[tokio::test]
    async fn missing_binary_is_tool_not_found() {
        let config = DownloaderConfig::default()
            .with_ytdlp_path(Some(PathBuf::from("/nonexistent/bin/yt-dlp")));
        let fetcher = YtDlpFetcher::new(&config);

        let probe = fetcher.probe("https://example.com").await;
        assert!(matches!(probe, Err(ProbeError::ToolNotFound(_))));

        let plan = plan(
            &ProbeResult::single("x"),
            &MediaRequest::AudioKeepOriginal,
            Path::new("downloads"),
        );
        let fetch = fetcher
            .download("https://example.com", FetchOptions::from_plan(plan))
            .await;
        assert!(matches!(fetch, Err(FetchError::ToolNotFound(_))));
    }

    /// Write an executable shell script standing in for yt-dlp
    #[cfg(unix)]
    fn fake_ytdlp(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn download_streams_events_and_classifies_failure() {
        use std::sync::{Arc, Mutex};

        let dir = tempfile::tempdir().unwrap();
        let script = fake_ytdlp(
            dir.path(),
            r#"printf '[progress]downloading\037 45.3%%\03700:12\037Song A\037out.webm\n'
printf '[youtube] abc: Downloading webpage\n'
printf '[progress]finished\037NA\037NA\037Song A\037out.webm\n'
echo 'ERROR: [youtube] x: Requested format is not available' >&2
exit 1"#,
        );
        let fetcher = YtDlpFetcher::new(&DownloaderConfig::default().with_ytdlp_path(Some(script)));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let plan = plan(
            &ProbeResult::single("Song A"),
            &MediaRequest::AudioKeepOriginal,
            dir.path(),
        );
        let options = FetchOptions::from_plan(plan).with_progress(Arc::new(
            move |event: &ProgressEvent| sink.lock().unwrap().push(event.clone()),
        ));

        let result = fetcher.download("https://example.com/x", options).await;

        assert!(matches!(result, Err(FetchError::UnsupportedFormat(_))), "{result:?}");
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, ProgressStatus::Downloading);
        assert_eq!(events[0].percent, Some(45.3));
        assert_eq!(events[0].eta.as_deref(), Some("00:12"));
        assert_eq!(events[0].title.as_deref(), Some("Song A"));
        assert_eq!(events[1].status, ProgressStatus::Finished);
        assert_eq!(events[1].filename, Some(PathBuf::from("out.webm")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_download_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_ytdlp(dir.path(), "echo 'noise on stderr' >&2\nexit 0");
        let fetcher = YtDlpFetcher::new(&DownloaderConfig::default().with_ytdlp_path(Some(script)));
        let plan = plan(
            &ProbeResult::single("x"),
            &MediaRequest::video("720p"),
            dir.path(),
        );

        let result = fetcher.download("u", FetchOptions::from_plan(plan)).await;
        assert_eq!(result, Ok(()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_metadata_lookup_is_not_cut_off_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_ytdlp(
            dir.path(),
            r#"sleep 2
printf '{"_type":"playlist","title":"Huge"}'"#,
        );
        let fetcher = YtDlpFetcher::new(&DownloaderConfig::default().with_ytdlp_path(Some(script)));

        let metadata = fetcher.probe("https://example.com/list").await.unwrap();
        assert_eq!(metadata["title"], "Huge");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn configured_metadata_timeout_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_ytdlp(dir.path(), "sleep 5\nprintf '{}'");
        let config = DownloaderConfig::default()
            .with_ytdlp_path(Some(script))
            .with_probe_timeout(Some(1));

        let result = YtDlpFetcher::new(&config).probe("u").await;
        assert_eq!(result, Err(ProbeError::Timeout(1)));
    }

    #[tokio::test]
    #[ignore = "network I/O and yt-dlp required"]
    async fn probes_real_playlist() {
        let fetcher = YtDlpFetcher::new(&DownloaderConfig::default());
        let metadata = fetcher
            .probe("https://www.youtube.com/playlist?list=PLFgquLnL59alCl_2TQvOiD5Vgm1hCaGSI")
            .await
            .unwrap();
        assert_eq!(metadata["_type"], "playlist");
    }
}
