// Progress reporter - renders fetcher events as console text

use std::io::{self, Write};
use std::sync::Mutex;

use super::models::{MediaRequest, ProgressEvent, ProgressStatus};
use super::traits::ProgressListener;

/// Which line format to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStyle {
    /// `⬇️  45.0% of <title>...`
    Audio,
    /// `⬇️  45.0% ETA 00:12`
    Video,
}

impl From<&MediaRequest> for RenderStyle {
    fn from(request: &MediaRequest) -> Self {
        if request.is_video() {
            Self::Video
        } else {
            Self::Audio
        }
    }
}

/// Render one event. Missing fields are left out; returns None when there is
/// nothing worth printing.
///
/// Downloading lines start with `\r` and have no newline so they overwrite
/// each other; finished lines start on a fresh line and end with one.
pub fn render(event: &ProgressEvent, style: RenderStyle) -> Option<String> {
    match event.status {
        ProgressStatus::Downloading => {
            let percent = event.percent.map(|p| format!("{:>5.1}%", p));
            let detail = match style {
                RenderStyle::Audio => event.title.as_ref().map(|t| format!(" of {}...", t)),
                RenderStyle::Video => event.eta.as_ref().map(|eta| format!(" ETA {}", eta)),
            };

            if percent.is_none() && detail.is_none() {
                return None;
            }

            Some(format!(
                "\r⬇️  {}{}",
                percent.unwrap_or_default(),
                detail.unwrap_or_default()
            ))
        }
        ProgressStatus::Finished => {
            let label = match style {
                RenderStyle::Audio => "Audio downloaded",
                RenderStyle::Video => "Downloaded",
            };
            Some(match &event.filename {
                Some(path) => format!("\n✅ {}: {}\n", label, path.display()),
                None => format!("\n✅ {}\n", label),
            })
        }
    }
}

/// Listener that writes rendered events to a console stream
pub struct ConsoleProgress {
    style: RenderStyle,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleProgress {
    pub fn new(style: RenderStyle, out: Box<dyn Write + Send>) -> Self {
        Self {
            style,
            out: Mutex::new(out),
        }
    }

    pub fn stdout(style: RenderStyle) -> Self {
        Self::new(style, Box::new(io::stdout()))
    }
}

impl ProgressListener for ConsoleProgress {
    fn on_event(&self, event: &ProgressEvent) {
        let Some(line) = render(event, self.style) else {
            return;
        };

        // A poisoned lock only means another print panicked; the stream is still usable.
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = out.write_all(line.as_bytes());
        let _ = out.flush();
    }
}
