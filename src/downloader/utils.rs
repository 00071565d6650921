// Helper functions for running external tools

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while running {program}: {reason}")]
    Io { program: String, reason: String },

    #[error("Timed out after {0}s")]
    TimedOut(u64),
}

impl RunError {
    /// True when the program itself could not be found
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Run command, collecting stdout and stderr; unbounded when `timeout_secs` is None
pub async fn run_output_with_timeout(
    program: &Path,
    args: &[String],
    timeout_secs: Option<u64>,
) -> Result<std::process::Output, RunError> {
    let name = program.display().to_string();

    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RunError::Spawn {
            program: name.clone(),
            source,
        })?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| RunError::Io {
        program: name.clone(),
        reason: "stdout not captured".to_string(),
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| RunError::Io {
        program: name.clone(),
        reason: "stderr not captured".to_string(),
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    let io_err = |reason: String| RunError::Io {
        program: name.clone(),
        reason,
    };

    let waited = match timeout_secs {
        Some(secs) => timeout(Duration::from_secs(secs), child.wait())
            .await
            .map_err(|_| secs),
        None => Ok(child.wait().await),
    };
    match waited {
        Ok(status) => {
            let status = status.map_err(|e| io_err(format!("wait failed: {}", e)))?;
            let stdout = stdout_task
                .await
                .map_err(|e| io_err(format!("stdout task failed: {}", e)))?
                .map_err(|e| io_err(format!("reading stdout: {}", e)))?;
            let stderr = stderr_task
                .await
                .map_err(|e| io_err(format!("stderr task failed: {}", e)))?
                .map_err(|e| io_err(format!("reading stderr: {}", e)))?;
            Ok(std::process::Output {
                status,
                stdout,
                stderr,
            })
        }
        Err(secs) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(RunError::TimedOut(secs))
        }
    }
}

/// Locate an executable: well-known install paths, `~/.local/bin`, then `which`.
pub fn locate_binary(binary_name: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = [
        "/opt/homebrew/bin", // Homebrew on Apple Silicon
        "/usr/local/bin",    // Homebrew on Intel Mac, manual installs
        "/usr/bin",          // System installation
    ]
    .iter()
    .map(|dir| Path::new(dir).join(binary_name))
    .collect();

    if let Some(home) = dirs::home_dir() {
        // pipx / pip --user
        candidates.push(home.join(".local/bin").join(binary_name));
    }

    if let Some(found) = candidates.into_iter().find(|path| path.is_file()) {
        return Some(found);
    }

    let output = StdCommand::new("which").arg(binary_name).output().ok()?;
    if !output.status.success() {
        return None;
    }

    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// First line of `<binary> <arg>` output, if the binary runs successfully
pub fn tool_version(path: &Path, arg: &str) -> Option<String> {
    match StdCommand::new(path).arg(arg).output() {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty()),
        _ => None,
    }
}
