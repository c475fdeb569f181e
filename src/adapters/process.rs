//! Subprocess execution with a hard timeout.
//!
//! stdout and stderr of the child share the write end of a single OS pipe,
//! so the captured bytes arrive in the order the child produced them.

use std::io::{PipeReader, Read};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::{CommandOutput, ProcessRunner};
use crate::error::{FlowError, Result};

/// Runs commands as real child processes
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

/// Expand a leading `~` and canonicalize `dir`.
///
/// Fails with [`FlowError::Config`] when the path does not exist or is not
/// a directory.
pub fn resolve_working_dir(dir: &Path) -> Result<PathBuf> {
    let expanded = expand_home(dir);
    let resolved = std::fs::canonicalize(&expanded).map_err(|e| {
        FlowError::Config(format!(
            "working directory {} cannot be resolved: {}",
            expanded.display(),
            e
        ))
    })?;

    if !resolved.is_dir() {
        return Err(FlowError::Config(format!(
            "working directory {} is not a directory",
            resolved.display()
        )));
    }

    Ok(resolved)
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn drain(mut reader: PipeReader) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Wait for the exit status, then for the end of the output stream.
async fn collect(
    child: &mut Child,
    capture: JoinHandle<std::io::Result<Vec<u8>>>,
) -> std::io::Result<(ExitStatus, Vec<u8>)> {
    let status = child.wait().await?;
    let bytes = capture.await.map_err(std::io::Error::other)??;
    Ok((status, bytes))
}

fn classify(command: &str, status: ExitStatus, bytes: &[u8]) -> CommandOutput {
    let text = String::from_utf8_lossy(bytes).trim().to_string();
    if !text.is_empty() {
        info!(command = %command, "{}", text);
    }

    let result = CommandOutput::completed(status.code(), text);
    if result.success {
        info!(command = %command, "Command succeeded");
    } else {
        error!(
            command = %command,
            exit_code = status.code().unwrap_or(-1),
            "Command failed"
        );
    }
    result
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(
        &self,
        command: &[String],
        working_dir: &Path,
        limit: Duration,
    ) -> Result<CommandOutput> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| FlowError::Config("empty command".to_string()))?;
        let cwd = resolve_working_dir(working_dir)?;

        let cmdline = command.join(" ");
        info!(command = %cmdline, cwd = %cwd.display(), "Running command");

        let io_err = |source| FlowError::Io {
            command: cmdline.clone(),
            source,
        };
        let (reader, writer) = std::io::pipe().map_err(io_err)?;
        let stderr_writer = writer.try_clone().map_err(io_err)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true);
        // Own process group, so a timeout can take down every descendant
        #[cfg(unix)]
        cmd.process_group(0);

        let spawned = cmd.spawn();
        // `cmd` still owns copies of the write end; the reader only sees EOF
        // once every copy is closed.
        drop(cmd);
        let mut child = spawned.map_err(|source| FlowError::Spawn {
            command: cmdline.clone(),
            source,
        })?;
        let pid = child.id();

        let capture = tokio::task::spawn_blocking(move || drain(reader));

        match timeout(limit, collect(&mut child, capture)).await {
            Ok(collected) => {
                let (status, bytes) = collected.map_err(io_err)?;
                Ok(classify(&cmdline, status, &bytes))
            }
            Err(_) => {
                terminate(&mut child, pid, &cmdline).await;
                error!(
                    command = %cmdline,
                    timeout_secs = limit.as_secs_f64(),
                    "Command timed out, child killed"
                );
                Ok(CommandOutput::timed_out())
            }
        }
    }
}

/// SIGKILL the child's whole process group, then reap the child.
///
/// Falls back to killing only the child when the group signal fails.
async fn terminate(child: &mut Child, pid: Option<u32>, cmdline: &str) {
    if let Some(pid) = pid {
        match kill_group(pid) {
            Ok(()) => {
                if let Err(e) = child.wait().await {
                    warn!(command = %cmdline, error = %e, "Failed to reap killed child");
                }
                return;
            }
            Err(e) => {
                warn!(command = %cmdline, pid, error = %e, "Failed to kill process group");
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(command = %cmdline, error = %e, "Failed to kill timed out child");
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) -> std::io::Result<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = i32::try_from(pid).map_err(std::io::Error::other)?;
    killpg(Pid::from_raw(pgid), Signal::SIGKILL).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "process groups are unix-only",
    ))
}
