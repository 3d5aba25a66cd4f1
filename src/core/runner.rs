use crate::domain::model::CommandResult;
use crate::domain::ports::CommandRunner;
use crate::utils::error::{Result, UpgradeError};
use async_trait::async_trait;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// How long to keep collecting output once the child is gone. Installers
/// spawned by the package manager can inherit the pipes and hold them open.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Frames of the in-place progress spinner.
const SPINNER_FRAMES: [&str; 4] = ["-", "\\", "|", "/"];

/// Bytes read so far from one child stream. Shared with the reader task so
/// whatever arrived is kept even if the task has to be abandoned.
type OutputBuffer = Arc<Mutex<Vec<u8>>>;

pub struct ProcessRunner {
    timeout: Duration,
    timeout_exit_code: i32,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, timeout_exit_code: i32) -> Self {
        Self {
            timeout,
            timeout_exit_code,
        }
    }
}

pub fn describe_command(program: &Path, args: &[String]) -> String {
    let mut parts = vec![program.display().to_string()];
    parts.extend(args.iter().cloned());
    parts.join(" ")
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &Path, args: &[String]) -> Result<CommandResult> {
        let description = describe_command(program, args);
        tracing::info!("Running: {}", description);

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let mut child = command.spawn().map_err(|source| UpgradeError::Spawn {
            command: description.clone(),
            source,
        })?;

        let stdout_buffer = OutputBuffer::default();
        let stderr_buffer = OutputBuffer::default();
        let stdout_task = tokio::spawn(read_stream(child.stdout.take(), stdout_buffer.clone()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take(), stderr_buffer.clone()));

        let (exit_code, timed_out) = match timeout(self.timeout, child.wait()).await {
            Ok(status) => (exit_code_of(status?), false),
            Err(_) => {
                tracing::warn!(
                    "Timed out after {}s, terminating: {}",
                    self.timeout.as_secs(),
                    description
                );
                if let Err(e) = child.kill().await {
                    tracing::debug!("Kill after timeout failed: {}", e);
                }
                (self.timeout_exit_code, true)
            }
        };

        let (stdout, stderr) = tokio::join!(
            drain(stdout_task, stdout_buffer),
            drain(stderr_task, stderr_buffer)
        );

        for line in output_lines(&stdout) {
            tracing::info!("{}", line);
        }
        for line in output_lines(&stderr) {
            tracing::warn!("{}", line);
        }
        tracing::debug!("Exit code {} from: {}", exit_code, description);

        Ok(CommandResult {
            exit_code,
            stdout,
            stderr,
            timed_out,
        })
    }
}

async fn read_stream<R>(stream: Option<R>, buffer: OutputBuffer) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];
    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        lock_buffer(&buffer).extend_from_slice(&chunk[..read]);
    }
}

/// Waits up to the grace period for the stream to close, then returns
/// everything read from it, whether or not it closed.
async fn drain(mut task: JoinHandle<std::io::Result<()>>, buffer: OutputBuffer) -> String {
    match timeout(OUTPUT_DRAIN_GRACE, &mut task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::debug!("Reading child output failed: {}", e),
        Ok(Err(e)) => tracing::debug!("Output reader task failed: {}", e),
        Err(_) => {
            task.abort();
            tracing::debug!(
                "Output pipe still open {}s after exit, keeping what was read",
                OUTPUT_DRAIN_GRACE.as_secs()
            );
        }
    }
    let bytes = std::mem::take(&mut *lock_buffer(&buffer));
    String::from_utf8_lossy(&bytes).into_owned()
}

fn lock_buffer(buffer: &OutputBuffer) -> std::sync::MutexGuard<'_, Vec<u8>> {
    match buffer.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Non-blank lines, splitting on carriage returns as well so progress
/// spinners redrawn in place do not glue onto real output. Lone spinner
/// frames are dropped.
pub fn output_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty() && !SPINNER_FRAMES.contains(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_command() {
        let args = vec!["upgrade".to_string(), "--all".to_string()];
        assert_eq!(
            describe_command(Path::new("winget"), &args),
            "winget upgrade --all"
        );
    }

    #[test]
    fn test_output_lines_skips_spinner_and_blank_lines() {
        let text = "\r   - \r   \\ \rFound 2 upgrades\r\n\r\nDone\n";
        let lines: Vec<&str> = output_lines(text).collect();
        assert_eq!(lines, vec!["Found 2 upgrades", "Done"]);
    }

    #[test]
    fn test_output_lines_keeps_single_character_output() {
        let text = "Continue?\nY\n|\n0\n/\n";
        let lines: Vec<&str> = output_lines(text).collect();
        assert_eq!(lines, vec!["Continue?", "Y", "0"]);
    }
}
