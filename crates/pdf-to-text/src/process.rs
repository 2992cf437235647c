//! External tool invocation with captured output and a deadline
//!
//! Every run spawns exactly one child process with stdin closed and
//! stdout/stderr piped. When the deadline passes the child is killed and
//! waited on before the call returns; `kill_on_drop` covers callers that drop
//! the future early.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{FailureReason, ProcessFailure};

/// Raw result of a finished tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Command line for one external tool
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().as_os_str().to_owned(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Render the command line for diagnostics
    ///
    /// Arguments containing whitespace are single-quoted.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| {
                let part = part.to_string_lossy();
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("'{}'", part)
                } else {
                    part.into_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the tool and capture its output, regardless of exit status
    ///
    /// A zero `timeout` waits indefinitely. Fails only if the process could
    /// not be started, could not be awaited, or ran past the deadline.
    pub async fn output(&self, timeout: Duration) -> Result<ProcessOutput, ProcessFailure> {
        let rendered = self.display();
        let started = Instant::now();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                warn!(command = %rendered, error = %e, "failed to spawn tool");
                ProcessFailure::without_output(rendered.clone(), FailureReason::Spawn(e.to_string()))
            })?;

        debug!(command = %rendered, pid = ?child.id(), "spawned tool");

        let mut stdout = PipeReader::spawn(child.stdout.take());
        let mut stderr = PipeReader::spawn(child.stderr.take());

        let deadline = async {
            if timeout.is_zero() {
                std::future::pending::<()>().await
            } else {
                tokio::time::sleep(timeout).await
            }
        };

        let status = tokio::select! {
            status = child.wait() => status,
            _ = deadline => {
                warn!(command = %rendered, ?timeout, "tool timed out, killing");
                // kill() also waits, so the child is reaped before returning.
                if let Err(e) = child.kill().await {
                    warn!(command = %rendered, error = %e, "failed to kill tool");
                }
                let partial = ProcessOutput {
                    exit_code: None,
                    stdout: stdout.drain().await,
                    stderr: stderr.drain().await,
                };
                return Err(ProcessFailure::interrupted(
                    rendered,
                    FailureReason::TimedOut(timeout),
                    &partial,
                ));
            }
        };

        let status = status.map_err(|e| {
            ProcessFailure::without_output(rendered.clone(), FailureReason::Io(e.to_string()))
        })?;

        // The tool has exited, but a grandchild may still hold its pipes.
        let remaining = (!timeout.is_zero())
            .then(|| timeout.saturating_sub(started.elapsed()).max(DRAIN_GRACE));
        let output = ProcessOutput {
            exit_code: status.code(),
            stdout: stdout.finish(remaining).await.map_err(|e| {
                ProcessFailure::without_output(rendered.clone(), FailureReason::Io(e))
            })?,
            stderr: stderr.finish(remaining).await.map_err(|e| {
                ProcessFailure::without_output(rendered.clone(), FailureReason::Io(e))
            })?,
        };

        debug!(
            command = %rendered,
            exit_code = ?output.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool finished"
        );

        Ok(output)
    }

    /// Run the tool and require a zero exit status
    pub async fn run(&self, timeout: Duration) -> Result<ProcessOutput, ProcessFailure> {
        let output = self.output(timeout).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(ProcessFailure::from_output(self.display(), &output))
        }
    }
}

/// How long a killed tool's pipes are drained before giving up on them
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Background task collecting one output pipe
///
/// Bytes land in a shared buffer as they arrive, so whatever was read before
/// a timeout is still available after the task is aborted.
struct PipeReader {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<io::Result<()>>,
}

impl PipeReader {
    fn spawn<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);
        let task = tokio::spawn(async move {
            let Some(mut pipe) = pipe else {
                return Ok(());
            };
            let mut chunk = [0u8; 8192];
            loop {
                let n = pipe.read(&mut chunk).await?;
                if n == 0 {
                    return Ok(());
                }
                sink.lock().await.extend_from_slice(&chunk[..n]);
            }
        });
        Self { buffer, task }
    }

    /// Wait for end of file, at most `limit`, and return everything read
    async fn finish(&mut self, limit: Option<Duration>) -> Result<Vec<u8>, String> {
        let joined = match limit {
            None => (&mut self.task).await,
            Some(limit) => match tokio::time::timeout(limit, &mut self.task).await {
                Ok(joined) => joined,
                Err(_elapsed) => {
                    self.task.abort();
                    return Ok(self.take().await);
                }
            },
        };
        match joined {
            Ok(Ok(())) => Ok(self.take().await),
            Ok(Err(e)) => Err(format!("failed to read tool output: {}", e)),
            Err(e) => Err(format!("output reader failed: {}", e)),
        }
    }

    /// Read what is left for a short grace period, then stop
    ///
    /// A grandchild that inherited the pipe can keep it open after the tool
    /// itself was killed, so end of file is not awaited unbounded.
    async fn drain(&mut self) -> Vec<u8> {
        if tokio::time::timeout(DRAIN_GRACE, &mut self.task).await.is_err() {
            self.task.abort();
        }
        self.take().await
    }

    async fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buffer.lock().await)
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.task.abort();
    }
}
