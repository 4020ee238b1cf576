//! Managed render subprocess with streaming output scanning.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::AdaptorError;
use crate::handlers::RegexHandler;
use nuke_openjd_util::redact_sensitive;

/// A child process whose stdout/stderr are forwarded line by line to the
/// log and to a [`RegexHandler`].
///
/// The process is put in its own process group on unix so termination
/// signals reach render helpers it spawns.
#[derive(Debug)]
pub struct LoggingSubprocess {
    child: Child,
    pid: Option<u32>,
    stdout_task: JoinHandle<()>,
    stderr_task: JoinHandle<()>,
}

impl LoggingSubprocess {
    /// Spawn `program` with `args` and `envs`, wiring both output streams
    /// through `handler`.
    pub fn spawn(
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        handler: Arc<RegexHandler>,
    ) -> Result<Self, AdaptorError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(envs.iter().map(|(key, value)| (key.as_str(), value.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| AdaptorError::Spawn {
            program: program.to_string(),
            source,
        })?;
        let pid = child.id();
        info!(program, pid, "launched render application");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = spawn_line_forwarder(stdout, Arc::clone(&handler), false);
        let stderr_task = spawn_line_forwarder(stderr, handler, true);

        Ok(Self {
            child,
            pid,
            stdout_task,
            stderr_task,
        })
    }

    /// Whether the process is still alive.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// The exit code, when the process has exited with one.
    pub fn exit_code(&mut self) -> Option<i32> {
        match self.child.try_wait() {
            Ok(Some(status)) => status.code(),
            _ => None,
        }
    }

    /// Wait for the process to exit and for the output forwarders to drain.
    pub async fn wait(&mut self) -> Result<Option<i32>, AdaptorError> {
        let status = self.child.wait().await?;
        // Bounded drain; descendants may hold the pipe fds open.
        let drain = Duration::from_millis(250);
        let _ = tokio::time::timeout(drain, &mut self.stdout_task).await;
        let _ = tokio::time::timeout(drain, &mut self.stderr_task).await;
        Ok(status.code())
    }

    /// Terminate the process group: SIGTERM, then SIGKILL once `grace`
    /// elapses. A zero grace kills immediately.
    pub async fn terminate(&mut self, grace: Duration) -> Result<(), AdaptorError> {
        if !self.is_running() {
            return Ok(());
        }

        if grace.is_zero() {
            self.signal_group(ImmediateKill)?;
        } else {
            self.signal_group(GracefulTerm)?;
            let waited = tokio::time::timeout(grace, self.child.wait()).await;
            match waited {
                Ok(result) => {
                    result?;
                    return Ok(());
                }
                Err(_) => {
                    warn!(pid = self.pid, "render application ignored SIGTERM, killing");
                    self.signal_group(ImmediateKill)?;
                }
            }
        }
        self.child.wait().await?;
        Ok(())
    }

    #[cfg(unix)]
    fn signal_group(&mut self, mode: TerminationMode) -> Result<(), AdaptorError> {
        let Some(pid) = self.pid else {
            return Ok(());
        };
        let signal = match mode {
            GracefulTerm => libc::SIGTERM,
            ImmediateKill => libc::SIGKILL,
        };
        let pgid = -(pid as libc::pid_t);
        let result = unsafe { libc::kill(pgid, signal) };
        if result != 0 {
            let os_error = std::io::Error::last_os_error();
            // Already gone is fine.
            if os_error.raw_os_error() != Some(libc::ESRCH) {
                return Err(AdaptorError::Io(os_error));
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn signal_group(&mut self, _mode: TerminationMode) -> Result<(), AdaptorError> {
        self.child.start_kill()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum TerminationMode {
    GracefulTerm,
    ImmediateKill,
}
use TerminationMode::{GracefulTerm, ImmediateKill};

fn spawn_line_forwarder<R>(
    stream: Option<R>,
    handler: Arc<RegexHandler>,
    is_stderr: bool,
) -> JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(stream) = stream else {
            return;
        };
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = redact_sensitive(&line);
            if is_stderr {
                warn!(target: "nuke", "{line}");
            } else {
                info!(target: "nuke", "{line}");
            }
            handler.handle_line(&line);
        }
    })
}
