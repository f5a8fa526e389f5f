//! Subprocess launching for job scripts.
//!
//! Handlers depend on the [`Launcher`] trait so tests can substitute a fake;
//! [`ScriptLauncher`] is the real implementation on top of `tokio::process`.
//!
//! Every script runs as the leader of its own process group. Termination
//! signals go to the whole group, so children a script backgrounds are
//! stopped along with it.

use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Captured output is cut off past this many bytes per stream.
pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// How long output is still read after the process exits. A background
/// child that inherited stdout can hold the pipe open indefinitely.
pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
}

impl Command {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn display_name(&self) -> String {
        self.program.display().to_string()
    }
}

/// Exit status and captured output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    /// Exit code, or 128 + signal number when killed by a signal.
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    /// The process could not be started or executed at all.
    #[error("Running command '{program}': {message}")]
    Launch { program: String, message: String },
    #[error("Waiting for '{program}': {message}")]
    Wait { program: String, message: String },
    #[error("Signalling '{program}': {message}")]
    Signal { program: String, message: String },
}

/// A started process.
pub trait Process: Send {
    /// Wait for exit. Cancel-safe: may be dropped and called again.
    fn wait(&mut self) -> BoxFuture<'_, Result<ProcessOutcome, ProcessError>>;

    /// Ask the process to stop. If it is still alive after `grace`, a
    /// subsequent `wait` kills it.
    fn terminate_nicely(&mut self, grace: Duration) -> Result<(), ProcessError>;
}

/// Starts processes.
pub trait Launcher: Send + Sync {
    fn start(&self, command: &Command) -> Result<Box<dyn Process>, ProcessError>;

    /// Start and wait for exit.
    fn run<'a>(
        &'a self,
        command: &'a Command,
    ) -> BoxFuture<'a, Result<ProcessOutcome, ProcessError>> {
        Box::pin(async move {
            let mut process = self.start(command)?;
            process.wait().await
        })
    }
}

// ── tokio::process implementation ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptLauncher;

impl Launcher for ScriptLauncher {
    fn start(&self, command: &Command) -> Result<Box<dyn Process>, ProcessError> {
        let program = command.display_name();

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| ProcessError::Launch {
            program: program.clone(),
            message: e.to_string(),
        })?;

        // process_group(0) makes the child's pid its group id.
        let group = child.id().map(|pid| Pid::from_raw(pid as i32));
        let stdout = child.stdout.take().map(OutputReader::spawn);
        let stderr = child.stderr.take().map(OutputReader::spawn);

        tracing::debug!(program, pid = ?child.id(), "process started");
        Ok(Box::new(ScriptProcess {
            program,
            child,
            group,
            stdout,
            stderr,
            kill_deadline: None,
        }))
    }
}

struct ScriptProcess {
    program: String,
    child: tokio::process::Child,
    group: Option<Pid>,
    stdout: Option<OutputReader>,
    stderr: Option<OutputReader>,
    /// Set by `terminate_nicely`; past it the group is killed.
    kill_deadline: Option<Instant>,
}

impl ScriptProcess {
    /// Signal every process in the script's group. A group that is already
    /// gone is not an error.
    fn signal_group(&self, signal: Signal) -> nix::Result<()> {
        let Some(group) = self.group else {
            return Ok(());
        };
        match killpg(group, signal) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn wait_status(&mut self) -> std::io::Result<ExitStatus> {
        let Some(deadline) = self.kill_deadline else {
            return self.child.wait().await;
        };
        let waited = tokio::time::timeout_at(deadline, self.child.wait()).await;
        match waited {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(program = %self.program, "grace period elapsed, killing process group");
                if let Err(e) = self.signal_group(Signal::SIGKILL) {
                    tracing::warn!(program = %self.program, error = %e, "failed to kill process group");
                    let _ = self.child.start_kill();
                }
                self.child.wait().await
            }
        }
    }
}

impl Process for ScriptProcess {
    fn wait(&mut self) -> BoxFuture<'_, Result<ProcessOutcome, ProcessError>> {
        Box::pin(async move {
            let status = self.wait_status().await.map_err(|e| ProcessError::Wait {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

            let deadline = Instant::now() + OUTPUT_DRAIN_TIMEOUT;
            let stdout = collect(&mut self.stdout, deadline).await;
            let stderr = collect(&mut self.stderr, deadline).await;
            let exit_status = exit_code(status);

            tracing::debug!(program = %self.program, exit_status, "process exited");
            Ok(ProcessOutcome {
                exit_status,
                stdout,
                stderr,
            })
        })
    }

    fn terminate_nicely(&mut self, grace: Duration) -> Result<(), ProcessError> {
        self.kill_deadline = Some(Instant::now() + grace);
        self.signal_group(Signal::SIGTERM)
            .map_err(|e| ProcessError::Signal {
                program: self.program.clone(),
                message: e.to_string(),
            })
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

/// Background reader for one output stream. What it has read so far stays
/// available even if it is stopped before EOF.
struct OutputReader {
    kept: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl OutputReader {
    fn spawn<R: AsyncRead + Unpin + Send + 'static>(reader: R) -> Self {
        let kept = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(capture(reader, kept.clone()));
        Self { kept, task }
    }

    fn output(&self) -> String {
        let kept = self.kept.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&kept).into_owned()
    }
}

/// Read a stream to the end, keeping at most `MAX_OUTPUT_BYTES`.
async fn capture<R: AsyncRead + Unpin>(mut reader: R, kept: Arc<Mutex<Vec<u8>>>) {
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let mut kept = kept.lock().unwrap_or_else(|e| e.into_inner());
                let room = MAX_OUTPUT_BYTES.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
}

/// Wait for the reader until `deadline`, then take whatever it captured.
///
/// The reader stays in `slot` until it is finished with, so a dropped
/// `wait` can be retried without losing output.
async fn collect(slot: &mut Option<OutputReader>, deadline: Instant) -> String {
    let Some(reader) = slot.as_mut() else {
        return String::new();
    };
    if tokio::time::timeout_at(deadline, &mut reader.task).await.is_err() {
        tracing::debug!("output still open after exit, keeping what was read");
        reader.task.abort();
    }
    let output = reader.output();
    *slot = None;
    output
}
