//! Local process runner
//!
//! Executes submitted code as a direct child process. The child gets its own
//! process group so a deadline kill also takes down anything it spawned.
//! There is no filesystem or network isolation here; only time is bounded.

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use super::scratch::ScratchDir;
use super::{CommandSpec, ExecutionResult, RunLimits, RunStatus, Runner};
use crate::compiler::compile_source;
use crate::config::JudgeConfig;
use crate::error::LaunchError;
use crate::languages::{Language, LanguageRegistry, LaunchRecipe};

/// Default cap on captured bytes per output stream
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 16 * 1024 * 1024;

/// Default deadline for a compile step
pub const DEFAULT_COMPILE_TIME_LIMIT_MS: u32 = 30_000;

/// Runner that launches submissions as local child processes
pub struct ProcessRunner {
    registry: LanguageRegistry,
    /// Parent of per-run scratch directories (system temp dir if unset)
    scratch_root: Option<PathBuf>,
    compile_time_limit: Duration,
    output_limit_bytes: usize,
}

impl ProcessRunner {
    pub fn new(registry: LanguageRegistry) -> Self {
        Self {
            registry,
            scratch_root: None,
            compile_time_limit: Duration::from_millis(u64::from(DEFAULT_COMPILE_TIME_LIMIT_MS)),
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }

    pub fn from_config(config: &JudgeConfig, registry: LanguageRegistry) -> Self {
        let mut runner = Self::new(registry)
            .with_compile_time_limit(config.compile_time_limit_ms)
            .with_output_limit(config.output_limit_bytes);
        runner.scratch_root = config.scratch_dir.clone();
        runner
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn with_compile_time_limit(mut self, time_ms: u32) -> Self {
        self.compile_time_limit = Duration::from_millis(u64::from(time_ms));
        self
    }

    pub fn with_output_limit(mut self, bytes: usize) -> Self {
        self.output_limit_bytes = bytes;
        self
    }

    /// Run with a raw language name; unknown names fail before any launch
    pub async fn run_named(
        &self,
        code: &str,
        language: &str,
        stdin: &str,
        limits: &RunLimits,
    ) -> ExecutionResult {
        match language.parse::<Language>() {
            Ok(language) => self.run(code, language, stdin, limits).await,
            Err(e) => ExecutionResult::launch_failed(e.to_string()),
        }
    }

    async fn try_run(
        &self,
        recipe: &dyn LaunchRecipe,
        code: &str,
        stdin: &str,
        limits: &RunLimits,
    ) -> Result<ExecutionResult, LaunchError> {
        let scratch = ScratchDir::create(self.scratch_root.as_deref())?;
        scratch
            .write_source(recipe.source_file(), &recipe.render_source(code))
            .await?;

        if let Some(compile_cmd) = recipe.compile_command(scratch.path()) {
            let compiled =
                compile_source(&compile_cmd, self.compile_time_limit, self.output_limit_bytes)
                    .await?;
            if !compiled.success {
                return Ok(ExecutionResult::compile_failed(compiled.message));
            }
        }

        let cmd = recipe.run_command(scratch.path());
        debug!("Launching {:?} with args {:?}", cmd.program, cmd.args);

        let time_limit = limits.time_limit();
        let exit =
            spawn_with_deadline(&cmd, Some(stdin), time_limit, self.output_limit_bytes).await?;
        let result = match exit {
            ProcessExit::Finished(finished) => ExecutionResult {
                stdout: finished.stdout,
                stderr: finished.stderr,
                elapsed: finished.elapsed,
                status: finished.status,
            },
            ProcessExit::TimedOut => ExecutionResult::timed_out(time_limit),
        };

        Ok(result)
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    fn supports(&self, language: Language) -> bool {
        self.registry.recipe(language).is_some()
    }

    async fn run(
        &self,
        code: &str,
        language: Language,
        stdin: &str,
        limits: &RunLimits,
    ) -> ExecutionResult {
        let Some(recipe) = self.registry.recipe(language) else {
            return ExecutionResult::launch_failed(format!("Language not supported: {}", language));
        };

        match self.try_run(recipe, code, stdin, limits).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Failed to launch {} program: {}", language, e);
                ExecutionResult::launch_failed(e.to_string())
            }
        }
    }
}

/// A process that ran to completion before its deadline
#[derive(Debug)]
pub(crate) struct FinishedProcess {
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub(crate) enum ProcessExit {
    Finished(FinishedProcess),
    TimedOut,
}

/// Spawn `cmd` in a new process group and wait for it, at most `deadline`.
///
/// The group is SIGKILLed as soon as the child exits, and again when this
/// returns or is dropped, so neither a timeout nor a cancelled caller leaves
/// processes behind.
pub(crate) async fn spawn_with_deadline(
    cmd: &CommandSpec,
    stdin: Option<&str>,
    deadline: Duration,
    output_limit: usize,
) -> Result<ProcessExit, LaunchError> {
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);
    if let Some(dir) = &cmd.work_dir {
        command.current_dir(dir);
    }

    let start = Instant::now();
    let mut child = command.spawn().map_err(|source| LaunchError::Spawn {
        program: cmd.program.clone(),
        source,
    })?;
    let group = child.id().map(ProcessGroup::new);

    let stdin_pipe = child.stdin.take();
    let stdout_pipe = child.stdout.take().ok_or_else(|| pipe_missing("stdout"))?;
    let stderr_pipe = child.stderr.take().ok_or_else(|| pipe_missing("stderr"))?;

    let input = stdin.unwrap_or_default().as_bytes().to_vec();
    let feed_stdin = async move {
        if let Some(mut pipe) = stdin_pipe {
            // The program may exit without draining stdin.
            let _ = pipe.write_all(&input).await;
            let _ = pipe.shutdown().await;
        }
    };

    // Once the child exits, anything left in its group would only hold the
    // pipes open, so kill it and let the readers hit EOF.
    let exited = async {
        let status = child.wait().await;
        if let Some(group) = &group {
            group.kill();
        }
        status
    };

    let wait = async {
        let ((), stdout, stderr, status) = tokio::join!(
            feed_stdin,
            read_capped(stdout_pipe, output_limit),
            read_capped(stderr_pipe, output_limit),
            exited,
        );
        Ok::<_, io::Error>((status?, stdout?, stderr?))
    };

    match tokio::time::timeout(deadline, wait).await {
        Ok(finished) => {
            let (status, stdout, stderr) = finished?;
            Ok(ProcessExit::Finished(FinishedProcess {
                status: exit_status_to_run_status(status),
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                elapsed: start.elapsed(),
            }))
        }
        Err(_) => {
            debug!("{} exceeded deadline of {:?}", cmd.program, deadline);
            Ok(ProcessExit::TimedOut)
        }
    }
}

fn pipe_missing(name: &str) -> LaunchError {
    LaunchError::Io(io::Error::other(format!("child {} was not captured", name)))
}

fn exit_status_to_run_status(status: ExitStatus) -> RunStatus {
    match (status.code(), status.signal()) {
        (Some(code), _) => RunStatus::Exited(code),
        (None, Some(sig)) => RunStatus::Signaled(sig),
        (None, None) => RunStatus::Exited(-1),
    }
}

/// Read a stream to EOF, keeping at most `limit` bytes
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> io::Result<Vec<u8>> {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(kept);
        }
        let room = limit.saturating_sub(kept.len());
        kept.extend_from_slice(&chunk[..n.min(room)]);
    }
}

/// Kills a child's process group when dropped
struct ProcessGroup(Pid);

impl ProcessGroup {
    fn new(pid: u32) -> Self {
        Self(Pid::from_raw(pid as i32))
    }
}

impl ProcessGroup {
    fn kill(&self) {
        match killpg(self.0, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => debug!("Failed to kill process group {}: {}", self.0, e),
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}
