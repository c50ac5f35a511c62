//! Ollama process backend.
//!
//! Runs `<command> run <model> <prompt>` as a child process. Output is read
//! incrementally while the process runs. The deadline is enforced by
//! cancelling a token handed to the process wrapper, which then kills and
//! reaps the child; anything read up to that point is dropped.

use super::{ModelBackend, ModelError};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Deadline for the `--version` availability check
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Backend that shells out to the model runner.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    command: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(command: &str, model: &str) -> Self {
        Self {
            command: command.to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    async fn invoke(&self, prompt: &str, deadline: Duration) -> Result<String, ModelError> {
        debug!("Running {} run {} (deadline {:?})", self.command, self.model, deadline);

        let args = ["run", self.model.as_str(), prompt];
        let output = run_with_deadline(&self.command, &args, deadline).await?;

        if !output.status.success() {
            return Err(ModelError::ProcessFailed(describe_failure(&output)));
        }
        Ok(output.stdout)
    }

    async fn check_availability(&self) -> bool {
        match run_with_deadline(&self.command, &["--version"], AVAILABILITY_TIMEOUT).await {
            Ok(output) if output.status.success() => {
                debug!("{} reports {}", self.command, output.stdout.trim());
                true
            }
            Ok(output) => {
                warn!("{} --version failed: {}", self.command, describe_failure(&output));
                false
            }
            Err(e) => {
                warn!("{} is not available: {}", self.command, e);
                false
            }
        }
    }
}

fn describe_failure(output: &ProcessOutput) -> String {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

// ============================================================================
// Process wrapper
// ============================================================================

/// Collected output of a finished child process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Arms a cancellation token at `deadline` and runs the process under it.
pub async fn run_with_deadline(
    program: &str,
    args: &[&str],
    deadline: Duration,
) -> Result<ProcessOutput, ModelError> {
    let cancel = CancellationToken::new();
    let run = run_process(program, args, cancel.clone());
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = tokio::time::sleep(deadline) => {
            cancel.cancel();
            // Let the wrapper kill and reap the child before reporting.
            let _ = run.await;
            Err(ModelError::Timeout(deadline))
        }
    }
}

/// Runs a process to completion unless `cancel` fires first, in which case the
/// child is killed and `ModelError::Timeout` with a zero duration is returned.
pub async fn run_process(
    program: &str,
    args: &[&str],
    cancel: CancellationToken,
) -> Result<ProcessOutput, ModelError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ModelError::Spawn(e.to_string()))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ModelError::Io("stdout was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ModelError::Io("stderr was not captured".to_string()))?;

    let stdout_task = collect_lines(stdout);
    let stderr_task = collect_lines(stderr);
    let collectors = [stdout_task.abort_handle(), stderr_task.abort_handle()];

    let status = tokio::select! {
        status = child.wait() => status.map_err(|e| ModelError::Io(e.to_string()))?,
        _ = cancel.cancelled() => {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill {}: {}", program, e);
            }
            collectors.iter().for_each(|c| c.abort());
            return Err(ModelError::Timeout(Duration::ZERO));
        }
    };

    // A grandchild can keep the pipes open after the child exits.
    let collected = async {
        let stdout = join_collector(stdout_task).await?;
        let stderr = join_collector(stderr_task).await?;
        Ok::<_, ModelError>((stdout, stderr))
    };
    tokio::select! {
        result = collected => {
            let (stdout, stderr) = result?;
            Ok(ProcessOutput { status, stdout, stderr })
        }
        _ = cancel.cancelled() => {
            collectors.iter().for_each(|c| c.abort());
            Err(ModelError::Timeout(Duration::ZERO))
        }
    }
}

fn collect_lines<R>(reader: R) -> JoinHandle<std::io::Result<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut collected = String::new();
        while let Some(line) = lines.next_line().await? {
            collected.push_str(&line);
            collected.push('\n');
        }
        Ok(collected)
    })
}

async fn join_collector(task: JoinHandle<std::io::Result<String>>) -> Result<String, ModelError> {
    task.await
        .map_err(|e| ModelError::Io(e.to_string()))?
        .map_err(|e| ModelError::Io(e.to_string()))
}
