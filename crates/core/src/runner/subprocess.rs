//! Shared subprocess management.
//!
//! Provides [`run_command`], the spawn + I/O capture + timeout +
//! cancellation logic behind [`FlowScript`](super::flow::FlowScript).
//! The caller builds a [`tokio::process::Command`] with the program and
//! arguments; environment variables and working directory from
//! [`RunInput`] are applied here.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use super::types::{RunError, RunInput, RunOutput};

/// Maximum stdout or stderr size captured per stream (10 MiB).
///
/// Output exceeding this limit is truncated to prevent memory exhaustion
/// from extremely verbose scripts.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Grace period between SIGTERM and SIGKILL on cancellation.
const TERM_GRACE: Duration = Duration::from_secs(5);

/// How waiting on the child ended.
enum WaitOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Spawn `cmd`, capture stdout/stderr, and wait for exit, honoring both
/// the configured timeout and the cancellation token.
///
/// On cancellation the child receives SIGTERM; if it has not exited after
/// [`TERM_GRACE`] it is killed outright. On timeout the child is killed
/// immediately. `kill_on_drop(true)` is set as a backstop so an aborted
/// caller never leaks the process.
pub async fn run_command(
    cmd: &mut Command,
    input: RunInput,
    cancel: &CancellationToken,
) -> Result<RunOutput, RunError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in &input.env_vars {
        cmd.env(key, value);
    }

    if let Some(dir) = &input.working_directory {
        cmd.current_dir(dir);
    }

    let start = Instant::now();

    let mut child = cmd.spawn().map_err(RunError::Io)?;

    // Take stdout/stderr handles and read them in spawned tasks so we can
    // still call `child.wait()` (which borrows `&mut child`).
    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();

    let stdout_task = tokio::spawn(async move { read_stream(stdout_handle).await });
    let stderr_task = tokio::spawn(async move { read_stream(stderr_handle).await });

    // The wait future borrows `child`, so resolve the race to a plain enum
    // inside this block and deal with the child afterwards.
    let outcome = {
        let wait = child.wait();
        tokio::pin!(wait);
        tokio::select! {
            res = tokio::time::timeout(input.timeout, &mut wait) => match res {
                Ok(exit) => WaitOutcome::Exited(exit),
                Err(_elapsed) => WaitOutcome::TimedOut,
            },
            () = cancel.cancelled() => WaitOutcome::Cancelled,
        }
    };

    match outcome {
        WaitOutcome::Exited(Ok(status)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let stdout_bytes = stdout_task.await.unwrap_or_default();
            let stderr_bytes = stderr_task.await.unwrap_or_default();

            Ok(RunOutput {
                stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms,
            })
        }
        WaitOutcome::Exited(Err(e)) => Err(RunError::Io(e)),
        WaitOutcome::TimedOut => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            Err(RunError::Timeout {
                elapsed_ms: start.elapsed().as_millis() as u64,
            })
        }
        WaitOutcome::Cancelled => {
            terminate(&mut child).await;
            Err(RunError::Cancelled {
                elapsed_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}

/// Terminate a child: SIGTERM first, escalate to SIGKILL after the grace
/// period. Always reaps the process before returning.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        let _ = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if tokio::time::timeout(TERM_GRACE, child.wait()).await.is_ok() {
            return;
        }
        tracing::warn!(pid, "Child ignored SIGTERM, escalating to SIGKILL");
    }

    let _ = child.start_kill();
    let _ = child.wait().await;
}

/// Read an entire output stream into a byte buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
