//! Flow run lifecycle manager.
//!
//! Tracks at most one running flow script per user. Each run is a spawned
//! tokio task driving the external script through
//! [`FlowScript`](flowrunner_core::runner::FlowScript); lifecycle status is
//! published as [`RunEvent`]s, which the notification router relays to the
//! submitting user's WebSocket connections.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use flowrunner_core::run_events::{
    EVENT_RUN_CANCELLED, EVENT_RUN_ERROR, EVENT_RUN_FAILED, EVENT_RUN_STARTED, EVENT_RUN_SUCCEEDED,
};
use flowrunner_core::runner::{FlowScript, RunError, RunInput};
use flowrunner_core::types::{DbId, Timestamp};
use flowrunner_events::{EventBus, RunEvent};

/// Maximum stderr characters carried in a failure event payload.
const STDERR_TAIL_CHARS: usize = 2000;

/// The per-user run table, shared between the manager and its run tasks.
type RunTable = Arc<RwLock<HashMap<DbId, ActiveRun>>>;

/// A run currently executing for one user.
struct ActiveRun {
    flow_name: String,
    started_at: Timestamp,
    /// Per-run cancellation token (child of the manager's master token).
    cancel: CancellationToken,
    /// Handle to the driving task; kept so shutdown can await completion.
    task: tokio::task::JoinHandle<()>,
}

/// Serializable snapshot of an active run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatus {
    pub user_id: DbId,
    pub flow_name: String,
    pub started_at: Timestamp,
}

/// Errors from run lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum RunManagerError {
    #[error("A flow is already running for this user")]
    AlreadyRunning,

    #[error("No running flow for this user")]
    NotRunning,
}

/// Spawns, tracks, and cancels flow script runs, one slot per user id.
///
/// Invariants:
/// - The contains-check and insert happen under one write-lock acquisition,
///   so two concurrent triggers for the same user cannot both start.
/// - Exactly one terminal event (`run.succeeded` / `run.failed` /
///   `run.error` / `run.cancelled`) is published per started run.
/// - The map entry is removed and the uploaded file deleted before the
///   terminal event is published, so a client reacting to the event can
///   immediately trigger the next run.
pub struct RunManager {
    script: FlowScript,
    run_timeout: Duration,
    event_bus: Arc<EventBus>,
    runs: RunTable,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

impl RunManager {
    /// Create a manager for the given script configuration.
    pub fn new(script: FlowScript, run_timeout: Duration, event_bus: Arc<EventBus>) -> Self {
        Self {
            script,
            run_timeout,
            event_bus,
            runs: Arc::new(RwLock::new(HashMap::new())),
            cancel: CancellationToken::new(),
        }
    }

    /// Start a run for `user_id`, refusing if one is already active.
    ///
    /// The uploaded file at `file_path` is owned by the run from this point
    /// on and is deleted once the run reaches a terminal state.
    pub async fn start(
        &self,
        user_id: DbId,
        flow_name: String,
        file_path: PathBuf,
    ) -> Result<RunStatus, RunManagerError> {
        let mut runs = self.runs.write().await;
        if runs.contains_key(&user_id) {
            return Err(RunManagerError::AlreadyRunning);
        }

        let run_cancel = self.cancel.child_token();
        let started_at = chrono::Utc::now();

        let ctx = RunContext {
            script: self.script.clone(),
            run_timeout: self.run_timeout,
            event_bus: Arc::clone(&self.event_bus),
            runs: Arc::clone(&self.runs),
        };
        let task = tokio::spawn(ctx.execute(
            user_id,
            flow_name.clone(),
            file_path,
            run_cancel.clone(),
        ));

        runs.insert(
            user_id,
            ActiveRun {
                flow_name: flow_name.clone(),
                started_at,
                cancel: run_cancel,
                task,
            },
        );

        tracing::info!(user_id, flow = %flow_name, "Flow run started");

        Ok(RunStatus {
            user_id,
            flow_name,
            started_at,
        })
    }

    /// Cancel the active run for `user_id`.
    ///
    /// Triggers the run's cancellation token; the child receives SIGTERM
    /// (escalating to SIGKILL) and the run task publishes `run.cancelled`
    /// and cleans up. A run that finishes between lookup and trigger has
    /// already published its terminal event; the extra trigger is a no-op.
    pub async fn cancel(&self, user_id: DbId) -> Result<(), RunManagerError> {
        let runs = self.runs.read().await;
        let run = runs.get(&user_id).ok_or(RunManagerError::NotRunning)?;
        run.cancel.cancel();
        tracing::info!(user_id, flow = %run.flow_name, "Flow run cancellation requested");
        Ok(())
    }

    /// Snapshot of the user's active run, if any.
    pub async fn active(&self, user_id: DbId) -> Option<RunStatus> {
        self.runs.read().await.get(&user_id).map(|run| RunStatus {
            user_id,
            flow_name: run.flow_name.clone(),
            started_at: run.started_at,
        })
    }

    /// Number of currently active runs across all users.
    pub async fn active_count(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Terminate all active runs and wait for their tasks to finish.
    ///
    /// Used during graceful shutdown. Each task still publishes its
    /// `run.cancelled` event and removes its uploaded file.
    pub async fn shutdown(&self, timeout: Duration) {
        self.cancel.cancel();

        let tasks: Vec<_> = {
            let mut runs = self.runs.write().await;
            runs.drain().map(|(_, run)| run.task).collect()
        };

        let count = tasks.len();
        for task in tasks {
            let _ = tokio::time::timeout(timeout, task).await;
        }
        tracing::info!(count, "Run manager shut down");
    }
}

/// Everything a spawned run task needs, detached from the manager's lifetime.
struct RunContext {
    script: FlowScript,
    run_timeout: Duration,
    event_bus: Arc<EventBus>,
    runs: RunTable,
}

impl RunContext {
    /// Drive one run to completion and publish its lifecycle events.
    async fn execute(
        self,
        user_id: DbId,
        flow_name: String,
        file_path: PathBuf,
        cancel: CancellationToken,
    ) {
        let file_display = file_path.to_string_lossy().into_owned();

        self.event_bus.publish(
            RunEvent::new(EVENT_RUN_STARTED, user_id, &flow_name)
                .with_payload(serde_json::json!({ "file": file_display })),
        );

        let input = RunInput {
            env_vars: vec![],
            working_directory: None,
            timeout: self.run_timeout,
        };

        let result = self
            .script
            .run(&flow_name, &file_display, input, &cancel)
            .await;

        let event = match &result {
            Ok(output) if output.success() => {
                tracing::info!(user_id, flow = %flow_name, duration_ms = output.duration_ms, "Flow run succeeded");
                RunEvent::new(EVENT_RUN_SUCCEEDED, user_id, &flow_name)
                    .with_payload(serde_json::json!({ "duration_ms": output.duration_ms }))
            }
            Ok(output) => {
                tracing::warn!(user_id, flow = %flow_name, exit_code = output.exit_code, "Flow run failed");
                RunEvent::new(EVENT_RUN_FAILED, user_id, &flow_name).with_payload(
                    serde_json::json!({
                        "exit_code": output.exit_code,
                        "stderr": tail(&output.stderr),
                    }),
                )
            }
            Err(RunError::Timeout { elapsed_ms }) => {
                tracing::warn!(user_id, flow = %flow_name, elapsed_ms, "Flow run timed out");
                RunEvent::new(EVENT_RUN_FAILED, user_id, &flow_name).with_payload(
                    serde_json::json!({
                        "reason": "timeout",
                        "elapsed_ms": elapsed_ms,
                    }),
                )
            }
            Err(RunError::Cancelled { elapsed_ms }) => {
                tracing::info!(user_id, flow = %flow_name, elapsed_ms, "Flow run cancelled");
                RunEvent::new(EVENT_RUN_CANCELLED, user_id, &flow_name)
            }
            Err(e) => {
                tracing::error!(user_id, flow = %flow_name, error = %e, "Flow run errored");
                RunEvent::new(EVENT_RUN_ERROR, user_id, &flow_name)
                    .with_payload(serde_json::json!({ "error": e.to_string() }))
            }
        };

        // Free the slot and remove the upload before announcing the terminal
        // state, so a client reacting to the event can trigger again.
        self.runs.write().await.remove(&user_id);

        if let Err(e) = tokio::fs::remove_file(&file_path).await {
            tracing::warn!(user_id, file = %file_display, error = %e, "Failed to delete uploaded file");
        }

        self.event_bus.publish(event);
    }
}

/// Last [`STDERR_TAIL_CHARS`] characters of a captured stream.
fn tail(s: &str) -> &str {
    let char_count = s.chars().count();
    if char_count <= STDERR_TAIL_CHARS {
        return s;
    }
    let skip = char_count - STDERR_TAIL_CHARS;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_returns_short_strings_unchanged() {
        assert_eq!(tail("boom"), "boom");
    }

    #[test]
    fn tail_truncates_to_last_chars() {
        let long: String = "x".repeat(STDERR_TAIL_CHARS + 100);
        assert_eq!(tail(&long).len(), STDERR_TAIL_CHARS);
    }

    #[test]
    fn tail_respects_multibyte_boundaries() {
        let long: String = "é".repeat(STDERR_TAIL_CHARS + 50);
        let tailed = tail(&long);
        assert_eq!(tailed.chars().count(), STDERR_TAIL_CHARS);
    }
}
