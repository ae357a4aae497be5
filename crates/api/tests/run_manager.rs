//! Integration tests for `RunManager`.
//!
//! These exercise the full run lifecycle against real child processes,
//! using `sh` as the interpreter so no Python installation is needed.
//! Event delivery is observed through a bus subscription, exactly as the
//! notification router consumes it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tokio::sync::broadcast;

use flowrunner_api::runs::{RunManager, RunManagerError};
use flowrunner_core::run_events::{
    EVENT_RUN_CANCELLED, EVENT_RUN_ERROR, EVENT_RUN_FAILED, EVENT_RUN_STARTED, EVENT_RUN_SUCCEEDED,
};
use flowrunner_core::runner::FlowScript;
use flowrunner_events::{EventBus, RunEvent};

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A manager over a temp shell script, plus a subscribed event receiver.
struct Harness {
    manager: RunManager,
    events: broadcast::Receiver<RunEvent>,
    /// Keeps the script file alive for the duration of the test.
    _script: tempfile::NamedTempFile,
    /// Temp dir holding fake uploads.
    uploads: tempfile::TempDir,
}

impl Harness {
    fn new(script_body: &str) -> Self {
        use std::io::Write;
        let mut script = tempfile::Builder::new()
            .suffix(".sh")
            .tempfile()
            .expect("create temp script");
        write!(script, "{script_body}").expect("write script body");

        let bus = Arc::new(EventBus::default());
        let events = bus.subscribe();
        let flow_script = FlowScript::new("sh", script.path().to_str().expect("script path"));
        let manager = RunManager::new(flow_script, Duration::from_secs(30), bus);

        Self {
            manager,
            events,
            _script: script,
            uploads: tempfile::tempdir().expect("create upload dir"),
        }
    }

    /// Create a fake uploaded data file and return its path.
    fn upload(&self, name: &str) -> PathBuf {
        let path = self.uploads.path().join(name);
        std::fs::write(&path, "col_a,col_b\n1,2\n").expect("write upload");
        path
    }

    /// Receive the next event, panicking after [`RECV_TIMEOUT`].
    async fn next_event(&mut self) -> RunEvent {
        tokio::time::timeout(RECV_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }
}

// ---------------------------------------------------------------------------
// Lifecycle: success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_run_publishes_started_then_succeeded() {
    let mut h = Harness::new("echo processed\n");
    let upload = h.upload("data.csv");

    let status = h
        .manager
        .start(1, "Weekly Import".to_string(), upload.clone())
        .await
        .expect("start should succeed");
    assert_eq!(status.user_id, 1);
    assert_eq!(status.flow_name, "Weekly Import");

    let started = h.next_event().await;
    assert_eq!(started.event_type, EVENT_RUN_STARTED);
    assert_eq!(started.user_id, 1);
    assert_eq!(started.flow_name, "Weekly Import");

    let terminal = h.next_event().await;
    assert_eq!(terminal.event_type, EVENT_RUN_SUCCEEDED);
    assert!(terminal.payload["duration_ms"].is_number());

    // The slot is free and the upload deleted once the terminal event is out.
    assert_eq!(h.manager.active_count().await, 0);
    assert!(!upload.exists(), "uploaded file should be deleted");
}

// ---------------------------------------------------------------------------
// Lifecycle: failure and error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn nonzero_exit_publishes_failed_with_exit_code() {
    let mut h = Harness::new("echo oops >&2\nexit 3\n");
    let upload = h.upload("data.csv");

    h.manager
        .start(2, "flow".to_string(), upload)
        .await
        .expect("start should succeed");

    let started = h.next_event().await;
    assert_eq!(started.event_type, EVENT_RUN_STARTED);

    let terminal = h.next_event().await;
    assert_eq!(terminal.event_type, EVENT_RUN_FAILED);
    assert_eq!(terminal.payload["exit_code"], 3);
    assert!(terminal.payload["stderr"]
        .as_str()
        .is_some_and(|s| s.contains("oops")));
}

#[tokio::test]
async fn missing_script_publishes_error() {
    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();
    let manager = RunManager::new(
        FlowScript::new("sh", "/nonexistent/flow_script.py"),
        Duration::from_secs(5),
        bus,
    );

    let uploads = tempfile::tempdir().expect("create upload dir");
    let upload = uploads.path().join("data.csv");
    std::fs::write(&upload, "a,b\n").expect("write upload");

    manager
        .start(3, "flow".to_string(), upload)
        .await
        .expect("start should succeed");

    let started = tokio::time::timeout(RECV_TIMEOUT, events.recv())
        .await
        .expect("timed out")
        .expect("channel closed");
    assert_eq!(started.event_type, EVENT_RUN_STARTED);

    let terminal = tokio::time::timeout(RECV_TIMEOUT, events.recv())
        .await
        .expect("timed out")
        .expect("channel closed");
    assert_eq!(terminal.event_type, EVENT_RUN_ERROR);
    assert!(terminal.payload["error"]
        .as_str()
        .is_some_and(|s| s.contains("not found")));
}

// ---------------------------------------------------------------------------
// Single-slot semantics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_trigger_for_same_user_is_refused() {
    let mut h = Harness::new("sleep 30\n");
    let first = h.upload("first.csv");
    let second = h.upload("second.csv");

    h.manager
        .start(7, "flow".to_string(), first)
        .await
        .expect("first start should succeed");

    let result = h.manager.start(7, "flow".to_string(), second).await;
    assert_matches!(result, Err(RunManagerError::AlreadyRunning));

    // A different user is not affected by user 7's slot.
    let other = h.upload("other.csv");
    h.manager
        .start(8, "flow".to_string(), other)
        .await
        .expect("other user's start should succeed");
    assert_eq!(h.manager.active_count().await, 2);

    h.manager.shutdown(Duration::from_secs(10)).await;
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_terminates_run_and_publishes_cancelled() {
    let mut h = Harness::new("sleep 60\n");
    let upload = h.upload("data.csv");

    h.manager
        .start(4, "Long Flow".to_string(), upload.clone())
        .await
        .expect("start should succeed");

    let started = h.next_event().await;
    assert_eq!(started.event_type, EVENT_RUN_STARTED);

    h.manager.cancel(4).await.expect("cancel should succeed");

    let terminal = h.next_event().await;
    assert_eq!(terminal.event_type, EVENT_RUN_CANCELLED);
    assert_eq!(terminal.flow_name, "Long Flow");

    assert_eq!(h.manager.active_count().await, 0);
    assert!(!upload.exists(), "uploaded file should be deleted");
}

#[tokio::test]
async fn cancel_with_no_active_run_is_an_error() {
    let h = Harness::new("echo unused\n");

    let result = h.manager.cancel(99).await;
    assert_matches!(result, Err(RunManagerError::NotRunning));
}

#[tokio::test]
async fn slot_frees_after_cancel_allowing_retrigger() {
    let mut h = Harness::new("sleep 60\n");

    let first = h.upload("first.csv");
    h.manager
        .start(5, "flow".to_string(), first)
        .await
        .expect("start should succeed");

    assert_eq!(h.next_event().await.event_type, EVENT_RUN_STARTED);
    h.manager.cancel(5).await.expect("cancel should succeed");
    assert_eq!(h.next_event().await.event_type, EVENT_RUN_CANCELLED);

    // The terminal event means the slot is free again.
    let second = h.upload("second.csv");
    h.manager
        .start(5, "flow".to_string(), second)
        .await
        .expect("retrigger after cancel should succeed");

    h.manager.shutdown(Duration::from_secs(10)).await;
}

// ---------------------------------------------------------------------------
// Status snapshots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn active_reports_running_flow_and_clears_when_idle() {
    let mut h = Harness::new("sleep 60\n");

    assert!(h.manager.active(6).await.is_none());

    let upload = h.upload("data.csv");
    h.manager
        .start(6, "Inventory Sync".to_string(), upload)
        .await
        .expect("start should succeed");

    let status = h.manager.active(6).await.expect("run should be active");
    assert_eq!(status.flow_name, "Inventory Sync");

    assert_eq!(h.next_event().await.event_type, EVENT_RUN_STARTED);
    h.manager.cancel(6).await.expect("cancel should succeed");
    assert_eq!(h.next_event().await.event_type, EVENT_RUN_CANCELLED);

    assert!(h.manager.active(6).await.is_none());
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_cancels_all_active_runs() {
    let mut h = Harness::new("sleep 60\n");

    for user_id in [10, 11, 12] {
        let upload = h.upload(&format!("u{user_id}.csv"));
        h.manager
            .start(user_id, "flow".to_string(), upload)
            .await
            .expect("start should succeed");
    }
    assert_eq!(h.manager.active_count().await, 3);

    h.manager.shutdown(Duration::from_secs(10)).await;
    assert_eq!(h.manager.active_count().await, 0);

    // Three started events plus three cancelled events, in some order.
    let mut cancelled = 0;
    for _ in 0..6 {
        if h.next_event().await.event_type == EVENT_RUN_CANCELLED {
            cancelled += 1;
        }
    }
    assert_eq!(cancelled, 3);
}
