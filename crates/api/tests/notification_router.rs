//! End-to-end tests for the event channel: bus -> router -> WebSocket.
//!
//! Publishes run events on the bus and asserts on the JSON frames the
//! notification router delivers to the submitting user's connections.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;

use flowrunner_api::notifications::NotificationRouter;
use flowrunner_api::ws::WsManager;
use flowrunner_core::run_events::{
    EVENT_RUN_CANCELLED, EVENT_RUN_SUCCEEDED, MSG_TYPE_RUN_CANCELLED, MSG_TYPE_RUN_SUCCEEDED,
};
use flowrunner_events::{EventBus, RunEvent};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawn a router over a fresh bus + manager pair.
fn setup() -> (
    Arc<WsManager>,
    Arc<EventBus>,
    tokio::task::JoinHandle<()>,
) {
    let ws_manager = Arc::new(WsManager::new());
    let bus = Arc::new(EventBus::default());
    let router = NotificationRouter::new(Arc::clone(&ws_manager));
    let handle = tokio::spawn(router.run(bus.subscribe()));
    (ws_manager, bus, handle)
}

/// Receive the next text frame from a connection and parse it as JSON.
async fn next_json(
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<Message>,
) -> serde_json::Value {
    let msg = tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for WebSocket message")
        .expect("connection channel closed");
    match msg {
        Message::Text(text) => serde_json::from_str(&text).expect("frame must be valid JSON"),
        other => panic!("expected Text frame, got: {other:?}"),
    }
}

#[tokio::test]
async fn run_event_is_delivered_to_the_submitting_user() {
    let (ws_manager, bus, _handle) = setup();

    let mut rx = ws_manager.add("conn-1".to_string(), Some(1)).await;

    bus.publish(
        RunEvent::new(EVENT_RUN_SUCCEEDED, 1, "Weekly Import")
            .with_payload(serde_json::json!({ "duration_ms": 1200 })),
    );

    let frame = next_json(&mut rx).await;
    assert_eq!(frame["type"], MSG_TYPE_RUN_SUCCEEDED);
    assert_eq!(frame["flow"], "Weekly Import");
    assert_eq!(frame["payload"]["duration_ms"], 1200);
    assert!(frame["timestamp"].is_string());
}

#[tokio::test]
async fn other_users_do_not_receive_the_event() {
    let (ws_manager, bus, _handle) = setup();

    let mut rx_owner = ws_manager.add("conn-owner".to_string(), Some(1)).await;
    let mut rx_other = ws_manager.add("conn-other".to_string(), Some(2)).await;

    bus.publish(RunEvent::new(EVENT_RUN_CANCELLED, 1, "flow"));

    let frame = next_json(&mut rx_owner).await;
    assert_eq!(frame["type"], MSG_TYPE_RUN_CANCELLED);

    assert!(
        rx_other.try_recv().is_err(),
        "user 2 must not see user 1's run events"
    );
}

#[tokio::test]
async fn every_connection_of_the_user_receives_the_event() {
    let (ws_manager, bus, _handle) = setup();

    // Same user with two tabs open.
    let mut rx_a = ws_manager.add("conn-a".to_string(), Some(3)).await;
    let mut rx_b = ws_manager.add("conn-b".to_string(), Some(3)).await;

    bus.publish(RunEvent::new(EVENT_RUN_SUCCEEDED, 3, "flow"));

    assert_eq!(next_json(&mut rx_a).await["type"], MSG_TYPE_RUN_SUCCEEDED);
    assert_eq!(next_json(&mut rx_b).await["type"], MSG_TYPE_RUN_SUCCEEDED);
}

#[tokio::test]
async fn router_shuts_down_when_bus_is_dropped() {
    let (_ws_manager, bus, handle) = setup();

    drop(bus);

    tokio::time::timeout(RECV_TIMEOUT, handle)
        .await
        .expect("router should exit when the bus closes")
        .expect("router task should not panic");
}
