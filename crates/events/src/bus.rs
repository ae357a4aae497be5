//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`RunEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use flowrunner_core::types::DbId;

// ---------------------------------------------------------------------------
// RunEvent
// ---------------------------------------------------------------------------

/// A flow-run lifecycle event.
///
/// Constructed via [`RunEvent::new`] and enriched with
/// [`with_payload`](RunEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    /// Dot-separated event name, e.g. `"run.started"`.
    pub event_type: String,

    /// The user whose run produced this event.
    pub user_id: DbId,

    /// Name of the flow being run.
    pub flow_name: String,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl RunEvent {
    /// Create a new event for a user's run of the named flow.
    ///
    /// The payload defaults to an empty object.
    pub fn new(event_type: impl Into<String>, user_id: DbId, flow_name: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            user_id,
            flow_name: flow_name.into(),
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`RunEvent`].
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: RunEvent) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use flowrunner_core::run_events::EVENT_RUN_STARTED;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = RunEvent::new(EVENT_RUN_STARTED, 42, "Weekly Import")
            .with_payload(serde_json::json!({"file": "upload.csv"}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, EVENT_RUN_STARTED);
        assert_eq!(received.user_id, 42);
        assert_eq!(received.flow_name, "Weekly Import");
        assert_eq!(received.payload["file"], "upload.csv");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(RunEvent::new("run.succeeded", 7, "flow"));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.event_type, "run.succeeded");
        assert_eq!(e2.event_type, "run.succeeded");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers -- this must not panic.
        bus.publish(RunEvent::new("run.failed", 1, "orphan"));
    }

    #[test]
    fn default_event_has_empty_payload() {
        let event = RunEvent::new("run.cancelled", 3, "bare");
        assert_eq!(event.event_type, "run.cancelled");
        assert_eq!(event.user_id, 3);
        assert!(event.payload.is_object());
        assert!(event.payload.as_object().is_some_and(|o| o.is_empty()));
    }
}
