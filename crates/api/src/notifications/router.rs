//! Event-to-WebSocket routing.
//!
//! [`NotificationRouter`] consumes [`RunEvent`]s from the broadcast channel
//! and pushes each one, as a JSON text frame, to every connection owned by
//! the user whose run produced it.

use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::broadcast;

use flowrunner_core::run_events::ws_message_type;
use flowrunner_events::RunEvent;

use crate::ws::WsManager;

/// Routes run events to user WebSocket connections.
pub struct NotificationRouter {
    ws_manager: Arc<WsManager>,
}

impl NotificationRouter {
    /// Create a new router over the given WebSocket manager.
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each event.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](flowrunner_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<RunEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Push a single event to the submitting user's connections.
    async fn route_event(&self, event: &RunEvent) {
        let Some(msg_type) = ws_message_type(&event.event_type) else {
            tracing::debug!(event_type = %event.event_type, "Not a run event, skipping");
            return;
        };

        let msg = serde_json::json!({
            "type": msg_type,
            "flow": event.flow_name,
            "payload": event.payload,
            "timestamp": event.timestamp,
        });

        let delivered = self
            .ws_manager
            .send_to_user(event.user_id, Message::Text(msg.to_string().into()))
            .await;

        tracing::debug!(
            user_id = event.user_id,
            event_type = %event.event_type,
            delivered,
            "Run event routed"
        );
    }
}
