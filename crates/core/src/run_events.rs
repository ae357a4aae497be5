//! Event names and WebSocket message types for flow-run lifecycle events.
//!
//! Bus subscribers match on the dot-separated event names; the notification
//! router translates them into the underscored message types pushed to
//! browser clients.

/// A flow script has been spawned for a user.
pub const EVENT_RUN_STARTED: &str = "run.started";

/// The script exited with code 0.
pub const EVENT_RUN_SUCCEEDED: &str = "run.succeeded";

/// The script exited non-zero or exceeded its timeout.
pub const EVENT_RUN_FAILED: &str = "run.failed";

/// The script could not be spawned or an I/O error interrupted it.
pub const EVENT_RUN_ERROR: &str = "run.error";

/// The run was cancelled by the user.
pub const EVENT_RUN_CANCELLED: &str = "run.cancelled";

/// WebSocket `type` field for a started run.
pub const MSG_TYPE_RUN_STARTED: &str = "run_started";

/// WebSocket `type` field for a successful run.
pub const MSG_TYPE_RUN_SUCCEEDED: &str = "run_succeeded";

/// WebSocket `type` field for a failed run.
pub const MSG_TYPE_RUN_FAILED: &str = "run_failed";

/// WebSocket `type` field for a run that errored before/while executing.
pub const MSG_TYPE_RUN_ERROR: &str = "run_error";

/// WebSocket `type` field for a cancelled run.
pub const MSG_TYPE_RUN_CANCELLED: &str = "run_cancelled";

/// Map a bus event name to the WebSocket message type sent to browsers.
///
/// Returns `None` for event names that are not run lifecycle events.
pub fn ws_message_type(event_type: &str) -> Option<&'static str> {
    match event_type {
        EVENT_RUN_STARTED => Some(MSG_TYPE_RUN_STARTED),
        EVENT_RUN_SUCCEEDED => Some(MSG_TYPE_RUN_SUCCEEDED),
        EVENT_RUN_FAILED => Some(MSG_TYPE_RUN_FAILED),
        EVENT_RUN_ERROR => Some(MSG_TYPE_RUN_ERROR),
        EVENT_RUN_CANCELLED => Some(MSG_TYPE_RUN_CANCELLED),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_event_maps_to_a_message_type() {
        for event in [
            EVENT_RUN_STARTED,
            EVENT_RUN_SUCCEEDED,
            EVENT_RUN_FAILED,
            EVENT_RUN_ERROR,
            EVENT_RUN_CANCELLED,
        ] {
            assert!(
                ws_message_type(event).is_some(),
                "event {event} must have a WebSocket message type"
            );
        }
    }

    #[test]
    fn unknown_event_maps_to_none() {
        assert_eq!(ws_message_type("user.created"), None);
        assert_eq!(ws_message_type(""), None);
    }

    #[test]
    fn message_types_are_unique() {
        let mut types = vec![
            MSG_TYPE_RUN_STARTED,
            MSG_TYPE_RUN_SUCCEEDED,
            MSG_TYPE_RUN_FAILED,
            MSG_TYPE_RUN_ERROR,
            MSG_TYPE_RUN_CANCELLED,
        ];
        types.sort();
        types.dedup();
        assert_eq!(types.len(), 5, "all message types must be unique");
    }
}
