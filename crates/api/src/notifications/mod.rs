//! Notification routing infrastructure.
//!
//! The [`NotificationRouter`] subscribes to the event bus and forwards run
//! lifecycle events to the submitting user's WebSocket connections.

pub mod router;

pub use router::NotificationRouter;
