//! Flowrunner event infrastructure.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`RunEvent`] -- the flow-run lifecycle event envelope.
//!
//! Run state is deliberately transient: events are fanned out to live
//! subscribers (the WebSocket notification router) and never persisted.

pub mod bus;

pub use bus::{EventBus, RunEvent};
