//! Flow script execution.
//!
//! [`flow::FlowScript`] spawns the external automation script with a flow
//! name and a data file as arguments. All subprocess management (I/O
//! capture, timeout, cancellation) is pure and lives here for isolation
//! and testability.

pub mod flow;
pub mod subprocess;
pub mod types;

pub use flow::FlowScript;
pub use types::{RunError, RunInput, RunOutput};
