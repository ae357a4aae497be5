//! Route definitions for the `/runs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::runs;
use crate::state::AppState;

/// Routes mounted at `/runs`. All require authentication.
///
/// ```text
/// POST /         -> trigger_run (multipart: file + flow_name)
/// POST /cancel   -> cancel_run
/// GET  /active   -> active_run
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(runs::trigger_run))
        .route("/cancel", post(runs::cancel_run))
        .route("/active", get(runs::active_run))
}
