//! Route definitions for the `/flows` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::flows;
use crate::state::AppState;

/// Routes mounted at `/flows`.
///
/// ```text
/// GET    /       -> list_flows (any authenticated user)
/// POST   /       -> create_flow (admin)
/// PUT    /{id}   -> update_flow (admin)
/// DELETE /{id}   -> delete_flow (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(flows::list_flows).post(flows::create_flow))
        .route(
            "/{id}",
            put(flows::update_flow).delete(flows::delete_flow),
        )
}
