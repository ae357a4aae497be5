pub mod admin;
pub mod auth;
pub mod flows;
pub mod health;
pub mod runs;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                          WebSocket (token query param)
///
/// /auth/login                  login (public)
/// /auth/refresh                refresh (public)
/// /auth/logout                 logout (requires auth)
///
/// /admin/users                 list, create (admin only)
/// /admin/users/{id}            get, update, delete
/// /admin/users/{id}/flows      replace flow assignments (PUT)
///
/// /flows                       list (auth), create (admin)
/// /flows/{id}                  update, delete (admin)
///
/// /users/{id}/flows            flows assigned to a user (auth)
///
/// /runs                        trigger run (POST, multipart)
/// /runs/cancel                 cancel caller's run (POST)
/// /runs/active                 caller's active run (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket endpoint.
        .route("/ws", get(ws::ws_handler))
        // Authentication routes (login, refresh, logout).
        .nest("/auth", auth::router())
        // Admin routes (user management + flow assignment).
        .nest("/admin", admin::router())
        // Flow definitions.
        .nest("/flows", flows::router())
        // Per-user flow listing for the upload screen picker.
        .route("/users/{id}/flows", get(handlers::flows::user_flows))
        // Flow run trigger/cancel/status.
        .nest("/runs", runs::router())
}
