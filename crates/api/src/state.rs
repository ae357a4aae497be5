use std::sync::Arc;

use crate::config::ServerConfig;
use crate::runs::RunManager;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: flowrunner_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Per-user flow run lifecycle manager.
    pub run_manager: Arc<RunManager>,
    /// Event bus carrying run lifecycle events.
    pub event_bus: Arc<flowrunner_events::EventBus>,
}
