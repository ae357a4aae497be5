//! Handlers for the `/flows` resource and per-user flow listings.
//!
//! Reads are open to any authenticated user (the upload screen needs the
//! flow picker); writes require the `admin` role.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use flowrunner_core::error::CoreError;
use flowrunner_core::types::DbId;
use flowrunner_db::models::flow::{CreateFlow, Flow, FlowSummary, UpdateFlow};
use flowrunner_db::repositories::{FlowRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /flows`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFlowRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
    pub description: Option<String>,
}

/// Request body for `PUT /flows/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFlowRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/flows
///
/// List all flows.
pub async fn list_flows(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> AppResult<Json<DataResponse<Vec<Flow>>>> {
    let flows = FlowRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: flows }))
}

/// POST /api/v1/flows
///
/// Create a new flow. Duplicate names map to 409 via the unique constraint.
pub async fn create_flow(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateFlowRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Flow>>)> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let create_dto = CreateFlow {
        name: input.name,
        description: input.description,
    };
    let flow = FlowRepo::create(&state.pool, &create_dto).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: flow })))
}

/// PUT /api/v1/flows/{id}
///
/// Update a flow's name and/or description.
pub async fn update_flow(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateFlowRequest>,
) -> AppResult<Json<DataResponse<Flow>>> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let update_dto = UpdateFlow {
        name: input.name,
        description: input.description,
    };

    let flow = FlowRepo::update(&state.pool, id, &update_dto)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Flow", id }))?;

    Ok(Json(DataResponse { data: flow }))
}

/// DELETE /api/v1/flows/{id}
///
/// Delete a flow. User assignments cascade. Returns 204.
pub async fn delete_flow(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = FlowRepo::delete(&state.pool, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound { entity: "Flow", id }))
    }
}

/// GET /api/v1/users/{id}/flows
///
/// Flows assigned to a user. Feeds the flow picker on the upload screen.
pub async fn user_flows(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<FlowSummary>>>> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    let flows = FlowRepo::list_for_user(&state.pool, id).await?;
    Ok(Json(DataResponse { data: flows }))
}
