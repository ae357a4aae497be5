//! Handlers for the `/admin` resource (user management and flow assignment).
//!
//! All handlers require the `admin` role via [`RequireAdmin`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use flowrunner_core::error::CoreError;
use flowrunner_core::types::DbId;
use flowrunner_db::models::flow::FlowSummary;
use flowrunner_db::models::user::{CreateUser, UpdateUser, User, UserResponse};
use flowrunner_db::repositories::{FlowRepo, RoleRepo, UserRepo};

use crate::auth::password::{hash_password, validate_password_strength};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

/// Minimum password length enforced on user creation and password change.
const MIN_PASSWORD_LENGTH: usize = 12;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/users`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    pub password: String,
    pub role_id: DbId,
}

/// Request body for `PUT /admin/users/{id}`.
///
/// All fields are optional; a present `password` is re-validated for
/// strength and re-hashed.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub password: Option<String>,
    pub role_id: Option<DbId>,
    pub is_active: Option<bool>,
}

/// Request body for `PUT /admin/users/{id}/flows`.
#[derive(Debug, Deserialize)]
pub struct AssignFlowsRequest {
    pub flow_ids: Vec<DbId>,
}

/// Single user with their assigned flows, returned by `GET /admin/users/{id}`.
#[derive(Debug, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: UserResponse,
    pub flows: Vec<FlowSummary>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/users
///
/// Create a new user. Validates password strength, hashes it, and returns
/// a safe [`UserResponse`] with 201 Created.
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let hashed = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let create_dto = CreateUser {
        email: input.email.trim().to_lowercase(),
        password_hash: hashed,
        role_id: input.role_id,
    };

    let user = UserRepo::create(&state.pool, &create_dto).await?;
    let response = user_to_response(&state, &user).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/admin/users
///
/// List all users with resolved role names.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = UserRepo::list(&state.pool).await?;

    // Pre-fetch all roles to avoid N+1 queries.
    let roles = RoleRepo::list(&state.pool).await?;

    let responses: Vec<UserResponse> = users
        .iter()
        .map(|u| {
            let role_name = roles
                .iter()
                .find(|r| r.id == u.role_id)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "unknown".to_string());
            build_user_response(u, role_name)
        })
        .collect();

    Ok(Json(responses))
}

/// GET /api/v1/admin/users/{id}
///
/// Get a single user by ID, including their assigned flows.
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserDetail>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    let flows = FlowRepo::list_for_user(&state.pool, id).await?;
    let response = user_to_response(&state, &user).await?;

    Ok(Json(UserDetail {
        user: response,
        flows,
    }))
}

/// PUT /api/v1/admin/users/{id}
///
/// Update a user's profile fields; changes the password when one is given.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    let update_dto = UpdateUser {
        email: input.email.map(|e| e.trim().to_lowercase()),
        role_id: input.role_id,
        is_active: input.is_active,
    };

    let user = UserRepo::update(&state.pool, id, &update_dto)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    if let Some(password) = input.password {
        validate_password_strength(&password, MIN_PASSWORD_LENGTH)
            .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

        let hashed = hash_password(&password)
            .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
        UserRepo::update_password(&state.pool, id, &hashed).await?;
    }

    let response = user_to_response(&state, &user).await?;
    Ok(Json(response))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Hard-delete a user. Flow assignments and sessions cascade. Returns 204.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = UserRepo::delete(&state.pool, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound { entity: "User", id }))
    }
}

/// PUT /api/v1/admin/users/{id}/flows
///
/// Replace the user's flow assignment set. Returns 204 No Content.
pub async fn assign_flows(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<AssignFlowsRequest>,
) -> AppResult<StatusCode> {
    // The user must exist; unknown flow ids fail the transaction below.
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    FlowRepo::replace_assignments(&state.pool, id, &input.flow_ids).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Convert a [`User`] row into a safe [`UserResponse`] by resolving the role name.
async fn user_to_response(state: &AppState, user: &User) -> AppResult<UserResponse> {
    let role_name = RoleRepo::resolve_name(&state.pool, user.role_id).await?;
    Ok(build_user_response(user, role_name))
}

/// Build a [`UserResponse`] from a [`User`] and a pre-resolved role name.
fn build_user_response(user: &User, role: String) -> UserResponse {
    UserResponse {
        id: user.id,
        email: user.email.clone(),
        role,
        role_id: user.role_id,
        is_active: user.is_active,
        last_login_at: user.last_login_at,
        created_at: user.created_at,
    }
}
