//! Handlers for the `/runs` resource: trigger, cancel, and inspect the
//! caller's flow run.
//!
//! A trigger is a multipart form carrying the data file and the flow name.
//! The upload is stored locally, then handed to the run manager; lifecycle
//! status is pushed over the WebSocket channel rather than held in the
//! HTTP response.

use std::path::PathBuf;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use flowrunner_core::error::CoreError;
use flowrunner_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAuth;
use crate::response::DataResponse;
use crate::runs::RunStatus;
use crate::state::AppState;

/// Accepted data file extensions (lowercase).
const ALLOWED_EXTENSIONS: &[&str] = &["csv", "xls", "xlsx"];

/// Accepted data file MIME types.
const ALLOWED_MIME_TYPES: &[&str] = &[
    "text/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/runs
///
/// Multipart form with a required `file` field (CSV/Excel) and a required
/// `flow_name` text field. Stores the upload and starts a run for the
/// caller. 201 with the run snapshot; 409 if the caller already has an
/// active run.
pub async fn trigger_run(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<RunStatus>>)> {
    let mut file_data: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut flow_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload.csv").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file_data = Some((filename, content_type, data.to_vec()));
            }
            "flow_name" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                flow_name = Some(text);
            }
            _ => {} // ignore unknown fields
        }
    }

    let flow_name = flow_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("Flow name is required.".into()))?;

    let (filename, content_type, data) = file_data.ok_or_else(|| {
        AppError::BadRequest("File upload failed. Please upload a valid file.".into())
    })?;

    validate_file_type(&filename, content_type.as_deref())?;

    let file_path = store_upload(&state, user.user_id, &filename, &data).await?;

    match state
        .run_manager
        .start(user.user_id, flow_name, file_path.clone())
        .await
    {
        Ok(status) => Ok((StatusCode::CREATED, Json(DataResponse { data: status }))),
        Err(e) => {
            // The run never started, so the upload is ours to clean up.
            if let Err(rm_err) = tokio::fs::remove_file(&file_path).await {
                tracing::warn!(error = %rm_err, "Failed to delete rejected upload");
            }
            Err(AppError::Core(CoreError::Conflict(e.to_string())))
        }
    }
}

/// POST /api/v1/runs/cancel
///
/// Cancel the caller's active run. 204 on success; 409 if nothing is running.
pub async fn cancel_run(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<StatusCode> {
    state
        .run_manager
        .cancel(user.user_id)
        .await
        .map_err(|e| AppError::Core(CoreError::Conflict(e.to_string())))?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/runs/active
///
/// The caller's active run snapshot, or 404 when idle.
pub async fn active_run(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> AppResult<Json<DataResponse<RunStatus>>> {
    let status = state
        .run_manager
        .active(user.user_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Run",
            id: user.user_id,
        }))?;

    Ok(Json(DataResponse { data: status }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Accept only CSV/Excel uploads, by extension or declared MIME type.
fn validate_file_type(filename: &str, content_type: Option<&str>) -> AppResult<()> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    let ext_ok = ALLOWED_EXTENSIONS.contains(&ext.as_str());
    let mime_ok = content_type.is_some_and(|m| ALLOWED_MIME_TYPES.contains(&m));

    if ext_ok || mime_ok {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Invalid file type. Only CSV and Excel files are allowed.".into(),
        ))
    }
}

/// Write the upload under the configured directory with a collision-free name.
async fn store_upload(
    state: &AppState,
    user_id: DbId,
    filename: &str,
    data: &[u8],
) -> AppResult<PathBuf> {
    let upload_dir = PathBuf::from(&state.config.runner.upload_dir);
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Cannot create upload directory: {e}")))?;

    let stored_name = format!(
        "{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        user_id,
        sanitize_filename(filename)
    );
    let file_path = upload_dir.join(stored_name);

    tokio::fs::write(&file_path, data)
        .await
        .map_err(|e| AppError::InternalError(format!("Cannot store upload: {e}")))?;

    Ok(file_path)
}

/// Strip path separators and shell-hostile characters from a client filename.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_extension_is_accepted() {
        assert!(validate_file_type("data.csv", None).is_ok());
        assert!(validate_file_type("DATA.CSV", None).is_ok());
    }

    #[test]
    fn excel_extensions_are_accepted() {
        assert!(validate_file_type("report.xls", None).is_ok());
        assert!(validate_file_type("report.xlsx", None).is_ok());
    }

    #[test]
    fn known_mime_type_rescues_odd_extension() {
        assert!(validate_file_type("export.data", Some("text/csv")).is_ok());
    }

    #[test]
    fn other_files_are_rejected() {
        assert!(validate_file_type("script.py", None).is_err());
        assert!(validate_file_type("archive.zip", Some("application/zip")).is_err());
        assert!(validate_file_type("noextension", None).is_err());
    }

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("weekly report.csv"), "weekly_report.csv");
        assert_eq!(sanitize_filename("plain-name_1.xlsx"), "plain-name_1.xlsx");
    }
}
