//! Flow entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use flowrunner_core::types::{DbId, Timestamp};

/// A flow row from the `flows` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Flow {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Compact flow representation used in assignment lists.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FlowSummary {
    pub id: DbId,
    pub name: String,
}

/// DTO for creating a new flow.
#[derive(Debug, Deserialize)]
pub struct CreateFlow {
    pub name: String,
    pub description: Option<String>,
}

/// DTO for updating an existing flow. All fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateFlow {
    pub name: Option<String>,
    pub description: Option<String>,
}
