//! Repository for the `flows` and `user_flows` tables.

use sqlx::PgPool;

use flowrunner_core::types::DbId;

use crate::models::flow::{CreateFlow, Flow, FlowSummary, UpdateFlow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Provides CRUD operations for flows and their user assignments.
pub struct FlowRepo;

impl FlowRepo {
    /// Insert a new flow, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateFlow) -> Result<Flow, sqlx::Error> {
        let query = format!(
            "INSERT INTO flows (name, description)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Flow>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a flow by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Flow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM flows WHERE id = $1");
        sqlx::query_as::<_, Flow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all flows ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Flow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM flows ORDER BY name ASC");
        sqlx::query_as::<_, Flow>(&query).fetch_all(pool).await
    }

    /// Update a flow. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateFlow,
    ) -> Result<Option<Flow>, sqlx::Error> {
        let query = format!(
            "UPDATE flows SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Flow>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a flow. User assignments cascade.
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM flows WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flows assigned to a user, ordered by name.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<FlowSummary>, sqlx::Error> {
        sqlx::query_as::<_, FlowSummary>(
            "SELECT flows.id, flows.name FROM user_flows
             JOIN flows ON user_flows.flow_id = flows.id
             WHERE user_flows.user_id = $1
             ORDER BY flows.name ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Replace a user's flow assignments with the given set.
    ///
    /// Runs delete-then-insert in a single transaction so a failed insert
    /// (e.g. unknown flow id) leaves the previous assignments intact.
    pub async fn replace_assignments(
        pool: &PgPool,
        user_id: DbId,
        flow_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM user_flows WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for flow_id in flow_ids {
            sqlx::query("INSERT INTO user_flows (user_id, flow_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(flow_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await
    }
}
