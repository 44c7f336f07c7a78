use serde_json::Value;
use sqlx::{PgPool, types::Json};

use crate::errors::ControllerError;

/// Row-level access to a syncer's table, keyed by the object UID.
///
/// Implemented by [`SpecDb`] for PostgreSQL; the seam exists so the
/// teardown protocol can be exercised against an in-memory store.
pub(crate) trait SpecRowStore {
    /// Returns the stored payload for `id`, if any.
    async fn get_payload(&self, table: &str, id: &str)
    -> Result<Option<Value>, ControllerError>;

    async fn upsert(&self, table: &str, id: &str, payload: &Value)
    -> Result<(), ControllerError>;

    /// Deletes the row for `id`. Deleting a row that does not exist is a
    /// success, the cleanup protocol is idempotent.
    async fn delete(&self, table: &str, id: &str) -> Result<(), ControllerError>;
}

/// Thin accessor around the shared PostgreSQL connection pool.
///
/// Every syncer owns one table in the `spec` schema, keyed by the object UID
/// and holding the serialized, status-stripped object as `jsonb`. The table
/// name is an adapter constant, never user input, so interpolating it into
/// the statement text is safe.
#[derive(Clone)]
pub(crate) struct SpecDb {
    pool: PgPool,
}

impl SpecDb {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SpecRowStore for SpecDb {
    async fn get_payload(
        &self,
        table: &str,
        id: &str,
    ) -> Result<Option<Value>, ControllerError> {
        let payload: Option<Json<Value>> = sqlx::query_scalar(&select_statement(table))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payload.map(|Json(payload)| payload))
    }

    async fn upsert(
        &self,
        table: &str,
        id: &str,
        payload: &Value,
    ) -> Result<(), ControllerError> {
        sqlx::query(&upsert_statement(table))
            .bind(id)
            .bind(Json(payload))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), ControllerError> {
        sqlx::query(&delete_statement(table))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn select_statement(table: &str) -> String {
    format!("SELECT payload FROM spec.{} WHERE id = $1", table)
}

fn upsert_statement(table: &str) -> String {
    format!(
        "INSERT INTO spec.{} (id, payload) VALUES ($1, $2::jsonb) \
         ON CONFLICT (id) DO UPDATE SET payload = $2::jsonb, updated_at = now()",
        table
    )
}

fn delete_statement(table: &str) -> String {
    format!("DELETE FROM spec.{} WHERE id = $1", table)
}
