//! Repository for the `prefats` table.

use freightdoc_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::prefat::{CreatePrefat, Prefat};

const COLUMNS: &str = "id, layout, source_url, prefat_base64, size_bytes, created_at";

pub struct PrefatRepo;

impl PrefatRepo {
    /// Store a received file and return the new row.
    pub async fn create<'e, E>(executor: E, input: &CreatePrefat) -> Result<Prefat, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO prefats (layout, source_url, prefat_base64, size_bytes)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prefat>(&query)
            .bind(&input.layout)
            .bind(&input.source_url)
            .bind(&input.prefat_base64)
            .bind(input.size_bytes)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<Prefat>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM prefats WHERE id = $1");
        sqlx::query_as::<_, Prefat>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List received files, newest first.
    pub async fn list<'e, E>(executor: E, limit: i64, offset: i64) -> Result<Vec<Prefat>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM prefats
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Prefat>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM prefats")
            .fetch_one(executor)
            .await
    }
}
