//! Repository for the `query_metrics` analytics table.
//!
//! Rows are appended by the query optimizer and pruned by the
//! periodic maintenance routine.

use sqlx::PgPool;

use dexhub_core::types::Timestamp;

pub struct QueryMetricRepo;

impl QueryMetricRepo {
    pub async fn insert(
        pool: &PgPool,
        table_name: &str,
        duration_ms: i64,
        success: bool,
        attempts: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO query_metrics (table_name, duration_ms, success, attempts) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(table_name)
        .bind(duration_ms)
        .bind(success)
        .bind(attempts)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Retention pruning. Returns the number of rows deleted.
    pub async fn delete_older_than(pool: &PgPool, cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM query_metrics WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
