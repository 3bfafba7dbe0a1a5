//! Repository for the `type_effectiveness` table (full-replace).

use sqlx::{PgPool, Postgres, QueryBuilder};

use dexhub_core::records::TypeEffectivenessRecord;

use crate::models::TypeEffectivenessRow;
use crate::repositories::{batch_count, batch_pause};

/// Column list for SELECT queries.
const COLUMNS: &str = "id, attacking_type, defending_type, multiplier";

pub struct TypeEffectivenessRepo;

impl TypeEffectivenessRepo {
    /// Replace the whole table with `records`, inside one transaction.
    ///
    /// Returns the number of rows inserted.
    pub async fn replace_all(
        pool: &PgPool,
        records: &[TypeEffectivenessRecord],
        batch_size: usize,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM type_effectiveness")
            .execute(&mut *tx)
            .await?;

        let batches = batch_count(records.len(), batch_size);
        let mut written = 0u64;
        for (index, chunk) in records.chunks(batch_size.max(1)).enumerate() {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO type_effectiveness (attacking_type, defending_type, multiplier) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(&r.attacking_type)
                    .push_bind(&r.defending_type)
                    .push_bind(r.multiplier);
            });
            written += qb.build().execute(&mut *tx).await?.rows_affected();
            batch_pause(index, batches).await;
        }

        tx.commit().await?;
        Ok(written)
    }

    /// The full chart, ordered for stable API output.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<TypeEffectivenessRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM type_effectiveness \
             ORDER BY attacking_type, defending_type"
        );
        sqlx::query_as::<_, TypeEffectivenessRow>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM type_effectiveness")
            .fetch_one(pool)
            .await
    }
}
