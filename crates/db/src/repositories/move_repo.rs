//! Repository for the `moves_competitive` table (full-replace).

use sqlx::{PgPool, Postgres, QueryBuilder};

use dexhub_core::records::MoveCompetitiveRecord;

use crate::models::MoveCompetitiveRow;
use crate::repositories::{batch_count, batch_pause};

const COLUMNS: &str = "\
    id, sequential_id, name, move_type, power, accuracy, pp, priority, \
    category, target, flags, secondary_effect, description, \
    short_description, drain_ratio, recoil_ratio";

pub struct MoveRepo;

impl MoveRepo {
    pub async fn replace_all(
        pool: &PgPool,
        records: &[MoveCompetitiveRecord],
        batch_size: usize,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM moves_competitive")
            .execute(&mut *tx)
            .await?;

        let batches = batch_count(records.len(), batch_size);
        let mut written = 0u64;
        for (index, chunk) in records.chunks(batch_size.max(1)).enumerate() {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO moves_competitive \
                 (sequential_id, name, move_type, power, accuracy, pp, priority, \
                  category, target, flags, secondary_effect, description, \
                  short_description, drain_ratio, recoil_ratio) ",
            );
            qb.push_values(chunk, |mut b, r| {
                let secondary = r
                    .secondary_effect
                    .as_ref()
                    .and_then(|s| serde_json::to_value(s).ok());
                b.push_bind(r.sequential_id)
                    .push_bind(&r.name)
                    .push_bind(&r.move_type)
                    .push_bind(r.power)
                    .push_bind(r.accuracy)
                    .push_bind(r.pp)
                    .push_bind(r.priority)
                    .push_bind(&r.category)
                    .push_bind(&r.target)
                    .push_bind(serde_json::to_value(&r.flags).unwrap_or_default())
                    .push_bind(secondary)
                    .push_bind(&r.description)
                    .push_bind(&r.short_description)
                    .push_bind(r.drain_ratio)
                    .push_bind(r.recoil_ratio);
            });
            written += qb.build().execute(&mut *tx).await?.rows_affected();
            batch_pause(index, batches).await;
        }

        tx.commit().await?;
        Ok(written)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<MoveCompetitiveRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM moves_competitive ORDER BY sequential_id");
        sqlx::query_as::<_, MoveCompetitiveRow>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM moves_competitive")
            .fetch_one(pool)
            .await
    }
}
