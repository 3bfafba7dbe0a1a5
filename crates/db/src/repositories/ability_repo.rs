//! Repository for the `ability_ratings` table (full-replace).

use sqlx::{PgPool, Postgres, QueryBuilder};

use dexhub_core::records::AbilityRatingRecord;

use crate::models::AbilityRatingRow;
use crate::repositories::{batch_count, batch_pause};

const COLUMNS: &str = "id, ability_id, name, rating, competitive_desc, flags";

pub struct AbilityRepo;

impl AbilityRepo {
    pub async fn replace_all(
        pool: &PgPool,
        records: &[AbilityRatingRecord],
        batch_size: usize,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM ability_ratings")
            .execute(&mut *tx)
            .await?;

        let batches = batch_count(records.len(), batch_size);
        let mut written = 0u64;
        for (index, chunk) in records.chunks(batch_size.max(1)).enumerate() {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO ability_ratings (ability_id, name, rating, competitive_desc, flags) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(&r.ability_id)
                    .push_bind(&r.name)
                    .push_bind(r.rating)
                    .push_bind(&r.competitive_desc)
                    .push_bind(&r.flags);
            });
            written += qb.build().execute(&mut *tx).await?.rows_affected();
            batch_pause(index, batches).await;
        }

        tx.commit().await?;
        Ok(written)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<AbilityRatingRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM ability_ratings ORDER BY ability_id");
        sqlx::query_as::<_, AbilityRatingRow>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM ability_ratings")
            .fetch_one(pool)
            .await
    }
}
