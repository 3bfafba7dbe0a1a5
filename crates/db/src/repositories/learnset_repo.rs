//! Repository for the `learnsets` table (full-replace).

use sqlx::{PgPool, Postgres, QueryBuilder};

use dexhub_core::records::LearnsetRecord;

use crate::models::LearnsetRow;
use crate::repositories::{batch_count, batch_pause};

const COLUMNS: &str = "id, pokemon_key, move_key, generation, learn_method, level";

pub struct LearnsetRepo;

impl LearnsetRepo {
    pub async fn replace_all(
        pool: &PgPool,
        records: &[LearnsetRecord],
        batch_size: usize,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM learnsets").execute(&mut *tx).await?;

        let batches = batch_count(records.len(), batch_size);
        let mut written = 0u64;
        for (index, chunk) in records.chunks(batch_size.max(1)).enumerate() {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO learnsets (pokemon_key, move_key, generation, learn_method, level) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(&r.pokemon_key)
                    .push_bind(&r.move_key)
                    .push_bind(r.generation)
                    .push_bind(r.learn_method.as_str())
                    .push_bind(r.level);
            });
            written += qb.build().execute(&mut *tx).await?.rows_affected();
            batch_pause(index, batches).await;
        }

        tx.commit().await?;
        Ok(written)
    }

    pub async fn list_by_pokemon(
        pool: &PgPool,
        pokemon_key: &str,
    ) -> Result<Vec<LearnsetRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM learnsets WHERE pokemon_key = $1 \
             ORDER BY move_key, generation"
        );
        sqlx::query_as::<_, LearnsetRow>(&query)
            .bind(pokemon_key)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM learnsets")
            .fetch_one(pool)
            .await
    }

    /// Best-effort orphan cleanup: learnset rows for Pokémon that no
    /// longer exist in `competitive_tiers`. Returns rows removed.
    pub async fn delete_orphaned(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM learnsets \
             WHERE NOT EXISTS (\
                 SELECT 1 FROM competitive_tiers t \
                 WHERE t.pokemon_key = learnsets.pokemon_key\
             )",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
