//! Repository for the `competitive_tiers` table (upsert on `pokemon_key`).

use sqlx::{PgPool, Postgres, QueryBuilder};

use dexhub_core::records::CompetitiveTierRecord;

use crate::models::CompetitiveTierRow;
use crate::repositories::{batch_count, batch_pause};

const COLUMNS: &str = "\
    id, pokemon_key, singles_tier, doubles_tier, national_dex_tier, updated_at";

pub struct TierRepo;

impl TierRepo {
    /// Upsert all records in batches, keyed on `pokemon_key`. Existing
    /// rows are updated in place; the table is never cleared.
    pub async fn upsert_all(
        pool: &PgPool,
        records: &[CompetitiveTierRecord],
        batch_size: usize,
    ) -> Result<u64, sqlx::Error> {
        let batches = batch_count(records.len(), batch_size);
        let mut written = 0u64;
        for (index, chunk) in records.chunks(batch_size.max(1)).enumerate() {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO competitive_tiers \
                 (pokemon_key, singles_tier, doubles_tier, national_dex_tier, updated_at) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(&r.pokemon_key)
                    .push_bind(&r.singles_tier)
                    .push_bind(&r.doubles_tier)
                    .push_bind(&r.national_dex_tier)
                    .push_bind(r.updated_at);
            });
            qb.push(
                " ON CONFLICT (pokemon_key) DO UPDATE SET \
                 singles_tier = EXCLUDED.singles_tier, \
                 doubles_tier = EXCLUDED.doubles_tier, \
                 national_dex_tier = EXCLUDED.national_dex_tier, \
                 updated_at = EXCLUDED.updated_at",
            );
            written += qb.build().execute(pool).await?.rows_affected();
            batch_pause(index, batches).await;
        }
        Ok(written)
    }

    pub async fn get_by_pokemon(
        pool: &PgPool,
        pokemon_key: &str,
    ) -> Result<Option<CompetitiveTierRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM competitive_tiers WHERE pokemon_key = $1");
        sqlx::query_as::<_, CompetitiveTierRow>(&query)
            .bind(pokemon_key)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<CompetitiveTierRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM competitive_tiers ORDER BY pokemon_key");
        sqlx::query_as::<_, CompetitiveTierRow>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM competitive_tiers")
            .fetch_one(pool)
            .await
    }
}
