//! Repository for the `items_showdown` table (full-replace).

use sqlx::{PgPool, Postgres, QueryBuilder};

use dexhub_core::records::ItemShowdownRecord;

use crate::models::ItemShowdownRow;
use crate::repositories::{batch_count, batch_pause};

const COLUMNS: &str = "\
    id, item_id, name, display_name, category, fling_power, \
    is_choice, is_nonstandard, competitive_data";

pub struct ItemRepo;

impl ItemRepo {
    pub async fn replace_all(
        pool: &PgPool,
        records: &[ItemShowdownRecord],
        batch_size: usize,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM items_showdown")
            .execute(&mut *tx)
            .await?;

        let batches = batch_count(records.len(), batch_size);
        let mut written = 0u64;
        for (index, chunk) in records.chunks(batch_size.max(1)).enumerate() {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO items_showdown \
                 (item_id, name, display_name, category, fling_power, \
                  is_choice, is_nonstandard, competitive_data) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(&r.item_id)
                    .push_bind(&r.name)
                    .push_bind(&r.display_name)
                    .push_bind(r.category.as_str())
                    .push_bind(r.fling_power)
                    .push_bind(r.is_choice)
                    .push_bind(r.is_nonstandard)
                    .push_bind(&r.competitive_data);
            });
            written += qb.build().execute(&mut *tx).await?.rows_affected();
            batch_pause(index, batches).await;
        }

        tx.commit().await?;
        Ok(written)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<ItemShowdownRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM items_showdown ORDER BY item_id");
        sqlx::query_as::<_, ItemShowdownRow>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_category(
        pool: &PgPool,
        category: &str,
    ) -> Result<Vec<ItemShowdownRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM items_showdown WHERE category = $1 ORDER BY item_id");
        sqlx::query_as::<_, ItemShowdownRow>(&query)
            .bind(category)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM items_showdown")
            .fetch_one(pool)
            .await
    }
}
