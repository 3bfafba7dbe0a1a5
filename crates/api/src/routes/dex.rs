//! Read routes for the synced reference data.
//!
//! Every handler goes through the shared [`QueryOptimizer`] so
//! responses are cached, retried, and measured uniformly. Cache TTLs
//! reflect how often each dataset actually changes: the type chart is
//! effectively static, tiers move with the metagame.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use dexhub_db::metrics::MetricsSnapshot;
use dexhub_db::models::{
    AbilityRatingRow, CompetitiveTierRow, ItemShowdownRow, LearnsetRow, MoveCompetitiveRow,
    TypeEffectivenessRow,
};
use dexhub_db::optimizer::QueryOptions;
use dexhub_db::repositories::{
    AbilityRepo, ItemRepo, LearnsetRepo, MoveRepo, TierRepo, TypeEffectivenessRepo,
};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const TYPECHART_TTL: Duration = Duration::from_secs(3600);
const TIERS_TTL: Duration = Duration::from_secs(600);
const LEARNSETS_TTL: Duration = Duration::from_secs(600);
const MOVES_TTL: Duration = Duration::from_secs(1800);
const ABILITIES_TTL: Duration = Duration::from_secs(1800);
const ITEMS_TTL: Duration = Duration::from_secs(1800);

/// GET /dex/typechart -- the full attacking x defending matrix.
async fn get_typechart(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TypeEffectivenessRow>>> {
    let pool = state.pool.clone();
    let rows = state
        .optimizer
        .run(
            "type_effectiveness",
            move || {
                let pool = pool.clone();
                async move { TypeEffectivenessRepo::list_all(&pool).await }
            },
            QueryOptions::cached("typechart:all", TYPECHART_TTL),
        )
        .await?;
    Ok(Json(rows))
}

/// GET /dex/tiers/{pokemon} -- tier placements for one species.
async fn get_tiers(
    State(state): State<AppState>,
    Path(pokemon): Path<String>,
) -> AppResult<Json<CompetitiveTierRow>> {
    let key = pokemon.trim().to_lowercase();
    if key.is_empty() {
        return Err(AppError::BadRequest("Empty pokemon key".into()));
    }

    let pool = state.pool.clone();
    let lookup = key.clone();
    let row = state
        .optimizer
        .run(
            "competitive_tiers",
            move || {
                let pool = pool.clone();
                let lookup = lookup.clone();
                async move { TierRepo::get_by_pokemon(&pool, &lookup).await }
            },
            QueryOptions::cached(format!("tiers:{key}"), TIERS_TTL),
        )
        .await?;

    row.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No tier data for '{key}'")))
}

/// GET /dex/learnsets/{pokemon} -- learnable moves for one species.
///
/// A species with no rows returns an empty list, not a 404; absence of
/// learnset data is not distinguishable from an empty learnset here.
async fn get_learnsets(
    State(state): State<AppState>,
    Path(pokemon): Path<String>,
) -> AppResult<Json<Vec<LearnsetRow>>> {
    let key = pokemon.trim().to_lowercase();
    if key.is_empty() {
        return Err(AppError::BadRequest("Empty pokemon key".into()));
    }

    let pool = state.pool.clone();
    let lookup = key.clone();
    let rows = state
        .optimizer
        .run(
            "learnsets",
            move || {
                let pool = pool.clone();
                let lookup = lookup.clone();
                async move { LearnsetRepo::list_by_pokemon(&pool, &lookup).await }
            },
            QueryOptions::cached(format!("learnsets:{key}"), LEARNSETS_TTL),
        )
        .await?;
    Ok(Json(rows))
}

/// GET /dex/moves -- the full move list in sequential-id order.
async fn get_moves(State(state): State<AppState>) -> AppResult<Json<Vec<MoveCompetitiveRow>>> {
    let pool = state.pool.clone();
    let rows = state
        .optimizer
        .run(
            "moves_competitive",
            move || {
                let pool = pool.clone();
                async move { MoveRepo::list_all(&pool).await }
            },
            QueryOptions::cached("moves:all", MOVES_TTL),
        )
        .await?;
    Ok(Json(rows))
}

/// GET /dex/abilities -- ability ratings, best first.
async fn get_abilities(State(state): State<AppState>) -> AppResult<Json<Vec<AbilityRatingRow>>> {
    let pool = state.pool.clone();
    let rows = state
        .optimizer
        .run(
            "ability_ratings",
            move || {
                let pool = pool.clone();
                async move { AbilityRepo::list_all(&pool).await }
            },
            QueryOptions::cached("abilities:all", ABILITIES_TTL),
        )
        .await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
struct ItemsQuery {
    category: Option<String>,
}

/// GET /dex/items -- the item catalog, optionally narrowed with
/// `?category=berries` etc.
async fn get_items(
    State(state): State<AppState>,
    Query(query): Query<ItemsQuery>,
) -> AppResult<Json<Vec<ItemShowdownRow>>> {
    let category = query
        .category
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty());

    let pool = state.pool.clone();
    let cache_key = match &category {
        Some(c) => format!("items:category:{c}"),
        None => "items:all".to_string(),
    };

    let rows = state
        .optimizer
        .run(
            "items_showdown",
            move || {
                let pool = pool.clone();
                let category = category.clone();
                async move {
                    match category {
                        Some(c) => ItemRepo::list_by_category(&pool, &c).await,
                        None => ItemRepo::list_all(&pool).await,
                    }
                }
            },
            QueryOptions::cached(cache_key, ITEMS_TTL),
        )
        .await?;
    Ok(Json(rows))
}

/// Optimizer observability payload.
#[derive(Serialize)]
struct StatsResponse {
    /// Live entries in the query cache.
    cache_entries: usize,
    #[serde(flatten)]
    metrics: MetricsSnapshot,
}

/// GET /dex/stats -- per-table query metrics, recent slow queries, and
/// recent failures. Read-only, in-memory, no database round trip.
async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache_entries: state.optimizer.cache_len(),
        metrics: state.optimizer.metrics_snapshot(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/typechart", get(get_typechart))
        .route("/tiers/{pokemon}", get(get_tiers))
        .route("/learnsets/{pokemon}", get(get_learnsets))
        .route("/moves", get(get_moves))
        .route("/abilities", get(get_abilities))
        .route("/items", get(get_items))
        .route("/stats", get(get_stats))
}
