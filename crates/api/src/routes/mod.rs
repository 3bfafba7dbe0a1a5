pub mod dex;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /dex/typechart            full type-effectiveness matrix
/// /dex/tiers/{pokemon}      competitive tiers for one species
/// /dex/learnsets/{pokemon}  learnable moves for one species
/// /dex/moves                full move list
/// /dex/abilities            ability ratings
/// /dex/items                item catalog (optional ?category= filter)
/// /dex/stats                query optimizer metrics
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/dex", dex::router())
}
