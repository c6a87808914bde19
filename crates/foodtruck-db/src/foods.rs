//! Database operations for the `foods` catalog table.

use foodtruck_core::{FoodQuery, FoodRecord};
use sqlx::PgPool;

use crate::contains_pattern;

/// List foods, optionally restricted to names containing `query.name()`
/// (case-insensitive). Ordered by `name ASC`.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn search_foods(
    pool: &PgPool,
    query: &FoodQuery,
) -> Result<Vec<FoodRecord>, sqlx::Error> {
    let names: Vec<(String,)> = if let Some(name) = query.name() {
        // Stored names cannot contain NUL.
        if name.contains('\0') {
            return Ok(Vec::new());
        }
        sqlx::query_as("SELECT name FROM foods WHERE name ILIKE $1 ESCAPE '\\' ORDER BY name ASC")
            .bind(contains_pattern(name))
            .fetch_all(pool)
            .await?
    } else {
        sqlx::query_as("SELECT name FROM foods ORDER BY name ASC")
            .fetch_all(pool)
            .await?
    };

    Ok(names
        .into_iter()
        .map(|(name,)| FoodRecord { name })
        .collect())
}
