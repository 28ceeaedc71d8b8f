//! Database query functions for the `user_preferences` and
//! `user_disliked_ingredients` tables.

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Cuisine, DietaryRestriction, UserPreference};

/// Create or replace a user's preferences. `weekly_budget = None` keeps the
/// stored budget (or the schema default of 150.00 for a new row).
pub async fn upsert_preference(
    pool: &PgPool,
    user_id: Uuid,
    dietary: DietaryRestriction,
    cuisine: Cuisine,
    weekly_budget: Option<&BigDecimal>,
) -> Result<UserPreference> {
    let preference = sqlx::query_as::<_, UserPreference>(
        "INSERT INTO user_preferences (user_id, dietary_restrictions, preferred_cuisines, weekly_budget) \
         VALUES ($1, $2, $3, COALESCE($4, 150.00)) \
         ON CONFLICT (user_id) DO UPDATE SET \
             dietary_restrictions = EXCLUDED.dietary_restrictions, \
             preferred_cuisines = EXCLUDED.preferred_cuisines, \
             weekly_budget = COALESCE($4, user_preferences.weekly_budget), \
             updated_at = now() \
         RETURNING *",
    )
    .bind(user_id)
    .bind(dietary)
    .bind(cuisine)
    .bind(weekly_budget)
    .fetch_one(pool)
    .await
    .context("failed to upsert user preferences")?;

    Ok(preference)
}

/// Fetch a user's preferences, if any have been recorded.
pub async fn get_preference(pool: &PgPool, user_id: Uuid) -> Result<Option<UserPreference>> {
    let preference =
        sqlx::query_as::<_, UserPreference>("SELECT * FROM user_preferences WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch user preferences")?;

    Ok(preference)
}

/// Replace the set of ingredients a user dislikes.
///
/// The user must already have a preferences row. Runs in one transaction so
/// readers never see a half-replaced set.
pub async fn set_disliked_ingredients(
    pool: &PgPool,
    user_id: Uuid,
    ingredient_ids: &[Uuid],
) -> Result<()> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    sqlx::query("DELETE FROM user_disliked_ingredients WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .context("failed to clear disliked ingredients")?;

    for ingredient_id in ingredient_ids {
        sqlx::query(
            "INSERT INTO user_disliked_ingredients (user_id, ingredient_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(ingredient_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to record disliked ingredient {ingredient_id}"))?;
    }

    tx.commit().await.context("failed to commit transaction")?;
    Ok(())
}

/// Names of the ingredients a user dislikes, sorted.
pub async fn list_disliked_ingredient_names(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT i.name FROM user_disliked_ingredients d \
         JOIN ingredients i ON i.id = d.ingredient_id \
         WHERE d.user_id = $1 \
         ORDER BY i.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list disliked ingredients")?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}
