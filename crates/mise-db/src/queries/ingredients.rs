//! Database query functions for the `ingredients` table.
//!
//! `name` carries a UNIQUE constraint and is the identity key used by plan
//! materialization; [`get_or_create_ingredient`] relies on it to stay
//! duplicate-free under concurrent callers.

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{Ingredient, IngredientCategory, MeasurementUnit};

/// Parameters for inserting a fully specified ingredient.
#[derive(Debug, Clone)]
pub struct NewIngredient<'a> {
    pub name: &'a str,
    pub category: IngredientCategory,
    pub unit: MeasurementUnit,
    pub cost_per_unit: BigDecimal,
}

/// Insert a new ingredient. Fails if the name already exists.
pub async fn insert_ingredient(pool: &PgPool, new: &NewIngredient<'_>) -> Result<Ingredient> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        "INSERT INTO ingredients (name, category, unit, cost_per_unit) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.category)
    .bind(new.unit)
    .bind(&new.cost_per_unit)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert ingredient {:?}", new.name))?;

    Ok(ingredient)
}

/// Fetch an ingredient by ID.
pub async fn get_ingredient(pool: &PgPool, id: Uuid) -> Result<Option<Ingredient>> {
    let ingredient = sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch ingredient")?;

    Ok(ingredient)
}

/// Fetch an ingredient by its exact (case-sensitive) name.
pub async fn get_ingredient_by_name(pool: &PgPool, name: &str) -> Result<Option<Ingredient>> {
    let ingredient =
        sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await
            .with_context(|| format!("failed to fetch ingredient by name {name:?}"))?;

    Ok(ingredient)
}

/// List all ingredients, ordered by name.
pub async fn list_ingredients(pool: &PgPool) -> Result<Vec<Ingredient>> {
    let ingredients = sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients ORDER BY name")
        .fetch_all(pool)
        .await
        .context("failed to list ingredients")?;

    Ok(ingredients)
}

/// Look up an ingredient by exact name, creating it when absent.
///
/// New rows get `category = other`, the given `unit` and a zero price (the
/// price is unknown, not free). Returns `(ingredient, created)`.
///
/// The insert uses `ON CONFLICT (name) DO NOTHING`: when another transaction
/// holds an uncommitted row with the same name, Postgres blocks the insert
/// until that transaction finishes, and the follow-up select then sees the
/// committed row. Two concurrent callers therefore never produce two rows.
pub async fn get_or_create_ingredient(
    conn: &mut PgConnection,
    name: &str,
    unit: MeasurementUnit,
) -> Result<(Ingredient, bool)> {
    let inserted = sqlx::query_as::<_, Ingredient>(
        "INSERT INTO ingredients (name, category, unit, cost_per_unit) \
         VALUES ($1, 'other', $2, 0) \
         ON CONFLICT (name) DO NOTHING \
         RETURNING *",
    )
    .bind(name)
    .bind(unit)
    .fetch_optional(&mut *conn)
    .await
    .with_context(|| format!("failed to upsert ingredient {name:?}"))?;

    if let Some(ingredient) = inserted {
        return Ok((ingredient, true));
    }

    let existing = sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients WHERE name = $1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("failed to re-read ingredient {name:?}"))?;

    match existing {
        Some(ingredient) => Ok((ingredient, false)),
        // Only reachable if the conflicting row was deleted in between.
        None => anyhow::bail!("ingredient {name:?} vanished during get-or-create"),
    }
}

/// Set the price of an ingredient by name. Returns the updated row.
pub async fn set_cost_per_unit(
    pool: &PgPool,
    name: &str,
    cost_per_unit: &BigDecimal,
) -> Result<Ingredient> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        "UPDATE ingredients SET cost_per_unit = $1 WHERE name = $2 RETURNING *",
    )
    .bind(cost_per_unit)
    .bind(name)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to update price of ingredient {name:?}"))?;

    ingredient.with_context(|| format!("ingredient {name:?} not found"))
}
