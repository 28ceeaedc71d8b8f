//! Database query functions for the `user_pantry` table.

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use chrono::{Days, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{PantryItem, PantryItemDetail};

/// Columns selected for [`PantryItemDetail`] rows.
const DETAIL_SELECT: &str = "SELECT p.id, p.user_id, p.ingredient_id, i.name AS ingredient_name, \
            i.unit, p.quantity, p.expiry_date \
     FROM user_pantry p \
     JOIN ingredients i ON i.id = p.ingredient_id";

/// Add a stock row to a user's pantry. Rows are never merged, so the same
/// ingredient may appear several times.
pub async fn insert_pantry_item(
    pool: &PgPool,
    user_id: Uuid,
    ingredient_id: Uuid,
    quantity: &BigDecimal,
    expiry_date: Option<NaiveDate>,
) -> Result<PantryItem> {
    let item = sqlx::query_as::<_, PantryItem>(
        "INSERT INTO user_pantry (user_id, ingredient_id, quantity, expiry_date) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(user_id)
    .bind(ingredient_id)
    .bind(quantity)
    .bind(expiry_date)
    .fetch_one(pool)
    .await
    .context("failed to insert pantry item")?;

    Ok(item)
}

/// List a user's pantry with ingredient names and canonical units.
pub async fn list_pantry_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<PantryItemDetail>> {
    let query = format!("{DETAIL_SELECT} WHERE p.user_id = $1 ORDER BY i.name, p.added_at");
    let items = sqlx::query_as::<_, PantryItemDetail>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("failed to list pantry")?;

    Ok(items)
}

/// List pantry rows whose expiry date falls within `[today, today + within_days]`,
/// soonest first. Rows without an expiry date never match.
pub async fn list_expiring_soon(
    pool: &PgPool,
    user_id: Uuid,
    today: NaiveDate,
    within_days: u32,
) -> Result<Vec<PantryItemDetail>> {
    let horizon = today
        .checked_add_days(Days::new(u64::from(within_days)))
        .with_context(|| format!("expiry horizon overflows: {today} + {within_days} days"))?;

    let query = format!(
        "{DETAIL_SELECT} \
         WHERE p.user_id = $1 AND p.expiry_date >= $2 AND p.expiry_date <= $3 \
         ORDER BY p.expiry_date, i.name"
    );
    let items = sqlx::query_as::<_, PantryItemDetail>(&query)
        .bind(user_id)
        .bind(today)
        .bind(horizon)
        .fetch_all(pool)
        .await
        .context("failed to list expiring pantry items")?;

    Ok(items)
}

/// Delete one pantry row belonging to `user_id`.
pub async fn delete_pantry_item(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM user_pantry WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("failed to delete pantry item")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("pantry item {id} not found");
    }

    Ok(())
}
