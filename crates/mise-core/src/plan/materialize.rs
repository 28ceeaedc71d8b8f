//! Plan materialization: persist a parsed meal plan as store rows.
//!
//! Everything happens inside one transaction. Either the plan, its recipes,
//! their ingredient links, any newly discovered ingredients and the meal
//! slots are all committed, or nothing is.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mise_db::models::{MealPlan, MeasurementUnit};
use mise_db::queries::recipes::NewRecipe;
use mise_db::queries::{ingredients, meal_plans, recipes};

use super::types::ParsedMealPlan;
use crate::error::StoreError;

/// Prep time recorded when the model omits one.
pub const DEFAULT_PREP_TIME_MINUTES: i32 = 30;
/// Cook time recorded when the model omits one.
pub const DEFAULT_COOK_TIME_MINUTES: i32 = 30;
/// Servings recorded when the model omits them.
pub const DEFAULT_SERVINGS: i32 = 4;

/// Canonical unit for a newly discovered ingredient. Unknown labels fall
/// back to `pieces`; the recipe line keeps the original label regardless.
pub fn canonical_unit(label: &str) -> MeasurementUnit {
    MeasurementUnit::from_alias(label).unwrap_or_else(|| {
        warn!(unit = label, "unrecognised unit, defaulting to pieces");
        MeasurementUnit::Pieces
    })
}

fn count_or(value: Option<u32>, default: i32) -> i32 {
    // The parser caps counts at i32::MAX.
    value.map_or(default, |v| v as i32)
}

/// Persist `plan` for `user_id` covering `start_date..=end_date`.
///
/// Ingredients are matched by exact name and created when absent (category
/// `other`, price 0). Recipe metadata the model omitted is filled from the
/// `DEFAULT_*` constants. The returned plan carries the recomputed
/// `total_cost` and `unpriced_ingredients`.
pub async fn materialize_meal_plan(
    pool: &PgPool,
    plan: &ParsedMealPlan,
    user_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<MealPlan, StoreError> {
    Ok(materialize(pool, plan, user_id, start_date, end_date).await?)
}

async fn materialize(
    pool: &PgPool,
    plan: &ParsedMealPlan,
    user_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<MealPlan> {
    if end_date < start_date {
        bail!("plan ends ({end_date}) before it starts ({start_date})");
    }
    let length = (end_date - start_date).num_days() + 1;
    if let Some(meal) = plan
        .meals
        .iter()
        .find(|m| m.day < 1 || i64::from(m.day) > length)
    {
        bail!("meal day {} lies outside a {length}-day plan", meal.day);
    }

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    // 1. The plan row, costed at zero until the links exist.
    let meal_plan = meal_plans::insert_meal_plan(&mut *tx, user_id, start_date, end_date).await?;

    // 2. Resolve every distinct ingredient by name, in name order, so
    // concurrent plans take row locks in the same sequence.
    let mut first_units: BTreeMap<&str, &str> = BTreeMap::new();
    for line in plan.meals.iter().flat_map(|m| &m.recipe.ingredients) {
        first_units.entry(line.name.as_str()).or_insert(line.unit.as_str());
    }

    let mut ingredient_ids: BTreeMap<&str, Uuid> = BTreeMap::new();
    let mut created_ingredients = 0usize;
    for (name, unit) in first_units {
        let (ingredient, created) =
            ingredients::get_or_create_ingredient(&mut *tx, name, canonical_unit(unit)).await?;
        if created {
            created_ingredients += 1;
            debug!(ingredient = %ingredient.name, "created ingredient");
        }
        ingredient_ids.insert(name, ingredient.id);
    }

    for meal in &plan.meals {
        let parsed = &meal.recipe;

        // 3. The recipe itself.
        let recipe = recipes::insert_recipe(
            &mut *tx,
            &NewRecipe {
                name: &parsed.name,
                description: &parsed.description,
                instructions: &parsed.instructions,
                prep_time: count_or(parsed.prep_time, DEFAULT_PREP_TIME_MINUTES),
                cook_time: count_or(parsed.cook_time, DEFAULT_COOK_TIME_MINUTES),
                servings: count_or(parsed.servings, DEFAULT_SERVINGS),
            },
        )
        .await?;

        // 4. One link per line, in the model's own unit.
        for line in &parsed.ingredients {
            let ingredient_id = ingredient_ids
                .get(line.name.as_str())
                .copied()
                .with_context(|| format!("ingredient {:?} was not resolved", line.name))?;
            recipes::insert_recipe_ingredient(
                &mut *tx,
                recipe.id,
                ingredient_id,
                &line.quantity,
                &line.unit,
            )
            .await
            .with_context(|| format!("recipe {:?}, ingredient {:?}", parsed.name, line.name))?;
        }

        // 5. The meal slot.
        meal_plans::insert_meal_plan_recipe(
            &mut *tx,
            meal_plan.id,
            recipe.id,
            meal.day as i32,
            &meal.meal_type,
        )
        .await?;
    }

    // 6. Cost the plan from its links.
    let meal_plan = meal_plans::recompute_total_cost(&mut *tx, meal_plan.id).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        meal_plan_id = %meal_plan.id,
        meals = plan.meals.len(),
        created_ingredients,
        total_cost = %meal_plan.total_cost,
        unpriced_ingredients = meal_plan.unpriced_ingredients,
        "materialized meal plan"
    );

    Ok(meal_plan)
}
