//! Database query functions for the `meal_plans` and `meal_plan_recipes`
//! tables.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{
    MealPlan, MealPlanDetail, MealPlanRecipe, PlannedMealDetail, Recipe, RecipeIngredientDetail,
    RequiredLine,
};

/// Insert a new meal plan with a zero total cost.
pub async fn insert_meal_plan<'e, E>(
    executor: E,
    user_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<MealPlan>
where
    E: PgExecutor<'e>,
{
    let plan = sqlx::query_as::<_, MealPlan>(
        "INSERT INTO meal_plans (user_id, start_date, end_date) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(user_id)
    .bind(start_date)
    .bind(end_date)
    .fetch_one(executor)
    .await
    .context("failed to insert meal plan")?;

    Ok(plan)
}

/// Place a recipe on a day and meal slot of a plan.
pub async fn insert_meal_plan_recipe<'e, E>(
    executor: E,
    meal_plan_id: Uuid,
    recipe_id: Uuid,
    day: i32,
    meal_type: &str,
) -> Result<MealPlanRecipe>
where
    E: PgExecutor<'e>,
{
    let link = sqlx::query_as::<_, MealPlanRecipe>(
        "INSERT INTO meal_plan_recipes (meal_plan_id, recipe_id, day, meal_type) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(meal_plan_id)
    .bind(recipe_id)
    .bind(day)
    .bind(meal_type)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to link recipe {recipe_id} to day {day}"))?;

    Ok(link)
}

/// Fetch a meal plan by ID.
pub async fn get_meal_plan(pool: &PgPool, id: Uuid) -> Result<Option<MealPlan>> {
    let plan = sqlx::query_as::<_, MealPlan>("SELECT * FROM meal_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch meal plan")?;

    Ok(plan)
}

/// List a user's plans, newest first.
///
/// `from` keeps plans ending on or after that date; `until` keeps plans
/// starting on or before it.
pub async fn list_meal_plans_for_user(
    pool: &PgPool,
    user_id: Uuid,
    from: Option<NaiveDate>,
    until: Option<NaiveDate>,
) -> Result<Vec<MealPlan>> {
    let plans = sqlx::query_as::<_, MealPlan>(
        "SELECT * FROM meal_plans \
         WHERE user_id = $1 \
           AND ($2::date IS NULL OR end_date >= $2) \
           AND ($3::date IS NULL OR start_date <= $3) \
         ORDER BY created_at DESC, id",
    )
    .bind(user_id)
    .bind(from)
    .bind(until)
    .fetch_all(pool)
    .await
    .context("failed to list meal plans")?;

    Ok(plans)
}

/// List the recipe links of a plan, ordered by day then insertion.
pub async fn list_planned_meals<'e, E>(executor: E, meal_plan_id: Uuid) -> Result<Vec<MealPlanRecipe>>
where
    E: PgExecutor<'e>,
{
    let links = sqlx::query_as::<_, MealPlanRecipe>(
        "SELECT * FROM meal_plan_recipes \
         WHERE meal_plan_id = $1 \
         ORDER BY day, created_at, id",
    )
    .bind(meal_plan_id)
    .fetch_all(executor)
    .await
    .context("failed to list planned meals")?;

    Ok(links)
}

/// Every ingredient line the plan requires, one set per recipe link.
pub async fn list_required_lines(pool: &PgPool, meal_plan_id: Uuid) -> Result<Vec<RequiredLine>> {
    let lines = sqlx::query_as::<_, RequiredLine>(
        "SELECT i.name AS ingredient_name, ri.unit, ri.quantity, i.cost_per_unit \
         FROM meal_plan_recipes mpr \
         JOIN recipe_ingredients ri ON ri.recipe_id = mpr.recipe_id \
         JOIN ingredients i ON i.id = ri.ingredient_id \
         WHERE mpr.meal_plan_id = $1",
    )
    .bind(meal_plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list required ingredient lines")?;

    Ok(lines)
}

/// Re-derive `total_cost` and `unpriced_ingredients` from the plan's linked
/// recipe lines at current ingredient prices, and persist them.
pub async fn recompute_total_cost<'e, E>(executor: E, meal_plan_id: Uuid) -> Result<MealPlan>
where
    E: PgExecutor<'e>,
{
    let plan = sqlx::query_as::<_, MealPlan>(
        "UPDATE meal_plans SET \
             total_cost = COALESCE(( \
                 SELECT SUM(ri.quantity * i.cost_per_unit) \
                 FROM meal_plan_recipes mpr \
                 JOIN recipe_ingredients ri ON ri.recipe_id = mpr.recipe_id \
                 JOIN ingredients i ON i.id = ri.ingredient_id \
                 WHERE mpr.meal_plan_id = meal_plans.id), 0), \
             unpriced_ingredients = ( \
                 SELECT COUNT(DISTINCT i.id) \
                 FROM meal_plan_recipes mpr \
                 JOIN recipe_ingredients ri ON ri.recipe_id = mpr.recipe_id \
                 JOIN ingredients i ON i.id = ri.ingredient_id \
                 WHERE mpr.meal_plan_id = meal_plans.id AND i.cost_per_unit = 0), \
             updated_at = now() \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(meal_plan_id)
    .fetch_optional(executor)
    .await
    .context("failed to recompute meal plan cost")?;

    plan.with_context(|| format!("meal plan {meal_plan_id} not found"))
}

/// Load a plan with every meal's recipe and ingredient lines.
pub async fn get_meal_plan_detail(pool: &PgPool, id: Uuid) -> Result<Option<MealPlanDetail>> {
    let Some(plan) = get_meal_plan(pool, id).await? else {
        return Ok(None);
    };

    let links = list_planned_meals(pool, id).await?;
    let recipe_ids: Vec<Uuid> = links.iter().map(|l| l.recipe_id).collect();

    let recipes = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = ANY($1)")
        .bind(&recipe_ids)
        .fetch_all(pool)
        .await
        .context("failed to fetch planned recipes")?;
    let recipes: HashMap<Uuid, Recipe> = recipes.into_iter().map(|r| (r.id, r)).collect();

    let lines = sqlx::query_as::<_, RecipeIngredientDetail>(
        "SELECT ri.id, ri.recipe_id, ri.ingredient_id, i.name AS ingredient_name, \
                i.category, ri.quantity, ri.unit, i.cost_per_unit \
         FROM recipe_ingredients ri \
         JOIN ingredients i ON i.id = ri.ingredient_id \
         WHERE ri.recipe_id = ANY($1) \
         ORDER BY i.name, ri.id",
    )
    .bind(&recipe_ids)
    .fetch_all(pool)
    .await
    .context("failed to fetch planned recipe ingredients")?;
    let mut lines_by_recipe: HashMap<Uuid, Vec<RecipeIngredientDetail>> = HashMap::new();
    for line in lines {
        lines_by_recipe.entry(line.recipe_id).or_default().push(line);
    }

    let mut meals = Vec::with_capacity(links.len());
    for link in links {
        let recipe = match recipes.get(&link.recipe_id) {
            Some(r) => r.clone(),
            None => anyhow::bail!("recipe {} vanished while loading plan {id}", link.recipe_id),
        };
        let ingredients = lines_by_recipe
            .get(&link.recipe_id)
            .cloned()
            .unwrap_or_default();
        meals.push(PlannedMealDetail {
            day: link.day,
            meal_type: link.meal_type,
            recipe,
            ingredients,
        });
    }

    Ok(Some(MealPlanDetail { plan, meals }))
}
