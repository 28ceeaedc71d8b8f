//! Database query functions for the `recipes` and `recipe_ingredients`
//! tables.

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{
    DietaryRestriction, IngredientCategory, Recipe, RecipeIngredient, RecipeIngredientDetail,
};

/// Default page size for [`search_recipes`].
pub const DEFAULT_PAGE_SIZE: i64 = 10;
/// Upper bound on the page size accepted by [`search_recipes`].
pub const MAX_PAGE_SIZE: i64 = 100;

/// Parameters for inserting a recipe row.
#[derive(Debug, Clone)]
pub struct NewRecipe<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub instructions: &'a str,
    pub prep_time: i32,
    pub cook_time: i32,
    pub servings: i32,
}

/// Insert a recipe. Works against a pool or an open transaction.
pub async fn insert_recipe<'e, E>(executor: E, new: &NewRecipe<'_>) -> Result<Recipe>
where
    E: PgExecutor<'e>,
{
    let recipe = sqlx::query_as::<_, Recipe>(
        "INSERT INTO recipes (name, description, instructions, prep_time, cook_time, servings) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.description)
    .bind(new.instructions)
    .bind(new.prep_time)
    .bind(new.cook_time)
    .bind(new.servings)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert recipe {:?}", new.name))?;

    Ok(recipe)
}

/// Link an ingredient to a recipe with a quantity in the given unit.
pub async fn insert_recipe_ingredient<'e, E>(
    executor: E,
    recipe_id: Uuid,
    ingredient_id: Uuid,
    quantity: &BigDecimal,
    unit: &str,
) -> Result<RecipeIngredient>
where
    E: PgExecutor<'e>,
{
    let link = sqlx::query_as::<_, RecipeIngredient>(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, quantity, unit) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(recipe_id)
    .bind(ingredient_id)
    .bind(quantity)
    .bind(unit)
    .fetch_one(executor)
    .await
    .context("failed to insert recipe ingredient")?;

    Ok(link)
}

/// Fetch a recipe by ID.
pub async fn get_recipe(pool: &PgPool, id: Uuid) -> Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch recipe")?;

    Ok(recipe)
}

/// List a recipe's ingredient lines joined with ingredient name and price.
pub async fn list_recipe_ingredients(
    pool: &PgPool,
    recipe_id: Uuid,
) -> Result<Vec<RecipeIngredientDetail>> {
    let lines = sqlx::query_as::<_, RecipeIngredientDetail>(
        "SELECT ri.id, ri.recipe_id, ri.ingredient_id, i.name AS ingredient_name, \
                i.category, ri.quantity, ri.unit, i.cost_per_unit \
         FROM recipe_ingredients ri \
         JOIN ingredients i ON i.id = ri.ingredient_id \
         WHERE ri.recipe_id = $1 \
         ORDER BY i.name, ri.id",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .context("failed to list recipe ingredients")?;

    Ok(lines)
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Filters for [`search_recipes`]. Every `None`/empty field is ignored.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    /// Case-insensitive substring of the recipe name.
    pub name: Option<String>,
    /// Each entry must match (case-insensitive substring) some ingredient.
    pub ingredients: Vec<String>,
    pub dietary: Option<DietaryRestriction>,
    pub max_prep_time: Option<i32>,
    pub max_cook_time: Option<i32>,
    /// Bounds on the summed `quantity * cost_per_unit` of the recipe.
    pub min_cost: Option<BigDecimal>,
    pub max_cost: Option<BigDecimal>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Ingredient categories a dietary restriction rules out.
pub fn excluded_categories(dietary: DietaryRestriction) -> &'static [IngredientCategory] {
    match dietary {
        DietaryRestriction::Vegetarian => &[IngredientCategory::Meat, IngredientCategory::Fish],
        DietaryRestriction::Vegan => &[
            IngredientCategory::Meat,
            IngredientCategory::Fish,
            IngredientCategory::Dairy,
        ],
        DietaryRestriction::DairyFree => &[IngredientCategory::Dairy],
        _ => &[],
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE.
fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

const RECIPE_COST_SUBQUERY: &str = "(SELECT COALESCE(SUM(ri.quantity * i.cost_per_unit), 0) \
     FROM recipe_ingredients ri JOIN ingredients i ON i.id = ri.ingredient_id \
     WHERE ri.recipe_id = r.id)";

/// Build the search statement for a filter.
fn build_search_query(filter: &RecipeFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT r.* FROM recipes r WHERE TRUE");

    if let Some(name) = filter.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        qb.push(" AND r.name ILIKE ");
        qb.push_bind(contains_pattern(name));
    }

    for needle in filter.ingredients.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        qb.push(
            " AND EXISTS (SELECT 1 FROM recipe_ingredients ri \
             JOIN ingredients i ON i.id = ri.ingredient_id \
             WHERE ri.recipe_id = r.id AND i.name ILIKE ",
        );
        qb.push_bind(contains_pattern(needle));
        qb.push(")");
    }

    if let Some(dietary) = filter.dietary {
        let excluded: Vec<String> = excluded_categories(dietary)
            .iter()
            .map(|c| c.to_string())
            .collect();
        if !excluded.is_empty() {
            qb.push(
                " AND NOT EXISTS (SELECT 1 FROM recipe_ingredients ri \
                 JOIN ingredients i ON i.id = ri.ingredient_id \
                 WHERE ri.recipe_id = r.id AND i.category = ANY(",
            );
            qb.push_bind(excluded);
            qb.push("))");
        }
        if dietary == DietaryRestriction::GlutenFree {
            qb.push(
                " AND NOT EXISTS (SELECT 1 FROM recipe_ingredients ri \
                 JOIN ingredients i ON i.id = ri.ingredient_id \
                 WHERE ri.recipe_id = r.id \
                 AND (i.name ILIKE '%wheat%' OR i.name ILIKE '%gluten%'))",
            );
        }
    }

    if let Some(max) = filter.max_prep_time {
        qb.push(" AND r.prep_time <= ");
        qb.push_bind(max);
    }
    if let Some(max) = filter.max_cook_time {
        qb.push(" AND r.cook_time <= ");
        qb.push_bind(max);
    }
    if let Some(min) = filter.min_cost.clone() {
        qb.push(" AND ");
        qb.push(RECIPE_COST_SUBQUERY);
        qb.push(" >= ");
        qb.push_bind(min);
    }
    if let Some(max) = filter.max_cost.clone() {
        qb.push(" AND ");
        qb.push(RECIPE_COST_SUBQUERY);
        qb.push(" <= ");
        qb.push_bind(max);
    }

    let limit = filter
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = filter.offset.unwrap_or(0).max(0);

    qb.push(" ORDER BY r.created_at DESC, r.id LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);
    qb
}

/// Search recipes, newest first, one page at a time.
pub async fn search_recipes(pool: &PgPool, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
    let mut qb = build_search_query(filter);
    let recipes = qb
        .build_query_as::<Recipe>()
        .fetch_all(pool)
        .await
        .context("failed to search recipes")?;

    Ok(recipes)
}
