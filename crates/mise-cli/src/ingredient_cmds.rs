//! CLI handlers for `mise ingredient` subcommands.
//!
//! Implements:
//! - `mise ingredient add`   -- add a fully specified ingredient
//! - `mise ingredient list`  -- list the catalogue in table format
//! - `mise ingredient price` -- set an ingredient's price

use anyhow::{Context, Result};
use sqlx::PgPool;

use mise_db::models::{IngredientCategory, MeasurementUnit};
use mise_db::queries::ingredients::{self, NewIngredient};

use crate::IngredientCommands;
use crate::resolve::parse_decimal;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch an `IngredientCommands` variant to the appropriate handler.
pub async fn run_ingredient_command(command: IngredientCommands, pool: &PgPool) -> Result<()> {
    match command {
        IngredientCommands::Add {
            name,
            category,
            unit,
            cost,
        } => cmd_add(pool, &name, &category, &unit, &cost).await,
        IngredientCommands::List => cmd_list(pool).await,
        IngredientCommands::Price { name, cost } => cmd_price(pool, &name, &cost).await,
    }
}

// -----------------------------------------------------------------------
// mise ingredient add
// -----------------------------------------------------------------------

async fn cmd_add(pool: &PgPool, name: &str, category: &str, unit: &str, cost: &str) -> Result<()> {
    let category: IngredientCategory = category.parse().map_err(|_| {
        anyhow::anyhow!(
            "invalid category {category:?}; expected one of: {}",
            IngredientCategory::ALL.map(IngredientCategory::as_str).join(", "),
        )
    })?;
    let unit = MeasurementUnit::from_alias(unit).ok_or_else(|| {
        anyhow::anyhow!(
            "invalid unit {unit:?}; expected one of: {}",
            MeasurementUnit::ALL.map(MeasurementUnit::as_str).join(", "),
        )
    })?;
    let cost_per_unit = parse_decimal("cost", cost)?;

    let new = NewIngredient {
        name,
        category,
        unit,
        cost_per_unit,
    };
    let ingredient = ingredients::insert_ingredient(pool, &new)
        .await
        .with_context(|| format!("failed to add ingredient {name:?} (is the name already taken?)"))?;

    println!("Ingredient created:");
    println!("  ID:       {}", ingredient.id);
    println!("  Name:     {}", ingredient.name);
    println!("  Category: {}", ingredient.category);
    println!("  Unit:     {}", ingredient.unit);
    println!("  Cost:     {}", ingredient.cost_per_unit);

    Ok(())
}

// -----------------------------------------------------------------------
// mise ingredient list
// -----------------------------------------------------------------------

async fn cmd_list(pool: &PgPool) -> Result<()> {
    let all = ingredients::list_ingredients(pool).await?;

    if all.is_empty() {
        println!("No ingredients found. Use `mise ingredient add` or generate a plan.");
        return Ok(());
    }

    let name_w = all.iter().map(|i| i.name.len()).max().unwrap_or(4).max(4);
    let cat_w = all
        .iter()
        .map(|i| i.category.as_str().len())
        .max()
        .unwrap_or(8)
        .max(8);

    println!("{:<name_w$}  {:<cat_w$}  {:<6}  COST", "NAME", "CATEGORY", "UNIT");
    for ingredient in &all {
        let cost = if ingredient.cost_per_unit == bigdecimal::BigDecimal::from(0) {
            "unpriced".to_string()
        } else {
            ingredient.cost_per_unit.to_string()
        };
        println!(
            "{:<name_w$}  {:<cat_w$}  {:<6}  {}",
            ingredient.name,
            ingredient.category.as_str(),
            ingredient.unit.as_str(),
            cost,
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// mise ingredient price
// -----------------------------------------------------------------------

async fn cmd_price(pool: &PgPool, name: &str, cost: &str) -> Result<()> {
    let cost_per_unit = parse_decimal("cost", cost)?;
    let ingredient = ingredients::set_cost_per_unit(pool, name, &cost_per_unit).await?;

    println!(
        "{} now costs {} per {}.",
        ingredient.name, ingredient.cost_per_unit, ingredient.unit
    );
    println!("Existing plans keep their totals until you run `mise plan recost <id>`.");

    Ok(())
}
