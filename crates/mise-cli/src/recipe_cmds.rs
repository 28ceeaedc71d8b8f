//! CLI handlers for `mise recipe` subcommands.

use anyhow::{Context, Result};
use sqlx::PgPool;

use mise_core::gateway::{GatewayConfig, gateway_from_config};
use mise_core::plan::{ParsedRecipe, suggest_recipes, suggest_variations};
use mise_db::models::DietaryRestriction;
use mise_db::queries::recipes::{self, RecipeFilter};

use crate::RecipeCommands;
use crate::resolve::{parse_decimal, parse_id, resolve_user};

/// Dispatch a `RecipeCommands` variant to the appropriate handler.
pub async fn run_recipe_command(
    command: RecipeCommands,
    pool: &PgPool,
    gateway_config: &GatewayConfig,
) -> Result<()> {
    match command {
        RecipeCommands::Search {
            name,
            ingredients,
            dietary,
            max_prep,
            max_cook,
            min_cost,
            max_cost,
            limit,
            offset,
        } => {
            let dietary = dietary
                .map(|d| {
                    d.parse::<DietaryRestriction>().map_err(|_| {
                        anyhow::anyhow!(
                            "invalid dietary restriction {d:?}; expected one of: {}",
                            DietaryRestriction::ALL.map(DietaryRestriction::as_str).join(", "),
                        )
                    })
                })
                .transpose()?;
            let filter = RecipeFilter {
                name,
                ingredients,
                dietary,
                max_prep_time: max_prep,
                max_cook_time: max_cook,
                min_cost: min_cost
                    .as_deref()
                    .map(|c| parse_decimal("min cost", c))
                    .transpose()?,
                max_cost: max_cost
                    .as_deref()
                    .map(|c| parse_decimal("max cost", c))
                    .transpose()?,
                limit,
                offset,
            };
            cmd_search(pool, &filter).await
        }
        RecipeCommands::Suggest { user, count } => {
            cmd_suggest(pool, gateway_config, &user, count).await
        }
        RecipeCommands::Variations { recipe, count } => {
            cmd_variations(pool, gateway_config, &recipe, count).await
        }
    }
}

async fn cmd_search(pool: &PgPool, filter: &RecipeFilter) -> Result<()> {
    let found = recipes::search_recipes(pool, filter).await?;

    if found.is_empty() {
        println!("No recipes match.");
        return Ok(());
    }

    let name_w = found.iter().map(|r| r.name.len()).max().unwrap_or(4).max(4);
    println!("{:<name_w$}  {:>4}  {:>4}  {:>6}  ID", "NAME", "PREP", "COOK", "SERVES");
    for recipe in &found {
        println!(
            "{:<name_w$}  {:>4}  {:>4}  {:>6}  {}",
            recipe.name, recipe.prep_time, recipe.cook_time, recipe.servings, recipe.id,
        );
    }

    Ok(())
}

async fn cmd_suggest(
    pool: &PgPool,
    gateway_config: &GatewayConfig,
    user: &str,
    count: u32,
) -> Result<()> {
    let user_id = resolve_user(pool, user).await?;
    let gateway = gateway_from_config(gateway_config)?;

    let suggestions = suggest_recipes(pool, gateway.as_ref(), user_id, count, gateway_config.timeout)
        .await
        .context("recipe suggestion failed")?;

    print_recipes(&suggestions);
    Ok(())
}

async fn cmd_variations(
    pool: &PgPool,
    gateway_config: &GatewayConfig,
    recipe: &str,
    count: u32,
) -> Result<()> {
    let recipe_id = parse_id("recipe", recipe)?;
    let gateway = gateway_from_config(gateway_config)?;

    let variations =
        suggest_variations(pool, gateway.as_ref(), recipe_id, count, gateway_config.timeout)
            .await
            .context("recipe variation failed")?;

    print_recipes(&variations);
    Ok(())
}

fn print_recipes(found: &[ParsedRecipe]) {
    for (i, recipe) in found.iter().enumerate() {
        if i > 0 {
            println!("---");
        }
        println!("{}", recipe.name);
        if !recipe.description.is_empty() {
            println!("  {}", recipe.description);
        }
        if let (Some(prep), Some(cook)) = (recipe.prep_time, recipe.cook_time) {
            println!("  {prep} min prep, {cook} min cook");
        }
        for line in &recipe.ingredients {
            println!("  - {}: {} {}", line.name, line.quantity, line.unit);
        }
        if !recipe.instructions.is_empty() {
            println!("  {}", recipe.instructions);
        }
    }
}
