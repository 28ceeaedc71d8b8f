//! CLI handlers for `mise plan` subcommands.
//!
//! Implements:
//! - `mise plan generate`      -- ask the completion service for a plan and store it
//! - `mise plan show`          -- show a plan with its meals and ingredient lines
//! - `mise plan list`          -- list a user's plans in table format
//! - `mise plan recost`        -- re-derive a plan's cost from current prices
//! - `mise plan shopping-list` -- net shopping list against the owner's pantry

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use mise_core::gateway::{GatewayConfig, gateway_from_config};
use mise_core::plan::{GenerateRequest, generate_meal_plan};
use mise_core::shopping::{ShoppingLine, ShoppingListOptions, shopping_list_for_plan};
use mise_db::models::{MealPlan, MealPlanDetail};
use mise_db::queries::meal_plans;

use crate::PlanCommands;
use crate::resolve::{parse_id, resolve_user};

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(
    command: PlanCommands,
    pool: &PgPool,
    gateway_config: &GatewayConfig,
) -> Result<()> {
    match command {
        PlanCommands::Generate {
            user,
            days,
            meals_per_day,
            no_pantry,
            start,
        } => {
            let request = GenerateRequest {
                days,
                meals_per_day,
                use_pantry: !no_pantry,
                start_date: start,
            };
            cmd_generate(pool, gateway_config, &user, &request).await
        }
        PlanCommands::Show { id } => cmd_show(pool, &id).await,
        PlanCommands::List { user, from, until } => cmd_list(pool, &user, from, until).await,
        PlanCommands::Recost { id } => cmd_recost(pool, &id).await,
        PlanCommands::ShoppingList {
            id,
            omit_covered,
            json,
        } => cmd_shopping_list(pool, &id, ShoppingListOptions { omit_covered }, json).await,
    }
}

// -----------------------------------------------------------------------
// mise plan generate
// -----------------------------------------------------------------------

async fn cmd_generate(
    pool: &PgPool,
    gateway_config: &GatewayConfig,
    user: &str,
    request: &GenerateRequest,
) -> Result<()> {
    let user_id = resolve_user(pool, user).await?;
    let gateway = gateway_from_config(gateway_config)?;

    println!(
        "Generating a {}-day plan with {} ({})...",
        request.days,
        gateway.model_name(),
        gateway_config.provider,
    );

    let plan = generate_meal_plan(
        pool,
        gateway.as_ref(),
        user_id,
        request,
        gateway_config.timeout,
    )
    .await
    .context("meal plan generation failed")?;

    println!();
    print_detail_or_summary(pool, &plan).await
}

async fn print_detail_or_summary(pool: &PgPool, plan: &MealPlan) -> Result<()> {
    match meal_plans::get_meal_plan_detail(pool, plan.id).await? {
        Some(detail) => print_detail(&detail),
        None => print_summary(plan),
    }
    Ok(())
}

// -----------------------------------------------------------------------
// mise plan show
// -----------------------------------------------------------------------

async fn cmd_show(pool: &PgPool, id: &str) -> Result<()> {
    let id = parse_id("meal plan", id)?;
    let Some(detail) = meal_plans::get_meal_plan_detail(pool, id).await? else {
        bail!("meal plan {id} not found");
    };
    print_detail(&detail);
    Ok(())
}

fn print_summary(plan: &MealPlan) {
    println!("Meal plan {}", plan.id);
    println!(
        "  Dates:   {} .. {} ({} days)",
        plan.start_date,
        plan.end_date,
        plan.length_in_days()
    );
    if plan.unpriced_ingredients > 0 {
        println!(
            "  Cost:    {} ({} ingredients unpriced)",
            plan.total_cost, plan.unpriced_ingredients
        );
    } else {
        println!("  Cost:    {}", plan.total_cost);
    }
}

fn print_detail(detail: &MealPlanDetail) {
    print_summary(&detail.plan);

    let mut current_day = None;
    for meal in &detail.meals {
        if current_day != Some(meal.day) {
            println!();
            println!("Day {}", meal.day);
            current_day = Some(meal.day);
        }
        let recipe = &meal.recipe;
        println!(
            "  {:<10} {} ({} min prep, {} min cook, serves {})",
            meal.meal_type, recipe.name, recipe.prep_time, recipe.cook_time, recipe.servings
        );
        for line in &meal.ingredients {
            println!(
                "      - {}: {} {}",
                line.ingredient_name, line.quantity, line.unit
            );
        }
    }
}

// -----------------------------------------------------------------------
// mise plan list
// -----------------------------------------------------------------------

async fn cmd_list(
    pool: &PgPool,
    user: &str,
    from: Option<NaiveDate>,
    until: Option<NaiveDate>,
) -> Result<()> {
    let user_id = resolve_user(pool, user).await?;
    let plans = meal_plans::list_meal_plans_for_user(pool, user_id, from, until).await?;

    if plans.is_empty() {
        println!("No meal plans found. Use `mise plan generate` to create one.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<10}  {:<10}  {:>10}  UNPRICED",
        "ID", "START", "END", "COST"
    );
    for plan in &plans {
        println!(
            "{:<36}  {:<10}  {:<10}  {:>10}  {}",
            plan.id,
            plan.start_date,
            plan.end_date,
            plan.total_cost.to_string(),
            plan.unpriced_ingredients,
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// mise plan recost
// -----------------------------------------------------------------------

async fn cmd_recost(pool: &PgPool, id: &str) -> Result<()> {
    let id = parse_id("meal plan", id)?;
    let Some(before) = meal_plans::get_meal_plan(pool, id).await? else {
        bail!("meal plan {id} not found");
    };
    let after = meal_plans::recompute_total_cost(pool, id).await?;

    println!("Meal plan {id} re-costed:");
    println!("  Cost:     {} -> {}", before.total_cost, after.total_cost);
    println!(
        "  Unpriced: {} -> {}",
        before.unpriced_ingredients, after.unpriced_ingredients
    );
    Ok(())
}

// -----------------------------------------------------------------------
// mise plan shopping-list
// -----------------------------------------------------------------------

async fn cmd_shopping_list(
    pool: &PgPool,
    id: &str,
    options: ShoppingListOptions,
    json: bool,
) -> Result<()> {
    let id: Uuid = parse_id("meal plan", id)?;
    let Some(lines) = shopping_list_for_plan(pool, id, options).await? else {
        bail!("meal plan {id} not found");
    };

    if json {
        let out = serde_json::to_string_pretty(&lines).context("failed to serialize list")?;
        println!("{out}");
        return Ok(());
    }

    if lines.is_empty() {
        println!("Nothing to buy.");
        return Ok(());
    }
    print_shopping_lines(&lines);
    Ok(())
}

fn print_shopping_lines(lines: &[ShoppingLine]) {
    let name_w = lines
        .iter()
        .map(|l| l.ingredient_name.len())
        .max()
        .unwrap_or(10)
        .max(10);
    let unit_w = lines.iter().map(|l| l.unit.len()).max().unwrap_or(4).max(4);

    println!(
        "{:<name_w$}  {:>10}  {:<unit_w$}  COST/UNIT",
        "INGREDIENT", "QUANTITY", "UNIT"
    );
    for line in lines {
        println!(
            "{:<name_w$}  {:>10}  {:<unit_w$}  {}",
            line.ingredient_name,
            line.net_quantity.to_string(),
            line.unit,
            line.cost_per_unit,
        );
    }
}
