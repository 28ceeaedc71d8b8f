//! CLI handlers for `mise pantry` subcommands.

use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use sqlx::PgPool;

use mise_db::models::PantryItemDetail;
use mise_db::queries::{ingredients, pantry};

use crate::PantryCommands;
use crate::resolve::{parse_decimal, parse_id, resolve_user};

/// Dispatch a `PantryCommands` variant to the appropriate handler.
pub async fn run_pantry_command(command: PantryCommands, pool: &PgPool) -> Result<()> {
    match command {
        PantryCommands::Add {
            user,
            ingredient,
            quantity,
            expires,
        } => cmd_add(pool, &user, &ingredient, &quantity, expires).await,
        PantryCommands::List { user } => {
            let user_id = resolve_user(pool, &user).await?;
            let items = pantry::list_pantry_for_user(pool, user_id).await?;
            if items.is_empty() {
                println!("Pantry is empty. Use `mise pantry add` to stock it.");
            } else {
                print_items(&items);
            }
            Ok(())
        }
        PantryCommands::Expiring { user, days } => {
            let user_id = resolve_user(pool, &user).await?;
            let today = Local::now().date_naive();
            let items = pantry::list_expiring_soon(pool, user_id, today, days).await?;
            if items.is_empty() {
                println!("Nothing expires in the next {days} days.");
            } else {
                print_items(&items);
            }
            Ok(())
        }
        PantryCommands::Remove { user, id } => {
            let user_id = resolve_user(pool, &user).await?;
            let id = parse_id("pantry item", &id)?;
            pantry::delete_pantry_item(pool, user_id, id).await?;
            println!("Removed pantry item {id}.");
            Ok(())
        }
    }
}

async fn cmd_add(
    pool: &PgPool,
    user: &str,
    ingredient_name: &str,
    quantity: &str,
    expires: Option<NaiveDate>,
) -> Result<()> {
    let user_id = resolve_user(pool, user).await?;
    let quantity = parse_decimal("quantity", quantity)?;

    let Some(ingredient) = ingredients::get_ingredient_by_name(pool, ingredient_name).await? else {
        bail!(
            "ingredient {ingredient_name:?} not found. \
             Use `mise ingredient add {ingredient_name:?}` first."
        );
    };

    let item =
        pantry::insert_pantry_item(pool, user_id, ingredient.id, &quantity, expires).await?;

    println!(
        "Added {} {} of {} (pantry item {}).",
        item.quantity, ingredient.unit, ingredient.name, item.id
    );
    Ok(())
}

fn print_items(items: &[PantryItemDetail]) {
    let name_w = items
        .iter()
        .map(|i| i.ingredient_name.len())
        .max()
        .unwrap_or(10)
        .max(10);

    println!(
        "{:<36}  {:<name_w$}  {:>10}  {:<6}  EXPIRES",
        "ID", "INGREDIENT", "QUANTITY", "UNIT"
    );
    for item in items {
        let expires = item
            .expiry_date
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        println!(
            "{:<36}  {:<name_w$}  {:>10}  {:<6}  {}",
            item.id,
            item.ingredient_name,
            item.quantity.to_string(),
            item.unit.as_str(),
            expires,
        );
    }
}
