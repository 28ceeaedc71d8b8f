//! CLI handlers for `mise prefs` subcommands.

use anyhow::{Result, bail};
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use mise_core::plan::generate::DEFAULT_WEEKLY_BUDGET;
use mise_db::models::{Cuisine, DietaryRestriction};
use mise_db::queries::{ingredients, preferences};

use crate::PrefsCommands;
use crate::resolve::{parse_decimal, resolve_user};

/// Dispatch a `PrefsCommands` variant to the appropriate handler.
pub async fn run_prefs_command(command: PrefsCommands, pool: &PgPool) -> Result<()> {
    match command {
        PrefsCommands::Set {
            user,
            dietary,
            cuisine,
            budget,
            dislikes,
            clear_dislikes,
        } => {
            let user_id = resolve_user(pool, &user).await?;
            let dietary: DietaryRestriction = dietary.parse().map_err(|_| {
                anyhow::anyhow!(
                    "invalid dietary restriction {dietary:?}; expected one of: {}",
                    DietaryRestriction::ALL.map(DietaryRestriction::as_str).join(", "),
                )
            })?;
            let cuisine: Cuisine = cuisine.parse().map_err(|_| {
                anyhow::anyhow!(
                    "invalid cuisine {cuisine:?}; expected one of: {}",
                    Cuisine::ALL.map(Cuisine::as_str).join(", "),
                )
            })?;
            let budget = budget
                .as_deref()
                .map(|b| parse_decimal("budget", b))
                .transpose()?;
            if budget.as_ref().is_some_and(|b| *b == BigDecimal::from(0)) {
                bail!("invalid budget: must be greater than zero");
            }

            // Resolve names before writing anything.
            let disliked_ids = if clear_dislikes || !dislikes.is_empty() {
                Some(ingredient_ids(pool, &dislikes).await?)
            } else {
                None
            };

            preferences::upsert_preference(pool, user_id, dietary, cuisine, budget.as_ref())
                .await?;
            if let Some(ids) = disliked_ids {
                preferences::set_disliked_ingredients(pool, user_id, &ids).await?;
            }

            println!("Preferences saved.");
            cmd_show(pool, user_id).await
        }
        PrefsCommands::Show { user } => {
            let user_id = resolve_user(pool, &user).await?;
            cmd_show(pool, user_id).await
        }
    }
}

async fn ingredient_ids(pool: &PgPool, names: &[String]) -> Result<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        match ingredients::get_ingredient_by_name(pool, name).await? {
            Some(ingredient) => ids.push(ingredient.id),
            None => bail!("ingredient {name:?} not found"),
        }
    }
    Ok(ids)
}

async fn cmd_show(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let preference = preferences::get_preference(pool, user_id).await?;
    let disliked = preferences::list_disliked_ingredient_names(pool, user_id).await?;

    match preference {
        Some(p) => {
            println!("Dietary:   {}", p.dietary_restrictions);
            println!("Cuisine:   {}", p.preferred_cuisines);
            println!("Budget:    {} per week", p.weekly_budget);
        }
        None => {
            println!("No preferences recorded; planning uses the defaults:");
            println!("Dietary:   {}", DietaryRestriction::None);
            println!("Cuisine:   {}", Cuisine::American);
            println!("Budget:    {DEFAULT_WEEKLY_BUDGET} per week");
        }
    }
    if disliked.is_empty() {
        println!("Dislikes:  none");
    } else {
        println!("Dislikes:  {}", disliked.join(", "));
    }

    Ok(())
}
