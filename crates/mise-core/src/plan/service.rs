//! Generation service layer.
//!
//! Orchestrates one generation request end to end: validate the request,
//! load the user's context, call the completion gateway under a timeout,
//! parse the payload and materialize it. No transaction is open while the
//! gateway is working.

use std::time::Duration;

use chrono::Local;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use mise_db::models::MealPlan;
use mise_db::queries::{pantry, preferences, recipes, users};

use super::generate::{
    GenerateRequest, MAX_SUGGESTIONS, PlanningContext, build_meal_plan_prompt,
    build_suggestion_prompt, build_variation_prompt,
};
use super::materialize::materialize_meal_plan;
use super::parser::{parse_meal_plan, parse_recipe_suggestions};
use super::types::ParsedRecipe;
use crate::error::{GenerateError, StoreError, ValidationError};
use crate::gateway::{CompletionGateway, GatewayError};

/// Generate, parse and persist a meal plan for `user_id`.
///
/// Parameter and user checks run before the gateway is called. A gateway
/// failure or timeout, or an unusable payload, leaves the store untouched.
pub async fn generate_meal_plan(
    pool: &PgPool,
    gateway: &dyn CompletionGateway,
    user_id: Uuid,
    request: &GenerateRequest,
    timeout: Duration,
) -> Result<MealPlan, GenerateError> {
    request.validate()?;
    let (start_date, end_date) = request.date_range(Local::now().date_naive())?;
    ensure_user_exists(pool, user_id).await?;

    let ctx = load_context(pool, user_id, request.use_pantry).await?;
    let prompt = build_meal_plan_prompt(request, &ctx);

    info!(
        %user_id,
        days = request.days,
        meals_per_day = request.meals_per_day,
        model = gateway.model_name(),
        "requesting meal plan"
    );
    let raw = complete_with_timeout(gateway, &prompt, timeout).await?;

    let plan = match parse_meal_plan(&raw, request.days) {
        Ok(plan) => plan,
        Err(e) => {
            warn!(error = %e, %prompt, response = %raw, "completion payload rejected");
            return Err(e.into());
        }
    };

    let meal_plan = materialize_meal_plan(pool, &plan, user_id, start_date, end_date).await?;
    Ok(meal_plan)
}

/// Ask the model for `count` recipe ideas built around the user's pantry.
/// Nothing is persisted.
pub async fn suggest_recipes(
    pool: &PgPool,
    gateway: &dyn CompletionGateway,
    user_id: Uuid,
    count: u32,
    timeout: Duration,
) -> Result<Vec<ParsedRecipe>, GenerateError> {
    check_count(count)?;
    ensure_user_exists(pool, user_id).await?;

    let ctx = load_context(pool, user_id, true).await?;
    let prompt = build_suggestion_prompt(count, &ctx);

    info!(%user_id, count, model = gateway.model_name(), "requesting recipe suggestions");
    let raw = complete_with_timeout(gateway, &prompt, timeout).await?;

    parse_recipe_suggestions(&raw).map_err(|e| {
        warn!(error = %e, %prompt, response = %raw, "suggestion payload rejected");
        e.into()
    })
}

/// Ask the model for `count` variations of the stored recipe `recipe_id`.
/// Nothing is persisted.
pub async fn suggest_variations(
    pool: &PgPool,
    gateway: &dyn CompletionGateway,
    recipe_id: Uuid,
    count: u32,
    timeout: Duration,
) -> Result<Vec<ParsedRecipe>, GenerateError> {
    check_count(count)?;
    let recipe = recipes::get_recipe(pool, recipe_id)
        .await
        .map_err(StoreError)?
        .ok_or(ValidationError::UnknownRecipe(recipe_id))?;
    let lines = recipes::list_recipe_ingredients(pool, recipe_id)
        .await
        .map_err(StoreError)?;

    let prompt = build_variation_prompt(count, &recipe, &lines);

    info!(%recipe_id, count, model = gateway.model_name(), "requesting recipe variations");
    let raw = complete_with_timeout(gateway, &prompt, timeout).await?;

    parse_recipe_suggestions(&raw).map_err(|e| {
        warn!(error = %e, %prompt, response = %raw, "variation payload rejected");
        e.into()
    })
}

fn check_count(count: u32) -> Result<(), ValidationError> {
    if !(1..=MAX_SUGGESTIONS).contains(&count) {
        return Err(ValidationError::CountOutOfRange {
            value: count,
            max: MAX_SUGGESTIONS,
        });
    }
    Ok(())
}

async fn ensure_user_exists(pool: &PgPool, user_id: Uuid) -> Result<(), GenerateError> {
    match users::get_user(pool, user_id).await.map_err(StoreError)? {
        Some(_) => Ok(()),
        None => Err(ValidationError::UnknownUser(user_id).into()),
    }
}

/// Preferences (or defaults), dislikes and optionally the pantry.
async fn load_context(
    pool: &PgPool,
    user_id: Uuid,
    include_pantry: bool,
) -> Result<PlanningContext, StoreError> {
    let preference = preferences::get_preference(pool, user_id).await?;
    let disliked = preferences::list_disliked_ingredient_names(pool, user_id).await?;
    let stock = if include_pantry {
        pantry::list_pantry_for_user(pool, user_id).await?
    } else {
        Vec::new()
    };
    Ok(PlanningContext::new(preference.as_ref(), disliked, &stock))
}

async fn complete_with_timeout(
    gateway: &dyn CompletionGateway,
    prompt: &str,
    timeout: Duration,
) -> Result<String, GatewayError> {
    match tokio::time::timeout(timeout, gateway.generate(prompt)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "completion call timed out");
            Err(GatewayError::Timeout(timeout))
        }
    }
}
