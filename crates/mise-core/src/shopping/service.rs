use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use mise_db::queries::{meal_plans, pantry};

use super::{PantryStock, ShoppingLine, ShoppingListOptions, aggregate};
use crate::error::StoreError;

/// Shopping list for a stored plan against its owner's current pantry.
/// Returns `None` when the plan does not exist.
pub async fn shopping_list_for_plan(
    pool: &PgPool,
    meal_plan_id: Uuid,
    options: ShoppingListOptions,
) -> Result<Option<Vec<ShoppingLine>>, StoreError> {
    let Some(plan) = meal_plans::get_meal_plan(pool, meal_plan_id).await? else {
        return Ok(None);
    };

    let lines = meal_plans::list_required_lines(pool, meal_plan_id).await?;
    let stock: Vec<PantryStock> = pantry::list_pantry_for_user(pool, plan.user_id)
        .await?
        .iter()
        .map(PantryStock::from)
        .collect();

    let list = aggregate(&lines, &stock, options);
    debug!(
        %meal_plan_id,
        required_lines = lines.len(),
        pantry_rows = stock.len(),
        shopping_lines = list.len(),
        "built shopping list"
    );
    Ok(Some(list))
}
