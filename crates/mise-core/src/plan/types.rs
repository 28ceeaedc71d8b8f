//! Validated in-memory meal plan produced by the parser.
//!
//! Nothing here has touched the database yet; every value has passed the
//! parser's checks and can be persisted without further validation.

use bigdecimal::BigDecimal;
use serde::Serialize;

/// A parsed meal plan: an ordered list of meal slots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedMealPlan {
    pub meals: Vec<ParsedMeal>,
}

/// One meal slot. `day` lies in `1..=expected_days`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedMeal {
    pub day: u32,
    pub meal_type: String,
    pub recipe: ParsedRecipe,
}

/// A recipe as described by the model. Missing times and servings stay
/// `None` and are defaulted when materialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRecipe {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub prep_time: Option<u32>,
    pub cook_time: Option<u32>,
    pub servings: Option<u32>,
    pub ingredients: Vec<ParsedIngredient>,
}

/// One ingredient line. `unit` is the model's label, unmapped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedIngredient {
    pub name: String,
    pub quantity: BigDecimal,
    pub unit: String,
}

impl ParsedMealPlan {
    /// Total number of ingredient lines across all meals.
    pub fn ingredient_line_count(&self) -> usize {
        self.meals.iter().map(|m| m.recipe.ingredients.len()).sum()
    }
}
