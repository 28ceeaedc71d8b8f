//! Meal plans: completion parsing, generation prompts, materialization and
//! the service layer that ties them together.

pub mod generate;
pub mod materialize;
pub mod parser;
pub mod service;
pub mod types;

pub use generate::{
    GenerateRequest, PlanningContext, build_meal_plan_prompt, build_suggestion_prompt,
    build_variation_prompt,
};
pub use materialize::{
    DEFAULT_COOK_TIME_MINUTES, DEFAULT_PREP_TIME_MINUTES, DEFAULT_SERVINGS, materialize_meal_plan,
};
pub use parser::{ParseError, parse_meal_plan, parse_recipe_suggestions};
pub use service::{generate_meal_plan, suggest_recipes, suggest_variations};
pub use types::{ParsedIngredient, ParsedMeal, ParsedMealPlan, ParsedRecipe};
