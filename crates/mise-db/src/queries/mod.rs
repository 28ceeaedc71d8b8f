//! Query functions, one module per table family.

pub mod ingredients;
pub mod meal_plans;
pub mod pantry;
pub mod preferences;
pub mod recipes;
pub mod users;
