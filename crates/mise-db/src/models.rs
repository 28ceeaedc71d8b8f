use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Grocery category of an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IngredientCategory {
    Vegetables,
    Fruits,
    Meat,
    Fish,
    Dairy,
    Grains,
    Legumes,
    Nuts,
    Spices,
    Condiments,
    Beverages,
    Other,
}

impl IngredientCategory {
    pub const ALL: [Self; 12] = [
        Self::Vegetables,
        Self::Fruits,
        Self::Meat,
        Self::Fish,
        Self::Dairy,
        Self::Grains,
        Self::Legumes,
        Self::Nuts,
        Self::Spices,
        Self::Condiments,
        Self::Beverages,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vegetables => "vegetables",
            Self::Fruits => "fruits",
            Self::Meat => "meat",
            Self::Fish => "fish",
            Self::Dairy => "dairy",
            Self::Grains => "grains",
            Self::Legumes => "legumes",
            Self::Nuts => "nuts",
            Self::Spices => "spices",
            Self::Condiments => "condiments",
            Self::Beverages => "beverages",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for IngredientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngredientCategory {
    type Err = IngredientCategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| IngredientCategoryParseError(s.to_owned()))
    }
}

/// Error returned when parsing an invalid [`IngredientCategory`] string.
#[derive(Debug, Clone, Error)]
#[error("invalid ingredient category: {0:?}")]
pub struct IngredientCategoryParseError(pub String);

// ---------------------------------------------------------------------------

/// Canonical measurement unit of an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MeasurementUnit {
    Grams,
    Kg,
    Oz,
    Lbs,
    Cups,
    Tbsp,
    Tsp,
    Ml,
    L,
    Pieces,
    Cloves,
    Whole,
}

impl MeasurementUnit {
    pub const ALL: [Self; 12] = [
        Self::Grams,
        Self::Kg,
        Self::Oz,
        Self::Lbs,
        Self::Cups,
        Self::Tbsp,
        Self::Tsp,
        Self::Ml,
        Self::L,
        Self::Pieces,
        Self::Cloves,
        Self::Whole,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grams => "grams",
            Self::Kg => "kg",
            Self::Oz => "oz",
            Self::Lbs => "lbs",
            Self::Cups => "cups",
            Self::Tbsp => "tbsp",
            Self::Tsp => "tsp",
            Self::Ml => "ml",
            Self::L => "l",
            Self::Pieces => "pieces",
            Self::Cloves => "cloves",
            Self::Whole => "whole",
        }
    }

    /// Map a free-form unit label (as written by a recipe author or a model)
    /// to a canonical unit. Case-insensitive; accepts common singular and
    /// abbreviated spellings. Returns `None` for anything unrecognised.
    pub fn from_alias(label: &str) -> Option<Self> {
        let unit = match label.trim().to_ascii_lowercase().trim_end_matches('.') {
            "g" | "gr" | "gram" | "grams" => Self::Grams,
            "kg" | "kgs" | "kilogram" | "kilograms" => Self::Kg,
            "oz" | "ounce" | "ounces" => Self::Oz,
            "lb" | "lbs" | "pound" | "pounds" => Self::Lbs,
            "cup" | "cups" => Self::Cups,
            "tbsp" | "tbs" | "tablespoon" | "tablespoons" => Self::Tbsp,
            "tsp" | "teaspoon" | "teaspoons" => Self::Tsp,
            "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Self::Ml,
            "l" | "liter" | "liters" | "litre" | "litres" => Self::L,
            "piece" | "pieces" | "pc" | "pcs" => Self::Pieces,
            "clove" | "cloves" => Self::Cloves,
            "whole" => Self::Whole,
            _ => return None,
        };
        Some(unit)
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementUnit {
    type Err = MeasurementUnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| MeasurementUnitParseError(s.to_owned()))
    }
}

/// Error returned when parsing an invalid [`MeasurementUnit`] string.
#[derive(Debug, Clone, Error)]
#[error("invalid measurement unit: {0:?}")]
pub struct MeasurementUnitParseError(pub String);

// ---------------------------------------------------------------------------

/// Dietary restriction recorded on a user's preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DietaryRestriction {
    #[default]
    None,
    Vegetarian,
    Vegan,
    GlutenFree,
    DairyFree,
    Keto,
    Paleo,
}

impl DietaryRestriction {
    pub const ALL: [Self; 7] = [
        Self::None,
        Self::Vegetarian,
        Self::Vegan,
        Self::GlutenFree,
        Self::DairyFree,
        Self::Keto,
        Self::Paleo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::GlutenFree => "gluten_free",
            Self::DairyFree => "dairy_free",
            Self::Keto => "keto",
            Self::Paleo => "paleo",
        }
    }
}

impl fmt::Display for DietaryRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DietaryRestriction {
    type Err = DietaryRestrictionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the hyphenated spelling used by older clients.
        let normalized = s.replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| DietaryRestrictionParseError(s.to_owned()))
    }
}

/// Error returned when parsing an invalid [`DietaryRestriction`] string.
#[derive(Debug, Clone, Error)]
#[error("invalid dietary restriction: {0:?}")]
pub struct DietaryRestrictionParseError(pub String);

// ---------------------------------------------------------------------------

/// Preferred cuisine recorded on a user's preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Cuisine {
    #[default]
    American,
    Italian,
    Mexican,
    Chinese,
    Japanese,
    Thai,
    Indian,
    Mediterranean,
    French,
    Korean,
}

impl Cuisine {
    pub const ALL: [Self; 10] = [
        Self::American,
        Self::Italian,
        Self::Mexican,
        Self::Chinese,
        Self::Japanese,
        Self::Thai,
        Self::Indian,
        Self::Mediterranean,
        Self::French,
        Self::Korean,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::American => "american",
            Self::Italian => "italian",
            Self::Mexican => "mexican",
            Self::Chinese => "chinese",
            Self::Japanese => "japanese",
            Self::Thai => "thai",
            Self::Indian => "indian",
            Self::Mediterranean => "mediterranean",
            Self::French => "french",
            Self::Korean => "korean",
        }
    }
}

impl fmt::Display for Cuisine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cuisine {
    type Err = CuisineParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CuisineParseError(s.to_owned()))
    }
}

/// Error returned when parsing an invalid [`Cuisine`] string.
#[derive(Debug, Clone, Error)]
#[error("invalid cuisine: {0:?}")]
pub struct CuisineParseError(pub String);

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A user identity. Registration and authentication live elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// An ingredient, identified by its unique name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub category: IngredientCategory,
    pub unit: MeasurementUnit,
    pub cost_per_unit: BigDecimal,
    pub created_at: DateTime<Utc>,
}

/// A recipe. Ingredient lines live in `recipe_ingredients`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub prep_time: i32,
    pub cook_time: i32,
    pub servings: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Join row linking a recipe to an ingredient. `unit` is the unit the recipe
/// was written in and is never converted to the ingredient's canonical unit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecipeIngredient {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: BigDecimal,
    pub unit: String,
}

/// A recipe ingredient line joined with its ingredient's name and price.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecipeIngredientDetail {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub category: IngredientCategory,
    pub quantity: BigDecimal,
    pub unit: String,
    pub cost_per_unit: BigDecimal,
}

/// A user's meal-planning preferences (one row per user).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserPreference {
    pub user_id: Uuid,
    pub dietary_restrictions: DietaryRestriction,
    pub preferred_cuisines: Cuisine,
    pub weekly_budget: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One pantry stock row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PantryItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: BigDecimal,
    pub expiry_date: Option<NaiveDate>,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A pantry row joined with its ingredient's name and canonical unit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PantryItemDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: MeasurementUnit,
    pub quantity: BigDecimal,
    pub expiry_date: Option<NaiveDate>,
}

/// A meal plan covering `start_date..=end_date`.
///
/// `total_cost` is derived from the linked recipe lines when the plan is
/// materialized or re-costed; `unpriced_ingredients` counts the distinct
/// linked ingredients whose price is still unknown (zero).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_cost: BigDecimal,
    pub unpriced_ingredients: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MealPlan {
    /// Number of days the plan covers (inclusive of both ends).
    pub fn length_in_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Join row placing a recipe on a given day and meal slot of a plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealPlanRecipe {
    pub id: Uuid,
    pub meal_plan_id: Uuid,
    pub recipe_id: Uuid,
    pub day: i32,
    pub meal_type: String,
    pub created_at: DateTime<Utc>,
}

/// One recipe ingredient line required by a plan, with the ingredient's
/// name and price. A recipe linked twice contributes its lines twice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RequiredLine {
    pub ingredient_name: String,
    pub unit: String,
    pub quantity: BigDecimal,
    pub cost_per_unit: BigDecimal,
}

/// One meal slot of a plan with its recipe and ingredient lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedMealDetail {
    pub day: i32,
    pub meal_type: String,
    pub recipe: Recipe,
    pub ingredients: Vec<RecipeIngredientDetail>,
}

/// A meal plan with every meal expanded, ordered by day then insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlanDetail {
    pub plan: MealPlan,
    pub meals: Vec<PlannedMealDetail>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
