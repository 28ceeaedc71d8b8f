//! Meal-plan generation: request parameters and prompt construction.
//!
//! Pure logic (no I/O). The service layer loads the user's context from the
//! store, builds a prompt here and hands it to the completion gateway.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use mise_db::models::{
    Cuisine, DietaryRestriction, MeasurementUnit, PantryItemDetail, Recipe, RecipeIngredientDetail,
    UserPreference,
};

use crate::error::ValidationError;

/// Longest plan that can be requested.
pub const MAX_DAYS: u32 = 31;
/// Most meals per day that can be requested.
pub const MAX_MEALS_PER_DAY: u32 = 8;
/// Most recipe suggestions per request.
pub const MAX_SUGGESTIONS: u32 = 10;
/// Suggestions returned when the caller does not say.
pub const DEFAULT_SUGGESTIONS: u32 = 3;
/// Weekly budget assumed for users without stored preferences.
pub const DEFAULT_WEEKLY_BUDGET: &str = "150.00";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Parameters of a meal-plan generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    pub days: u32,
    pub meals_per_day: u32,
    pub use_pantry: bool,
    /// First day of the plan; today when absent.
    pub start_date: Option<NaiveDate>,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            days: 7,
            meals_per_day: 3,
            use_pantry: true,
            start_date: None,
        }
    }
}

impl GenerateRequest {
    /// Check the parameters before anything is loaded or sent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_DAYS).contains(&self.days) {
            return Err(ValidationError::DaysOutOfRange {
                value: self.days,
                max: MAX_DAYS,
            });
        }
        if !(1..=MAX_MEALS_PER_DAY).contains(&self.meals_per_day) {
            return Err(ValidationError::MealsPerDayOutOfRange {
                value: self.meals_per_day,
                max: MAX_MEALS_PER_DAY,
            });
        }
        if let Some(start) = self.start_date {
            self.date_range(start)?;
        }
        Ok(())
    }

    /// Inclusive date range the plan covers, starting `today` unless a
    /// start date was given.
    pub fn date_range(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ValidationError> {
        let start = self.start_date.unwrap_or(today);
        let span = u64::from(self.days.saturating_sub(1));
        let end = start
            .checked_add_days(Days::new(span))
            .ok_or(ValidationError::DateRangeOverflow {
                start,
                days: self.days,
            })?;
        Ok((start, end))
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// One pantry entry as shown to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct PantryLine {
    pub name: String,
    pub quantity: BigDecimal,
    pub unit: MeasurementUnit,
}

impl From<&PantryItemDetail> for PantryLine {
    fn from(item: &PantryItemDetail) -> Self {
        Self {
            name: item.ingredient_name.clone(),
            quantity: item.quantity.clone(),
            unit: item.unit,
        }
    }
}

/// Everything about a user that shapes the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningContext {
    pub dietary: DietaryRestriction,
    pub cuisine: Cuisine,
    pub weekly_budget: BigDecimal,
    pub disliked: Vec<String>,
    pub pantry: Vec<PantryLine>,
}

impl Default for PlanningContext {
    fn default() -> Self {
        Self {
            dietary: DietaryRestriction::default(),
            cuisine: Cuisine::default(),
            weekly_budget: default_weekly_budget(),
            disliked: Vec::new(),
            pantry: Vec::new(),
        }
    }
}

fn default_weekly_budget() -> BigDecimal {
    BigDecimal::from_str(DEFAULT_WEEKLY_BUDGET).unwrap_or_else(|_| BigDecimal::from(150))
}

impl PlanningContext {
    /// Assemble a context, falling back to defaults when the user has no
    /// stored preferences.
    pub fn new(
        preference: Option<&UserPreference>,
        disliked: Vec<String>,
        pantry: &[PantryItemDetail],
    ) -> Self {
        let mut ctx = Self {
            disliked,
            pantry: pantry.iter().map(PantryLine::from).collect(),
            ..Self::default()
        };
        if let Some(p) = preference {
            ctx.dietary = p.dietary_restrictions;
            ctx.cuisine = p.preferred_cuisines;
            ctx.weekly_budget = p.weekly_budget.clone();
        }
        ctx
    }

    fn disliked_list(&self) -> String {
        if self.disliked.is_empty() {
            "none".to_string()
        } else {
            self.disliked.join(", ")
        }
    }

    fn push_pantry(&self, out: &mut String) {
        for line in &self.pantry {
            out.push_str(&format!(
                "   - {}: {} {}\n",
                line.name,
                plain_decimal(&line.quantity),
                line.unit
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Decimal text without trailing fractional zeros (`2.500` -> `2.5`).
fn plain_decimal(value: &BigDecimal) -> String {
    let text = value.to_string();
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

const MEAL_PLAN_SHAPE: &str = r#"{
  "meals": [
    {
      "day": 1,
      "meal_type": "breakfast/lunch/dinner",
      "recipe": {
        "name": "Recipe Name",
        "description": "Brief description",
        "instructions": "Step by step instructions",
        "prep_time": 15,
        "cook_time": 30,
        "servings": 4,
        "ingredients": [
          {"name": "Ingredient Name", "quantity": 1.5, "unit": "cups"}
        ]
      }
    }
  ]
}"#;

const RECIPE_LIST_SHAPE: &str = r#"[
  {
    "name": "Recipe Name",
    "description": "Brief description",
    "instructions": "Step by step instructions",
    "prep_time": 15,
    "cook_time": 30,
    "servings": 4,
    "ingredients": [
      {"name": "Ingredient Name", "quantity": 1.5, "unit": "cups"}
    ]
  }
]"#;

/// Prompt asking for a `days`-day plan as JSON.
pub fn build_meal_plan_prompt(request: &GenerateRequest, ctx: &PlanningContext) -> String {
    let mut out = String::new();

    out.push_str(&format!("Create a {}-day meal plan that:\n", request.days));
    out.push_str(&format!(
        "1. Stays within a budget of ${}\n",
        plain_decimal(&ctx.weekly_budget)
    ));
    out.push_str("2. Uses similar ingredients across meals to minimize waste\n");
    out.push_str(&format!("3. Respects this dietary restriction: {}\n", ctx.dietary));
    out.push_str(&format!("4. Prefers {} cuisine\n", ctx.cuisine));
    out.push_str(&format!("5. Avoids these ingredients: {}\n", ctx.disliked_list()));
    out.push_str(&format!("6. Includes {} meals per day\n", request.meals_per_day));
    if request.use_pantry && !ctx.pantry.is_empty() {
        out.push_str("7. Uses these available ingredients:\n");
        ctx.push_pantry(&mut out);
    }

    out.push_str(&format!(
        "\nNumber days from 1 to {}. Respond with JSON only, using this structure:\n",
        request.days
    ));
    out.push_str(MEAL_PLAN_SHAPE);
    out.push('\n');
    out
}

/// Prompt asking for `count` standalone recipes as a JSON array.
pub fn build_suggestion_prompt(count: u32, ctx: &PlanningContext) -> String {
    let per_meal = (&ctx.weekly_budget / BigDecimal::from(7)).round(2);
    let mut out = String::new();

    out.push_str(&format!("Suggest {count} recipes that:\n"));
    if ctx.pantry.is_empty() {
        out.push_str("1. Use common, inexpensive ingredients\n");
    } else {
        out.push_str("1. Use these available ingredients:\n");
        ctx.push_pantry(&mut out);
    }
    out.push_str(&format!("2. Respect this dietary restriction: {}\n", ctx.dietary));
    out.push_str(&format!("3. Prefer {} cuisine\n", ctx.cuisine));
    out.push_str(&format!("4. Avoid these ingredients: {}\n", ctx.disliked_list()));
    out.push_str(&format!(
        "5. Are budget-friendly (around ${} per meal)\n",
        plain_decimal(&per_meal)
    ));

    out.push_str("\nRespond with a JSON array only, using this structure:\n");
    out.push_str(RECIPE_LIST_SHAPE);
    out.push('\n');
    out
}

/// Prompt asking for `count` variations of a stored recipe as a JSON array.
pub fn build_variation_prompt(
    count: u32,
    recipe: &Recipe,
    lines: &[RecipeIngredientDetail],
) -> String {
    let mut out = String::new();

    out.push_str(&format!("Create {count} variations of this recipe:\n"));
    out.push_str(&format!("Name: {}\n", recipe.name));
    if !recipe.description.is_empty() {
        out.push_str(&format!("Description: {}\n", recipe.description));
    }
    out.push_str("Ingredients:\n");
    for line in lines {
        out.push_str(&format!(
            "   - {}: {} {}\n",
            line.ingredient_name,
            plain_decimal(&line.quantity),
            line.unit
        ));
    }
    if !recipe.instructions.is_empty() {
        out.push_str(&format!("Instructions: {}\n", recipe.instructions));
    }

    out.push_str("\nFor each variation:\n");
    out.push_str("1. Keep the same basic structure but change some ingredients or techniques\n");
    out.push_str(&format!(
        "2. Stay close to {} min prep and {} min cook\n",
        recipe.prep_time, recipe.cook_time
    ));
    out.push_str(&format!("3. Serve {}\n", recipe.servings));
    out.push_str("4. Give it a new name, description and ingredient list\n");
    out.push_str("5. Adjust the instructions to match\n");

    out.push_str("\nRespond with a JSON array only, using this structure:\n");
    out.push_str(RECIPE_LIST_SHAPE);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        s.parse().unwrap()
    }

    #[test]
    fn plain_decimal_drops_trailing_zeros() {
        assert_eq!(plain_decimal(&dec("2.500")), "2.5");
        assert_eq!(plain_decimal(&dec("90.00")), "90");
        assert_eq!(plain_decimal(&dec("150")), "150");
    }

    #[test]
    fn defaults_match_documented_values() {
        let request = GenerateRequest::default();
        assert_eq!(request.days, 7);
        assert_eq!(request.meals_per_day, 3);
        assert!(request.use_pantry);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn out_of_range_parameters_fail_validation() {
        let zero_days = GenerateRequest {
            days: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_days.validate(),
            Err(ValidationError::DaysOutOfRange { value: 0, .. })
        ));

        let too_many_meals = GenerateRequest {
            meals_per_day: 9,
            ..Default::default()
        };
        assert!(matches!(
            too_many_meals.validate(),
            Err(ValidationError::MealsPerDayOutOfRange { value: 9, .. })
        ));
    }

    #[test]
    fn date_range_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 30).unwrap();
        let (start, end) = GenerateRequest::default().date_range(today).unwrap();
        assert_eq!(start, today);
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 2, 5).unwrap());

        let one_day = GenerateRequest {
            days: 1,
            start_date: Some(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()),
            ..Default::default()
        };
        let (start, end) = one_day.date_range(today).unwrap();
        assert_eq!(start, end);
    }

    #[test]
    fn start_date_near_the_calendar_end_fails_validation() {
        let request = GenerateRequest {
            days: 2,
            start_date: Some(NaiveDate::MAX),
            ..Default::default()
        };
        assert!(matches!(
            request.validate(),
            Err(ValidationError::DateRangeOverflow { days: 2, .. })
        ));

        let last_day = GenerateRequest {
            days: 1,
            start_date: Some(NaiveDate::MAX),
            ..Default::default()
        };
        assert!(last_day.validate().is_ok());
        assert_eq!(
            last_day.date_range(NaiveDate::MIN).unwrap(),
            (NaiveDate::MAX, NaiveDate::MAX)
        );
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: GenerateRequest = serde_json::from_str(r#"{"days": 2}"#).unwrap();
        assert_eq!(request.days, 2);
        assert_eq!(request.meals_per_day, 3);
        assert!(request.use_pantry);
    }

    #[test]
    fn context_without_preferences_uses_defaults() {
        let ctx = PlanningContext::new(None, vec![], &[]);
        assert_eq!(ctx.dietary, DietaryRestriction::None);
        assert_eq!(ctx.cuisine, Cuisine::American);
        assert_eq!(ctx.weekly_budget, dec("150"));
    }

    #[test]
    fn meal_plan_prompt_mentions_constraints() {
        let ctx = PlanningContext {
            dietary: DietaryRestriction::Vegan,
            cuisine: Cuisine::Thai,
            weekly_budget: dec("90.00"),
            disliked: vec!["Cilantro".into()],
            pantry: vec![PantryLine {
                name: "Rice".into(),
                quantity: dec("2.000"),
                unit: MeasurementUnit::Kg,
            }],
        };
        let request = GenerateRequest {
            days: 2,
            meals_per_day: 2,
            ..Default::default()
        };
        let prompt = build_meal_plan_prompt(&request, &ctx);

        assert!(prompt.starts_with("Create a 2-day meal plan"));
        assert!(prompt.contains("$90"));
        assert!(prompt.contains("vegan"));
        assert!(prompt.contains("thai"));
        assert!(prompt.contains("Cilantro"));
        assert!(prompt.contains("Includes 2 meals per day"));
        assert!(prompt.contains("- Rice: 2 kg"));
        assert!(prompt.contains("\"meals\""));
        assert!(!prompt.contains("Suggest"));
    }

    #[test]
    fn pantry_is_left_out_when_not_requested() {
        let ctx = PlanningContext {
            pantry: vec![PantryLine {
                name: "Rice".into(),
                quantity: dec("1"),
                unit: MeasurementUnit::Kg,
            }],
            ..Default::default()
        };
        let request = GenerateRequest {
            use_pantry: false,
            ..Default::default()
        };
        assert!(!build_meal_plan_prompt(&request, &ctx).contains("Rice"));
    }

    #[test]
    fn suggestion_prompt_splits_budget_per_meal() {
        let ctx = PlanningContext {
            weekly_budget: dec("70"),
            ..Default::default()
        };
        let prompt = build_suggestion_prompt(3, &ctx);
        assert!(prompt.starts_with("Suggest 3 recipes"));
        assert!(prompt.contains("around $10 per meal"));
        assert!(prompt.contains("Avoid these ingredients: none"));
    }

    #[test]
    fn variation_prompt_lists_the_original_recipe() {
        let now = chrono::Utc::now();
        let recipe = Recipe {
            id: uuid::Uuid::new_v4(),
            name: "Tomato Soup".into(),
            description: "Smooth and bright".into(),
            instructions: "Simmer, then blend.".into(),
            prep_time: 10,
            cook_time: 25,
            servings: 2,
            created_at: now,
            updated_at: now,
        };
        let lines = vec![RecipeIngredientDetail {
            id: uuid::Uuid::new_v4(),
            recipe_id: recipe.id,
            ingredient_id: uuid::Uuid::new_v4(),
            ingredient_name: "Tomato".into(),
            category: mise_db::models::IngredientCategory::Vegetables,
            quantity: dec("4.000"),
            unit: "whole".into(),
            cost_per_unit: dec("0.50"),
        }];

        let prompt = build_variation_prompt(2, &recipe, &lines);
        assert!(prompt.starts_with("Create 2 variations of this recipe:"));
        assert!(prompt.contains("Name: Tomato Soup"));
        assert!(prompt.contains("   - Tomato: 4 whole"));
        assert!(prompt.contains("Instructions: Simmer, then blend."));
        assert!(prompt.contains("10 min prep and 25 min cook"));
        assert!(prompt.contains("3. Serve 2"));
        assert!(prompt.contains("JSON array"));
    }
}
