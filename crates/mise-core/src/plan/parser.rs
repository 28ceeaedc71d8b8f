//! Completion payload parser with validation.
//!
//! Turns the gateway's raw text into a [`ParsedMealPlan`]. The payload must
//! be JSON (optionally wrapped in one Markdown code fence) and every meal,
//! recipe and ingredient line must pass validation; a single bad entry
//! rejects the whole payload.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{ParsedIngredient, ParsedMeal, ParsedMealPlan, ParsedRecipe};

/// Errors that can occur while parsing a completion payload.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("completion payload is not valid JSON: {0}")]
    MalformedPayload(String),

    #[error("completion payload is missing required array {0:?}")]
    MissingField(&'static str),

    #[error("{path}: day {day} is outside 1..={expected_days}")]
    DayOutOfRange {
        path: String,
        day: i64,
        expected_days: u32,
    },

    #[error("{path}: {reason}")]
    InvalidField { path: String, reason: String },
}

/// Decimal places a stored quantity keeps (`NUMERIC(12, 3)`).
pub const QUANTITY_SCALE: i64 = 3;

/// Quantities must stay below this to fit `NUMERIC(12, 3)`.
pub const QUANTITY_LIMIT: i64 = 1_000_000_000;

fn invalid(path: impl Into<String>, reason: &str) -> ParseError {
    ParseError::InvalidField {
        path: path.into(),
        reason: reason.to_string(),
    }
}

/// Parse and validate a meal plan whose days must lie in
/// `1..=expected_days`.
pub fn parse_meal_plan(raw: &str, expected_days: u32) -> Result<ParsedMealPlan, ParseError> {
    let value = parse_payload(raw)?;
    let meals = value
        .as_object()
        .and_then(|o| o.get("meals"))
        .and_then(Value::as_array)
        .ok_or(ParseError::MissingField("meals"))?;

    let meals = meals
        .iter()
        .enumerate()
        .map(|(i, meal)| parse_meal(meal, &format!("meals[{i}]"), expected_days))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedMealPlan { meals })
}

/// Parse standalone recipe suggestions: either a JSON array of recipes or an
/// object with a `recipes` array.
pub fn parse_recipe_suggestions(raw: &str) -> Result<Vec<ParsedRecipe>, ParseError> {
    let value = parse_payload(raw)?;
    let recipes = match &value {
        Value::Array(items) => items,
        Value::Object(o) => o
            .get("recipes")
            .and_then(Value::as_array)
            .ok_or(ParseError::MissingField("recipes"))?,
        _ => return Err(ParseError::MissingField("recipes")),
    };

    recipes
        .iter()
        .enumerate()
        .map(|(i, recipe)| parse_recipe(recipe, &format!("recipes[{i}]")))
        .collect()
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

fn parse_payload(raw: &str) -> Result<Value, ParseError> {
    serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| ParseError::MalformedPayload(e.to_string()))
}

/// Remove one surrounding Markdown fence (```` ``` ```` or ```` ```json ````).
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };

    match body.split_once('\n') {
        Some((info, rest)) if info.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest.trim(),
        _ => body.trim(),
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

fn parse_meal(value: &Value, path: &str, expected_days: u32) -> Result<ParsedMeal, ParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(path, "must be an object"))?;

    let day_path = format!("{path}.day");
    let day = obj
        .get("day")
        .and_then(Value::as_i64)
        .ok_or_else(|| invalid(&day_path, "must be an integer"))?;
    if day < 1 || day > i64::from(expected_days) {
        return Err(ParseError::DayOutOfRange {
            path: day_path,
            day,
            expected_days,
        });
    }

    let meal_type = required_string(obj, "meal_type", path)?;
    let recipe = obj
        .get("recipe")
        .ok_or_else(|| invalid(format!("{path}.recipe"), "is required"))?;
    let recipe = parse_recipe(recipe, &format!("{path}.recipe"))?;

    Ok(ParsedMeal {
        // In range, so the conversion cannot truncate.
        day: day as u32,
        meal_type,
        recipe,
    })
}

fn parse_recipe(value: &Value, path: &str) -> Result<ParsedRecipe, ParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(path, "must be an object"))?;

    let name = required_string(obj, "name", path)?;
    let description = optional_string(obj, "description", path)?;
    let instructions = optional_string(obj, "instructions", path)?;
    let prep_time = optional_count(obj, "prep_time", path, 0)?;
    let cook_time = optional_count(obj, "cook_time", path, 0)?;
    let servings = optional_count(obj, "servings", path, 1)?;

    let ingredients_path = format!("{path}.ingredients");
    let ingredients = obj
        .get("ingredients")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(&ingredients_path, "must be an array"))?
        .iter()
        .enumerate()
        .map(|(i, line)| parse_ingredient(line, &format!("{ingredients_path}[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedRecipe {
        name,
        description,
        instructions,
        prep_time,
        cook_time,
        servings,
        ingredients,
    })
}

fn parse_ingredient(value: &Value, path: &str) -> Result<ParsedIngredient, ParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(path, "must be an object"))?;

    let name = required_string(obj, "name", path)?;
    let unit = required_string(obj, "unit", path)?;

    let quantity_path = format!("{path}.quantity");
    let number = match obj.get("quantity") {
        Some(Value::Number(n)) => n,
        _ => return Err(invalid(&quantity_path, "must be a number")),
    };
    // Go through the number's text so the decimal is exact.
    let quantity = BigDecimal::from_str(&number.to_string())
        .map_err(|_| invalid(&quantity_path, "must be a finite decimal"))?;
    if quantity < BigDecimal::from(0) {
        return Err(invalid(&quantity_path, "must not be negative"));
    }
    if quantity >= BigDecimal::from(QUANTITY_LIMIT) {
        return Err(invalid(&quantity_path, "must be less than 1000000000"));
    }
    if quantity.with_scale(QUANTITY_SCALE) != quantity {
        return Err(invalid(&quantity_path, "must have at most 3 decimal places"));
    }

    Ok(ParsedIngredient {
        name,
        quantity,
        unit,
    })
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn required_string(obj: &Map<String, Value>, key: &str, path: &str) -> Result<String, ParseError> {
    match obj.get(key).and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(invalid(format!("{path}.{key}"), "must be a non-empty string")),
    }
}

/// Absent or `null` yields an empty string.
fn optional_string(obj: &Map<String, Value>, key: &str, path: &str) -> Result<String, ParseError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(invalid(format!("{path}.{key}"), "must be a string")),
    }
}

/// Absent or `null` yields `None`; otherwise an integer in `min..=i32::MAX`.
fn optional_count(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    min: u32,
) -> Result<Option<u32>, ParseError> {
    let value = match obj.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let reason = if min == 0 {
        "must be a non-negative integer"
    } else {
        "must be a positive integer"
    };
    value
        .as_u64()
        .filter(|n| *n >= u64::from(min) && *n <= i32::MAX as u64)
        .map(|n| Some(n as u32))
        .ok_or_else(|| invalid(format!("{path}.{key}"), reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOUP: &str = r#"{"meals":[{"day":1,"meal_type":"dinner","recipe":{"name":"Soup","description":"","instructions":"","ingredients":[{"name":"Carrot","quantity":2,"unit":"pieces"}]}}]}"#;

    fn field_path(err: ParseError) -> String {
        match err {
            ParseError::InvalidField { path, .. } => path,
            other => panic!("expected InvalidField, got {other:?}"),
        }
    }

    #[test]
    fn parses_minimal_plan() {
        let plan = parse_meal_plan(SOUP, 1).expect("valid plan");
        assert_eq!(plan.meals.len(), 1);
        let meal = &plan.meals[0];
        assert_eq!(meal.day, 1);
        assert_eq!(meal.meal_type, "dinner");
        assert_eq!(meal.recipe.name, "Soup");
        assert_eq!(meal.recipe.prep_time, None);
        assert_eq!(meal.recipe.ingredients[0].quantity, BigDecimal::from(2));
    }

    #[test]
    fn missing_meals_is_missing_field() {
        let err = parse_meal_plan(r#"{"plan": []}"#, 7).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("meals")));

        let err = parse_meal_plan(r#"{"meals": {}}"#, 7).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("meals")));

        let err = parse_meal_plan("[]", 7).unwrap_err();
        assert!(matches!(err, ParseError::MissingField("meals")));
    }

    #[test]
    fn day_beyond_plan_length_is_rejected() {
        let raw = SOUP.replace(r#""day":1"#, r#""day":9"#);
        let err = parse_meal_plan(&raw, 7).unwrap_err();
        assert!(matches!(
            err,
            ParseError::DayOutOfRange {
                day: 9,
                expected_days: 7,
                ..
            }
        ));

        let raw = SOUP.replace(r#""day":1"#, r#""day":0"#);
        assert!(matches!(
            parse_meal_plan(&raw, 7).unwrap_err(),
            ParseError::DayOutOfRange { day: 0, .. }
        ));
    }

    #[test]
    fn non_integer_day_is_invalid_field() {
        let raw = SOUP.replace(r#""day":1"#, r#""day":"Monday""#);
        assert_eq!(field_path(parse_meal_plan(&raw, 7).unwrap_err()), "meals[0].day");
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = parse_meal_plan("Here is your plan: {meals: }", 7).unwrap_err();
        assert!(matches!(err, ParseError::MalformedPayload(_)));
    }

    #[test]
    fn one_code_fence_is_stripped() {
        let fenced = format!("```json\n{SOUP}\n```");
        assert_eq!(parse_meal_plan(&fenced, 1).unwrap().meals.len(), 1);

        let bare_fence = format!("```\n{SOUP}\n```");
        assert_eq!(parse_meal_plan(&bare_fence, 1).unwrap().meals.len(), 1);

        let unterminated = format!("```json\n{SOUP}");
        assert!(matches!(
            parse_meal_plan(&unterminated, 1).unwrap_err(),
            ParseError::MalformedPayload(_)
        ));
    }

    #[test]
    fn blank_strings_count_as_empty() {
        let raw = SOUP.replace(r#""meal_type":"dinner""#, r#""meal_type":"   ""#);
        assert_eq!(field_path(parse_meal_plan(&raw, 1).unwrap_err()), "meals[0].meal_type");

        let raw = SOUP.replace(r#""unit":"pieces""#, r#""unit":"""#);
        assert_eq!(
            field_path(parse_meal_plan(&raw, 1).unwrap_err()),
            "meals[0].recipe.ingredients[0].unit"
        );
    }

    #[test]
    fn strings_are_trimmed() {
        let raw = SOUP.replace(r#""name":"Carrot""#, r#""name":"  Carrot ""#);
        let plan = parse_meal_plan(&raw, 1).unwrap();
        assert_eq!(plan.meals[0].recipe.ingredients[0].name, "Carrot");
    }

    #[test]
    fn negative_or_textual_quantity_is_rejected() {
        let raw = SOUP.replace(r#""quantity":2"#, r#""quantity":-1"#);
        assert_eq!(
            field_path(parse_meal_plan(&raw, 1).unwrap_err()),
            "meals[0].recipe.ingredients[0].quantity"
        );

        let raw = SOUP.replace(r#""quantity":2"#, r#""quantity":"2""#);
        assert!(parse_meal_plan(&raw, 1).is_err());
    }

    #[test]
    fn quantities_are_exact_decimals() {
        let raw = SOUP.replace(r#""quantity":2"#, r#""quantity":0.1"#);
        let plan = parse_meal_plan(&raw, 1).unwrap();
        let expected: BigDecimal = "0.1".parse().unwrap();
        assert_eq!(plan.meals[0].recipe.ingredients[0].quantity, expected);
    }

    #[test]
    fn quantities_must_fit_the_stored_precision() {
        let path = "meals[0].recipe.ingredients[0].quantity";

        let raw = SOUP.replace(r#""quantity":2"#, r#""quantity":0.0004"#);
        assert_eq!(field_path(parse_meal_plan(&raw, 1).unwrap_err()), path);

        let raw = SOUP.replace(r#""quantity":2"#, r#""quantity":10000000000"#);
        assert_eq!(field_path(parse_meal_plan(&raw, 1).unwrap_err()), path);

        let raw = SOUP.replace(r#""quantity":2"#, r#""quantity":1000000000"#);
        assert_eq!(field_path(parse_meal_plan(&raw, 1).unwrap_err()), path);

        // Trailing zeros and the largest storable value are fine.
        let raw = SOUP.replace(r#""quantity":2"#, r#""quantity":1.2500"#);
        let plan = parse_meal_plan(&raw, 1).unwrap();
        let expected: BigDecimal = "1.25".parse().unwrap();
        assert_eq!(plan.meals[0].recipe.ingredients[0].quantity, expected);

        let raw = SOUP.replace(r#""quantity":2"#, r#""quantity":999999999.999"#);
        assert!(parse_meal_plan(&raw, 1).is_ok());
    }

    #[test]
    fn one_bad_meal_rejects_everything() {
        let raw = r#"{"meals":[
            {"day":1,"meal_type":"lunch","recipe":{"name":"Toast","ingredients":[]}},
            {"day":1,"meal_type":"dinner","recipe":{"ingredients":[]}}
        ]}"#;
        assert_eq!(field_path(parse_meal_plan(raw, 1).unwrap_err()), "meals[1].recipe.name");
    }

    #[test]
    fn optional_recipe_fields_are_validated_when_present() {
        let raw = r#"{"meals":[{"day":1,"meal_type":"lunch","recipe":{
            "name":"Toast","prep_time":5,"cook_time":null,"servings":2,"ingredients":[]}}]}"#;
        let recipe = &parse_meal_plan(raw, 1).unwrap().meals[0].recipe;
        assert_eq!(recipe.prep_time, Some(5));
        assert_eq!(recipe.cook_time, None);
        assert_eq!(recipe.servings, Some(2));
        assert_eq!(recipe.description, "");

        let raw = raw.replace(r#""servings":2"#, r#""servings":0"#);
        assert_eq!(
            field_path(parse_meal_plan(&raw, 1).unwrap_err()),
            "meals[0].recipe.servings"
        );
    }

    #[test]
    fn empty_meal_list_is_accepted() {
        let plan = parse_meal_plan(r#"{"meals": []}"#, 3).unwrap();
        assert!(plan.meals.is_empty());
    }

    #[test]
    fn suggestions_accept_array_or_wrapper() {
        let recipe = r#"{"name":"Salad","ingredients":[{"name":"Lettuce","quantity":1,"unit":"whole"}]}"#;
        assert_eq!(parse_recipe_suggestions(&format!("[{recipe}]")).unwrap().len(), 1);
        assert_eq!(
            parse_recipe_suggestions(&format!(r#"{{"recipes":[{recipe},{recipe}]}}"#))
                .unwrap()
                .len(),
            2
        );
        assert!(matches!(
            parse_recipe_suggestions(r#"{"meals": []}"#).unwrap_err(),
            ParseError::MissingField("recipes")
        ));
    }
}
