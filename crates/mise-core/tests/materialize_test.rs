//! Integration tests for plan materialization.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use mise_core::plan::{
    DEFAULT_COOK_TIME_MINUTES, DEFAULT_PREP_TIME_MINUTES, DEFAULT_SERVINGS, ParsedIngredient,
    ParsedMeal, ParsedMealPlan, ParsedRecipe, materialize_meal_plan, parse_meal_plan,
};
use mise_db::models::MeasurementUnit;
use mise_db::queries::{ingredients, meal_plans, users};
use mise_test_utils::{create_test_db, drop_test_db};

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, d).expect("valid date")
}

fn recipe(name: &str, lines: &[(&str, &str, &str)]) -> ParsedRecipe {
    ParsedRecipe {
        name: name.to_string(),
        description: String::new(),
        instructions: String::new(),
        prep_time: None,
        cook_time: None,
        servings: None,
        ingredients: lines
            .iter()
            .map(|(n, q, u)| ParsedIngredient {
                name: n.to_string(),
                quantity: q.parse().expect("valid decimal"),
                unit: u.to_string(),
            })
            .collect(),
    }
}

fn saffron_plan(dish: &str) -> ParsedMealPlan {
    ParsedMealPlan {
        meals: vec![ParsedMeal {
            day: 1,
            meal_type: "dinner".into(),
            recipe: recipe(dish, &[("Saffron", "0.5", "g"), ("Rice", "1", "cup")]),
        }],
    }
}

async fn ingredient_count(pool: &sqlx::PgPool, name: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM ingredients WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn materialized_plan_reads_back_intact() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "reader").await.unwrap();

    let raw = r#"{"meals":[
        {"day":1,"meal_type":"breakfast","recipe":{"name":"Porridge","ingredients":[
            {"name":"Oats","quantity":0.5,"unit":"cup"},
            {"name":"Milk","quantity":250,"unit":"ml"}]}},
        {"day":1,"meal_type":"dinner","recipe":{"name":"Omelette","prep_time":5,"cook_time":10,"servings":1,"ingredients":[
            {"name":"Egg","quantity":3,"unit":"pieces"},
            {"name":"Milk","quantity":50,"unit":"ml"}]}},
        {"day":2,"meal_type":"lunch","recipe":{"name":"Toast","ingredients":[
            {"name":"Bread","quantity":2,"unit":"slices"}]}}
    ]}"#;
    let parsed = parse_meal_plan(raw, 2).unwrap();

    let plan = materialize_meal_plan(&pool, &parsed, user.id, date(1), date(2))
        .await
        .expect("materialization should succeed");
    assert_eq!(plan.user_id, user.id);
    assert_eq!(plan.length_in_days(), 2);

    let detail = meal_plans::get_meal_plan_detail(&pool, plan.id)
        .await
        .unwrap()
        .expect("plan exists");
    assert_eq!(detail.meals.len(), 3);
    let mut days: Vec<i32> = detail.meals.iter().map(|m| m.day).collect();
    days.dedup();
    assert_eq!(days, vec![1, 2]);
    let lines: usize = detail.meals.iter().map(|m| m.ingredients.len()).sum();
    assert_eq!(lines, parsed.ingredient_line_count());

    // Insertion order survives within a day.
    assert_eq!(detail.meals[0].recipe.name, "Porridge");
    assert_eq!(detail.meals[1].recipe.name, "Omelette");

    let porridge = &detail.meals[0].recipe;
    assert_eq!(porridge.prep_time, DEFAULT_PREP_TIME_MINUTES);
    assert_eq!(porridge.cook_time, DEFAULT_COOK_TIME_MINUTES);
    assert_eq!(porridge.servings, DEFAULT_SERVINGS);
    assert_eq!(detail.meals[1].recipe.prep_time, 5);

    // Recipe lines keep the model's unit; the new ingredient gets the canonical one.
    let oats_line = &detail.meals[0].ingredients[1];
    assert_eq!(oats_line.ingredient_name, "Oats");
    assert_eq!(oats_line.unit, "cup");
    let oats = ingredients::get_ingredient_by_name(&pool, "Oats").await.unwrap().unwrap();
    assert_eq!(oats.unit, MeasurementUnit::Cups);
    let bread = ingredients::get_ingredient_by_name(&pool, "Bread").await.unwrap().unwrap();
    assert_eq!(bread.unit, MeasurementUnit::Pieces);

    // Milk appears twice but exists once.
    assert_eq!(ingredient_count(&pool, "Milk").await, 1);

    // Everything is new, so nothing is priced.
    assert_eq!(plan.total_cost, BigDecimal::from(0));
    assert_eq!(plan.unpriced_ingredients, 4);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn known_prices_flow_into_total_cost() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "budget").await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    ingredients::get_or_create_ingredient(&mut conn, "Rice", MeasurementUnit::Cups)
        .await
        .unwrap();
    drop(conn);
    ingredients::set_cost_per_unit(&pool, "Rice", &"0.80".parse().unwrap())
        .await
        .unwrap();

    let plan = materialize_meal_plan(&pool, &saffron_plan("Paella"), user.id, date(1), date(1))
        .await
        .unwrap();
    assert_eq!(plan.total_cost, "0.80".parse::<BigDecimal>().unwrap());
    assert_eq!(plan.unpriced_ingredients, 1, "saffron is still unpriced");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn sequential_plans_share_one_ingredient_row() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "seq").await.unwrap();

    materialize_meal_plan(&pool, &saffron_plan("Paella"), user.id, date(1), date(1))
        .await
        .unwrap();
    materialize_meal_plan(&pool, &saffron_plan("Risotto"), user.id, date(2), date(2))
        .await
        .unwrap();

    assert_eq!(ingredient_count(&pool, "Saffron").await, 1);
    assert_eq!(
        meal_plans::list_meal_plans_for_user(&pool, user.id, None, None)
            .await
            .unwrap()
            .len(),
        2
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn concurrent_plans_share_one_ingredient_row() {
    let (pool, db_name) = create_test_db().await;
    let user_id = users::insert_user(&pool, "conc").await.unwrap().id;

    let mut handles = Vec::new();
    for i in 0..4 {
        let pool = pool.clone();
        let plan = saffron_plan(&format!("Dish {i}"));
        handles.push(tokio::spawn(async move {
            materialize_meal_plan(&pool, &plan, user_id, date(1), date(1)).await
        }));
    }
    for handle in handles {
        handle
            .await
            .expect("task should not panic")
            .expect("materialization should succeed");
    }

    assert_eq!(ingredient_count(&pool, "Saffron").await, 1);
    assert_eq!(ingredient_count(&pool, "Rice").await, 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}

fn spice_plan(dish: &str, names: &[String]) -> ParsedMealPlan {
    let lines: Vec<(&str, &str, &str)> = names.iter().map(|n| (n.as_str(), "1", "g")).collect();
    ParsedMealPlan {
        meals: vec![ParsedMeal {
            day: 1,
            meal_type: "dinner".into(),
            recipe: recipe(dish, &lines),
        }],
    }
}

#[tokio::test]
async fn concurrent_plans_with_reversed_ingredients_both_commit() {
    let (pool, db_name) = create_test_db().await;
    let user_id = users::insert_user(&pool, "spices").await.unwrap().id;

    let names: Vec<String> = (0..30).map(|i| format!("Spice {i:02}")).collect();
    let reversed: Vec<String> = names.iter().rev().cloned().collect();
    let forward_plan = spice_plan("Forward", &names);
    let backward_plan = spice_plan("Backward", &reversed);

    for _ in 0..3 {
        let (forward, backward) = tokio::join!(
            materialize_meal_plan(&pool, &forward_plan, user_id, date(1), date(1)),
            materialize_meal_plan(&pool, &backward_plan, user_id, date(1), date(1)),
        );
        forward.expect("forward plan should commit");
        backward.expect("reversed plan should commit");
    }

    let spices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients WHERE name LIKE 'Spice %'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(spices, 30);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn failure_mid_sequence_rolls_everything_back() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "rollback").await.unwrap();

    // The second meal's negative quantity violates a CHECK constraint after
    // the first meal and a new ingredient were already written.
    let plan = ParsedMealPlan {
        meals: vec![
            ParsedMeal {
                day: 1,
                meal_type: "lunch".into(),
                recipe: recipe("Salad", &[("Lettuce", "1", "whole")]),
            },
            ParsedMeal {
                day: 1,
                meal_type: "dinner".into(),
                recipe: recipe("Broken", &[("Truffle", "-1", "g")]),
            },
        ],
    };

    let err = materialize_meal_plan(&pool, &plan, user.id, date(1), date(1))
        .await
        .expect_err("constraint violation should fail");
    assert!(err.to_string().contains("Truffle"), "error: {err}");

    let plans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meal_plans")
        .fetch_one(&pool)
        .await
        .unwrap();
    let ingredients: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients")
        .fetch_one(&pool)
        .await
        .unwrap();
    let recipes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((plans, ingredients, recipes), (0, 0, 0));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn day_outside_date_range_is_rejected_before_writing() {
    let (pool, db_name) = create_test_db().await;
    let user = users::insert_user(&pool, "range").await.unwrap();

    let mut plan = saffron_plan("Paella");
    plan.meals[0].day = 3;

    let result = materialize_meal_plan(&pool, &plan, user.id, date(1), date(2)).await;
    assert!(result.is_err());
    assert_eq!(ingredient_count(&pool, "Saffron").await, 0);

    pool.close().await;
    drop_test_db(&db_name).await;
}
