//! Integration tests for embedded migrations and `table_counts`.

use mise_db::config::DbConfig;
use mise_db::pool;
use mise_test_utils::{create_test_db, drop_test_db, pg_url, test_db_url};

#[tokio::test]
async fn migrations_create_every_table() {
    let (pool, db_name) = create_test_db().await;

    let counts = pool::table_counts(&pool)
        .await
        .expect("table_counts should succeed");
    let names: Vec<&str> = counts.iter().map(|(name, _)| name.as_str()).collect();

    assert_eq!(
        names,
        vec![
            "ingredients",
            "meal_plan_recipes",
            "meal_plans",
            "recipe_ingredients",
            "recipes",
            "user_disliked_ingredients",
            "user_pantry",
            "user_preferences",
            "users",
        ]
    );
    assert!(counts.iter().all(|(_, count)| *count == 0));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let (pool, db_name) = create_test_db().await;

    pool::run_migrations(&pool)
        .await
        .expect("second run should be a no-op");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn negative_quantities_are_rejected_by_schema() {
    let (pool, db_name) = create_test_db().await;

    let result = sqlx::query(
        "INSERT INTO ingredients (name, cost_per_unit) VALUES ('Debt', -1)",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err(), "negative cost must violate CHECK");

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn ensure_database_exists_creates_only_when_missing() {
    let (pool, db_name) = create_test_db().await;
    pool.close().await;

    let existing = DbConfig::new(test_db_url(&db_name).await);
    let created = pool::ensure_database_exists(&existing)
        .await
        .expect("existing database should be accepted");
    assert!(!created);
    drop_test_db(&db_name).await;

    let fresh_name = format!("mise_ensure_{}", uuid::Uuid::new_v4().simple());
    let fresh = DbConfig::new(format!("{}/{fresh_name}", pg_url().await));
    let created = pool::ensure_database_exists(&fresh)
        .await
        .expect("missing database should be created");
    assert!(created);

    let again = pool::ensure_database_exists(&fresh)
        .await
        .expect("second call should succeed");
    assert!(!again);

    drop_test_db(&fresh_name).await;
}
