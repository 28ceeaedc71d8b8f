use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::{debug, info};

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/mise-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Upper bound on open connections per pool.
pub const MAX_CONNECTIONS: u32 = 5;

/// How long a caller waits for a free connection.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Every table the migrations create, in name order.
pub const DOMAIN_TABLES: [&str; 9] = [
    "ingredients",
    "meal_plan_recipes",
    "meal_plans",
    "recipe_ingredients",
    "recipes",
    "user_disliked_ingredients",
    "user_pantry",
    "user_preferences",
    "users",
];

/// Connect a bounded pool to the configured database.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))?;
    debug!(max_connections = MAX_CONNECTIONS, "database pool ready");
    Ok(pool)
}

/// Apply any embedded migrations the database has not seen yet.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to apply mise schema migrations")?;

    info!(migrations = MIGRATOR.iter().count(), "schema up to date");
    Ok(())
}

/// `CREATE DATABASE` takes no bind parameters, so the name is spliced into
/// the statement and must be a plain identifier.
fn check_database_name(name: &str) -> Result<()> {
    let plain = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    let leading_digit = name.chars().next().is_some_and(|c| c.is_ascii_digit());
    if !plain || leading_digit {
        bail!("database name {name:?} must be letters, digits and underscores");
    }
    Ok(())
}

/// Create the configured database through the `postgres` maintenance
/// database if it is missing. Returns `true` when it was created.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<bool> {
    let db_name = config
        .database_name()
        .context("database URL names no database")?;
    check_database_name(db_name)?;

    let maintenance_url = config.maintenance_url();
    let maint_pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&maintenance_url)
        .await
        .with_context(|| format!("failed to connect to maintenance database at {maintenance_url}"))?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&maint_pool)
            .await
            .context("failed to look up database in pg_database")?;

    let created = if exists {
        debug!(db = db_name, "database present");
        false
    } else {
        maint_pool
            .execute(format!("CREATE DATABASE {db_name}").as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "database created");
        true
    };

    maint_pool.close().await;
    Ok(created)
}

/// Row count of each table in [`DOMAIN_TABLES`].
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    let mut counts = Vec::with_capacity(DOMAIN_TABLES.len());
    for table in DOMAIN_TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table}"))?;
        counts.push((table.to_string(), count));
    }
    Ok(counts)
}
