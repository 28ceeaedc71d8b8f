//! CLI handlers for `mise user` subcommands.

use anyhow::{Context, Result};
use sqlx::PgPool;

use mise_db::queries::users;

use crate::UserCommands;

/// Dispatch a `UserCommands` variant to the appropriate handler.
pub async fn run_user_command(command: UserCommands, pool: &PgPool) -> Result<()> {
    match command {
        UserCommands::Add { username } => cmd_add(pool, &username).await,
    }
}

async fn cmd_add(pool: &PgPool, username: &str) -> Result<()> {
    let user = users::insert_user(pool, username)
        .await
        .with_context(|| format!("failed to add user {username:?} (is the name already taken?)"))?;

    println!("User created:");
    println!("  ID:       {}", user.id);
    println!("  Username: {}", user.username);

    Ok(())
}
