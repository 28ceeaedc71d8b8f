mod config;
mod ingredient_cmds;
mod pantry_cmds;
mod plan_cmds;
mod prefs_cmds;
mod recipe_cmds;
mod resolve;
mod serve_cmd;
#[cfg(test)]
mod test_util;
mod user_cmds;

use clap::{Parser, Subcommand};

use mise_core::gateway::{self, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT};
use mise_db::pool;

use config::MiseConfig;

#[derive(Parser)]
#[command(name = "mise", about = "LLM-assisted meal planning and shopping lists")]
struct Cli {
    /// Database URL (overrides MISE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a mise config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/mise")]
        db_url: String,
        /// Completion provider (openai or fake)
        #[arg(long, default_value = "openai")]
        provider: String,
        /// Base URL of the OpenAI-compatible API
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
        /// Model identifier sent with each completion request
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
        /// API key (can also be supplied via MISE_COMPLETION_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
        /// Completion timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
        timeout_secs: u64,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the mise database (requires config file or env vars)
    DbInit,
    /// User management
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Ingredient catalogue and prices
    Ingredient {
        #[command(subcommand)]
        command: IngredientCommands,
    },
    /// Pantry stock
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Dietary, cuisine and budget preferences
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },
    /// Meal plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Recipe search and suggestions
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Serve the JSON API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user
    Add {
        /// Unique username
        username: String,
    },
}

#[derive(Subcommand)]
pub enum IngredientCommands {
    /// Add an ingredient to the catalogue
    Add {
        /// Ingredient name (case-sensitive, unique)
        name: String,
        /// Grocery category
        #[arg(long, default_value = "other")]
        category: String,
        /// Canonical unit
        #[arg(long, default_value = "pieces")]
        unit: String,
        /// Price per unit
        #[arg(long, default_value = "0")]
        cost: String,
    },
    /// List all ingredients
    List,
    /// Set the price of an ingredient
    Price {
        /// Ingredient name
        name: String,
        /// New price per unit
        cost: String,
    },
}

#[derive(Subcommand)]
pub enum PantryCommands {
    /// Add stock to a user's pantry
    Add {
        /// User ID or username
        user: String,
        /// Ingredient name (must exist in the catalogue)
        ingredient: String,
        /// Quantity in the ingredient's canonical unit
        quantity: String,
        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expires: Option<chrono::NaiveDate>,
    },
    /// List a user's pantry
    List {
        /// User ID or username
        user: String,
    },
    /// List pantry items expiring soon
    Expiring {
        /// User ID or username
        user: String,
        /// Look-ahead window in days
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Remove a pantry row
    Remove {
        /// User ID or username
        user: String,
        /// Pantry row ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum PrefsCommands {
    /// Create or replace a user's preferences
    Set {
        /// User ID or username
        user: String,
        /// Dietary restriction
        #[arg(long, default_value = "none")]
        dietary: String,
        /// Preferred cuisine
        #[arg(long, default_value = "american")]
        cuisine: String,
        /// Weekly budget (keeps the current budget when omitted)
        #[arg(long)]
        budget: Option<String>,
        /// Disliked ingredient name (repeatable; replaces the current set)
        #[arg(long = "dislike")]
        dislikes: Vec<String>,
        /// Clear all disliked ingredients
        #[arg(long, conflicts_with = "dislikes")]
        clear_dislikes: bool,
    },
    /// Show a user's preferences
    Show {
        /// User ID or username
        user: String,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Generate a meal plan with the completion service and store it
    Generate {
        /// User ID or username
        user: String,
        /// Number of days to plan
        #[arg(long, default_value_t = 7)]
        days: u32,
        /// Meals per day
        #[arg(long, default_value_t = 3)]
        meals_per_day: u32,
        /// Do not show the pantry to the model
        #[arg(long)]
        no_pantry: bool,
        /// First day of the plan (YYYY-MM-DD, default today)
        #[arg(long)]
        start: Option<chrono::NaiveDate>,
    },
    /// Show a meal plan with its meals and ingredients
    Show {
        /// Meal plan ID
        id: String,
    },
    /// List a user's meal plans, newest first
    List {
        /// User ID or username
        user: String,
        /// Only plans ending on or after this date
        #[arg(long)]
        from: Option<chrono::NaiveDate>,
        /// Only plans starting on or before this date
        #[arg(long)]
        until: Option<chrono::NaiveDate>,
    },
    /// Re-derive a plan's total cost from current ingredient prices
    Recost {
        /// Meal plan ID
        id: String,
    },
    /// Net shopping list for a plan against the owner's pantry
    ShoppingList {
        /// Meal plan ID
        id: String,
        /// Omit ingredients the pantry already covers
        #[arg(long)]
        omit_covered: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum RecipeCommands {
    /// Search stored recipes
    Search {
        /// Substring of the recipe name
        #[arg(long)]
        name: Option<String>,
        /// Required ingredient substring (repeatable)
        #[arg(long = "ingredient")]
        ingredients: Vec<String>,
        /// Dietary restriction to honour
        #[arg(long)]
        dietary: Option<String>,
        /// Maximum prep time in minutes
        #[arg(long)]
        max_prep: Option<i32>,
        /// Maximum cook time in minutes
        #[arg(long)]
        max_cook: Option<i32>,
        /// Minimum ingredient cost
        #[arg(long)]
        min_cost: Option<String>,
        /// Maximum ingredient cost
        #[arg(long)]
        max_cost: Option<String>,
        /// Maximum number of results (capped at 100)
        #[arg(long)]
        limit: Option<i64>,
        /// Number of results to skip
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Ask the completion service for recipe ideas (not stored)
    Suggest {
        /// User ID or username
        user: String,
        /// Number of suggestions
        #[arg(long, default_value_t = mise_core::plan::generate::DEFAULT_SUGGESTIONS)]
        count: u32,
    },
    /// Ask the completion service for variations of a stored recipe (not stored)
    Variations {
        /// Recipe ID
        recipe: String,
        /// Number of variations
        #[arg(long, default_value_t = mise_core::plan::generate::DEFAULT_SUGGESTIONS)]
        count: u32,
    },
}

// -----------------------------------------------------------------------
// Entry point
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            provider,
            base_url,
            model,
            api_key,
            timeout_secs,
            force,
        } => {
            let completion = config::CompletionSection {
                provider,
                base_url,
                model,
                api_key,
                timeout_secs,
            };
            cmd_init(&db_url, completion, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::User { command } => {
            let resolved = MiseConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = user_cmds::run_user_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Ingredient { command } => {
            let resolved = MiseConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = ingredient_cmds::run_ingredient_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Pantry { command } => {
            let resolved = MiseConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = pantry_cmds::run_pantry_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Prefs { command } => {
            let resolved = MiseConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = prefs_cmds::run_prefs_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plan { command } => {
            let resolved = MiseConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_plan_command(command, &db_pool, &resolved.gateway).await;
            db_pool.close().await;
            result?;
        }
        Commands::Recipe { command } => {
            let resolved = MiseConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                recipe_cmds::run_recipe_command(command, &db_pool, &resolved.gateway).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            let resolved = MiseConfig::resolve(cli.database_url.as_deref())?;
            let completion = gateway::gateway_from_config(&resolved.gateway)?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let state = serve_cmd::AppState {
                pool: db_pool.clone(),
                gateway: completion,
                timeout: resolved.gateway.timeout,
            };
            let result = serve_cmd::run_serve(state, &bind, port).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}

// -----------------------------------------------------------------------
// mise init
// -----------------------------------------------------------------------

fn cmd_init(db_url: &str, completion: config::CompletionSection, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    // Reject an unknown provider before anything is written.
    completion
        .provider
        .parse::<gateway::ProviderKind>()
        .map_err(anyhow::Error::from)?;

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        completion,
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url            = {db_url}");
    println!("  completion.provider     = {}", cfg.completion.provider);
    println!("  completion.model        = {}", cfg.completion.model);
    println!("  completion.base_url     = {}", cfg.completion.base_url);
    println!("  completion.timeout_secs = {}", cfg.completion.timeout_secs);
    match cfg.completion.api_key.as_deref() {
        Some(key) => println!("  completion.api_key      = {}", mask_secret(key)),
        None => println!("  completion.api_key      = (unset; use {})", config::API_KEY_ENV),
    }
    println!();
    println!("Next: run `mise db-init` to create and migrate the database.");

    Ok(())
}

/// Show only the ends of a secret.
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

// -----------------------------------------------------------------------
// mise db-init
// -----------------------------------------------------------------------

async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = MiseConfig::resolve(cli_db_url)?;

    println!("Initializing mise database...");

    // 1. Create the database if it does not exist.
    if pool::ensure_database_exists(&resolved.db_config).await? {
        println!("Created database at {}", resolved.db_config.database_url);
    }

    // 2. Connect to the target database.
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    // 3. Run the embedded migrations.
    pool::run_migrations(&db_pool).await?;

    // 4. Print success with table counts.
    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    // 5. Clean shutdown.
    db_pool.close().await;

    println!("mise db-init complete.");
    Ok(())
}
