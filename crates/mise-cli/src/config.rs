//! Configuration file management for mise.
//!
//! Provides a TOML-based config file at `~/.config/mise/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mise_core::gateway::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT, GatewayConfig, ProviderKind,
};
use mise_db::config::DbConfig;

pub const PROVIDER_ENV: &str = "MISE_COMPLETION_PROVIDER";
pub const BASE_URL_ENV: &str = "MISE_COMPLETION_BASE_URL";
pub const MODEL_ENV: &str = "MISE_COMPLETION_MODEL";
pub const API_KEY_ENV: &str = "MISE_COMPLETION_API_KEY";
pub const TIMEOUT_ENV: &str = "MISE_COMPLETION_TIMEOUT_SECS";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub completion: CompletionSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSection {
    /// `openai` or `fake`.
    pub provider: String,
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CompletionSection {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default().to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the mise config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/mise` or `~/.config/mise`,
/// also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("mise");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("mise")
}

/// Return the path to the mise config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file may hold an API key, so it is made owner-only (0600) on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct MiseConfig {
    pub db_config: DbConfig,
    pub gateway: GatewayConfig,
}

impl MiseConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `MISE_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Each completion setting: `MISE_COMPLETION_*` > `[completion]` > built-in default
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let section = file_config
            .map(|cfg| cfg.completion)
            .unwrap_or_default();
        let gateway = resolve_gateway(section)?;

        Ok(Self { db_config, gateway })
    }
}

fn resolve_gateway(section: CompletionSection) -> Result<GatewayConfig> {
    let provider_name = std::env::var(PROVIDER_ENV).unwrap_or(section.provider);
    let provider: ProviderKind = provider_name
        .parse()
        .with_context(|| format!("invalid completion provider {provider_name:?}"))?;

    let timeout_secs = match std::env::var(TIMEOUT_ENV) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?,
        Err(_) => section.timeout_secs,
    };

    Ok(GatewayConfig {
        provider,
        base_url: std::env::var(BASE_URL_ENV).unwrap_or(section.base_url),
        model: std::env::var(MODEL_ENV).unwrap_or(section.model),
        api_key: std::env::var(API_KEY_ENV).ok().or(section.api_key),
        timeout: Duration::from_secs(timeout_secs),
    })
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
