//! Where the mise store lives.
//!
//! A single PostgreSQL URL names the store. `mise db-init` also needs the
//! server's `postgres` database to create the store when it is missing, so
//! the URL is split into its base, database name and query parameters here.

use std::env;

#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL, query parameters included.
    pub database_url: String,
}

impl DbConfig {
    /// Local store used when nothing else is configured.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/mise";

    /// Environment variable read by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "MISE_DATABASE_URL";

    /// `MISE_DATABASE_URL`, or [`DEFAULT_URL`](Self::DEFAULT_URL) when unset.
    pub fn from_env() -> Self {
        let database_url =
            env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self { database_url }
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// `(server part, database name, query)` where the query keeps its `?`.
    fn split_url(&self) -> Option<(&str, &str, &str)> {
        let url = self.database_url.as_str();
        let (base, query) = match url.find('?') {
            Some(pos) => url.split_at(pos),
            None => (url, ""),
        };
        let (server, name) = base.rsplit_once('/')?;
        // postgresql://host has no path; its last '/' belongs to "//".
        if server.ends_with('/') {
            return None;
        }
        Some((server, name, query))
    }

    /// Name of the store database, or `None` when the URL has no path.
    pub fn database_name(&self) -> Option<&str> {
        self.split_url()
            .map(|(_, name, _)| name)
            .filter(|name| !name.is_empty())
    }

    /// The same server and query parameters pointed at the `postgres`
    /// maintenance database.
    pub fn maintenance_url(&self) -> String {
        match self.split_url() {
            Some((server, _, query)) => format!("{server}/postgres{query}"),
            None => self.database_url.clone(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_names_the_mise_store() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL);
        assert_eq!(cfg.database_name(), Some("mise"));
        assert_eq!(cfg.maintenance_url(), "postgresql://localhost:5432/postgres");
    }

    #[test]
    fn query_parameters_survive_the_switch_to_maintenance() {
        let cfg = DbConfig::new("postgresql://cook@db:5432/meals?sslmode=require");
        assert_eq!(cfg.database_name(), Some("meals"));
        assert_eq!(
            cfg.maintenance_url(),
            "postgresql://cook@db:5432/postgres?sslmode=require"
        );
    }

    #[test]
    fn url_without_a_database() {
        for url in ["postgresql://localhost:5432", "postgresql://localhost:5432/"] {
            let cfg = DbConfig::new(url);
            assert_eq!(cfg.database_name(), None, "{url}");
        }
    }
}
