//! PostgreSQL store configuration
//!
//! Optional: without a `database` section the service keeps conversations
//! in memory. With one, the embedded tutor schema is migrated at startup
//! unless `run_migrations` is turned off.

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use super::error::ValidationError;

/// Upper bound on pool size; exchanges hold a connection only per query.
const MAX_POOL_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://` URL; may carry a password
    pub url: Secret<String>,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a query may wait for a free connection before the store
    /// reports itself unavailable
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Apply `migrations/` on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Secret::new(url.into()),
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            idle_timeout_secs: default_idle_timeout(),
            run_migrations: default_run_migrations(),
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Pool options for the tutor store. A short acquire timeout keeps a
    /// saturated pool from stalling exchanges; the store maps it to
    /// `StoreError::Unavailable`.
    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout())
            .idle_timeout(self.idle_timeout())
    }

    /// URL with any password replaced, for logs.
    pub fn redacted_url(&self) -> String {
        let url = self.url.expose_secret();
        let Some((scheme, rest)) = url.split_once("://") else {
            return "<invalid>".to_string();
        };
        match rest.split_once('@') {
            Some((credentials, host)) => {
                let user = credentials.split(':').next().unwrap_or_default();
                format!("{}://{}:***@{}", scheme, user, host)
            }
            None => url.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self.url.expose_secret();
        if url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("DATABASE__URL"));
        }
        if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        if self.max_connections == 0 || self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        if self.max_connections > MAX_POOL_SIZE {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        if self.acquire_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_min_connections() -> u32 {
    1
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_ms() -> u64 {
    2000
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_run_migrations() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_tutor_defaults() {
        let config = DatabaseConfig::new("postgres://localhost/tutor");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(2));
        assert!(config.run_migrations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn redacted_url_hides_password() {
        let config = DatabaseConfig::new("postgresql://tutor:hunter2@db:5432/tutor");
        assert_eq!(config.redacted_url(), "postgresql://tutor:***@db:5432/tutor");

        let plain = DatabaseConfig::new("postgres://localhost/tutor");
        assert_eq!(plain.redacted_url(), "postgres://localhost/tutor");
    }

    #[test]
    fn debug_output_does_not_leak_url() {
        let config = DatabaseConfig::new("postgresql://tutor:hunter2@db/tutor");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn rejects_other_schemes() {
        let config = DatabaseConfig::new("mysql://localhost/tutor");
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidDatabaseUrl)
        ));
    }

    #[test]
    fn rejects_bad_pool_bounds() {
        let mut config = DatabaseConfig::new("postgres://localhost/tutor");
        config.min_connections = 20;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidPoolSize)));

        config.min_connections = 1;
        config.max_connections = 150;
        assert!(matches!(config.validate(), Err(ValidationError::PoolSizeTooLarge)));
    }

    #[test]
    fn rejects_zero_acquire_timeout() {
        let mut config = DatabaseConfig::new("postgres://localhost/tutor");
        config.acquire_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidTimeout)));
    }
}
