//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `SOCRATIC_TUTOR` prefix
//! and nested values are separated by a double underscore.
//!
//! # Example
//!
//! ```no_run
//! use socratic_tutor::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod ai;
mod database;
mod error;
mod server;
mod tutor;

pub use ai::{AiConfig, AiProviderKind};
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use tutor::TutorConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection; the in-memory store is used when absent
    pub database: Option<DatabaseConfig>,

    /// AI provider configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Context assembly and exchange tunables
    #[serde(default)]
    pub tutor: TutorConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SOCRATIC_TUTOR` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// - `SOCRATIC_TUTOR__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `SOCRATIC_TUTOR__TUTOR__MAX_CONTEXT_CHARS=6000` -> `tutor.max_context_chars = 6000`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SOCRATIC_TUTOR")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.ai.validate(&self.server.environment)?;
        self.tutor.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
