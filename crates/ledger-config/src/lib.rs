//! # ledger-config
//!
//! Layered configuration loading for the audit ledger using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`LEDGER_*` prefix, `__` as separator)
//! 2. Project-level `./ledger.toml`
//! 3. User-level `~/.config/ledger/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `LEDGER_STORE__PATH` -> `store.path`,
//! `LEDGER_INTEGRITY__SECRET_KEY` -> `integrity.secret_key`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use ledger_config::LedgerConfig;
//!
//! let config = LedgerConfig::load_with_dotenv().expect("config");
//! if !config.integrity.is_configured() {
//!     eprintln!("hash chain runs with an empty key");
//! }
//! ```

mod error;
mod integrity;
mod query;
mod store;

pub use error::ConfigError;
pub use integrity::IntegrityConfig;
pub use query::QueryConfig;
pub use store::{IN_MEMORY_PATH, StoreConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project-local config file name.
const LOCAL_CONFIG_FILE: &str = "ledger.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub integrity: IntegrityConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

impl LedgerConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source cannot be parsed, or
    /// `ConfigError::InvalidValue` if a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration after loading `.env` from the current directory.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer extra providers.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("LEDGER_").split("__"))
    }

    /// Reject values the store cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "store.path".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.query.timeline_page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "query.timeline_page_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ledger").join("config.toml"))
    }
}
