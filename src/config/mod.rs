//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `PROMPTLAB` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use promptlab::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Analysis workers: {}", config.analysis.worker_count);
//! ```

mod analysis;
mod error;

pub use analysis::AnalysisConfig;
pub use error::{ConfigError, ValidationError};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Analysis execution configuration (worker pool)
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `PROMPTLAB` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `PROMPTLAB__ANALYSIS__WORKER_COUNT=8` -> `analysis.worker_count = 8`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PROMPTLAB")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.analysis.validate()?;
        Ok(())
    }
}
