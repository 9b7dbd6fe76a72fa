//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults that suit a single-store deployment.

use std::env;

use thiserror::Error;

/// POS API configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port.
    pub http_port: u16,

    /// Path to the SQLite database file.
    pub database_path: String,

    /// tracing-subscriber env filter (e.g. "info,aurum_db=debug").
    pub log_filter: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            http_port: env::var("AURUM_HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("AURUM_HTTP_PORT".to_string()))?,

            database_path: env::var("AURUM_DB_PATH").unwrap_or_else(|_| "./aurum.db".to_string()),

            log_filter: env::var("AURUM_LOG").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Only meaningful when the env vars are unset, which is the normal
        // test environment.
        if env::var("AURUM_HTTP_PORT").is_err() {
            let config = ServerConfig::load().unwrap();
            assert_eq!(config.http_port, 8080);
        }
    }
}
