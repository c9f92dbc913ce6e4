//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use bracket_engine::{BracketConfig, db::DatabaseConfig};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Bind address used when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Where matches are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Process memory, lost on restart
    #[default]
    Memory,
    /// PostgreSQL `bracket_matches` table
    Postgres,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => f.write_str("memory"),
            StorageBackend::Postgres => f.write_str("postgres"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND".to_string(),
                reason: format!("Unknown backend '{other}', expected 'memory' or 'postgres'"),
            }),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Match storage backend
    pub storage: StorageBackend,
    /// Database configuration, used by the Postgres backend
    pub database: DatabaseConfig,
    /// Bracket shape and seeding
    pub bracket: BracketConfig,
}

/// Values given on the command line, taking precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub storage: Option<StorageBackend>,
    pub slot_count: Option<usize>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed, or if the
    /// Postgres backend is selected without a database URL.
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_env_required("SERVER_BIND", DEFAULT_BIND)?,
        };

        let storage = match overrides.storage {
            Some(storage) => storage,
            None => match std::env::var("STORAGE_BACKEND") {
                Ok(value) => value.parse()?,
                Err(_) => StorageBackend::default(),
            },
        };

        let has_url = overrides.database_url.is_some() || std::env::var("DATABASE_URL").is_ok();
        if storage == StorageBackend::Postgres && !has_url {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Set it or pass --db-url, e.g. postgres://postgres@localhost/bracket_db"
                    .to_string(),
            });
        }
        let database = DatabaseConfig::from_env(overrides.database_url);

        let defaults = BracketConfig::default();
        let bracket = BracketConfig {
            slot_count: overrides
                .slot_count
                .unwrap_or_else(|| parse_env_or("BRACKET_SLOT_COUNT", defaults.slot_count)),
            shuffle_entrants: parse_env_or("BRACKET_SHUFFLE_ENTRANTS", defaults.shuffle_entrants),
        };

        let config = ServerConfig {
            bind,
            storage,
            database,
            bracket,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = self.bracket.validate() {
            return Err(ConfigError::Invalid {
                var: "BRACKET_SLOT_COUNT".to_string(),
                reason: e.to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse `key` if set, otherwise `default`; a set but malformed value is an error
fn parse_env_required<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("'{raw}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(bracket: BracketConfig) -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            storage: StorageBackend::Memory,
            database: DatabaseConfig::development(),
            bracket,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "Use --db-url".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("Use --db-url"));
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("Postgres".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert!(matches!(
            "sqlite".parse::<StorageBackend>(),
            Err(ConfigError::Invalid { .. })
        ));
        assert_eq!(StorageBackend::Postgres.to_string(), "postgres");
    }

    #[test]
    fn test_config_validation_slot_count() {
        assert!(config_with(BracketConfig::default()).validate().is_ok());

        let err = config_with(BracketConfig::with_slots(12))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == "BRACKET_SLOT_COUNT"));
    }

    #[test]
    fn test_config_validation_pool_bounds() {
        let mut config = config_with(BracketConfig::default());
        config.database.min_connections = 20;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var, .. } if var == "DB_MIN_CONNECTIONS"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = ServerConfig::from_env(ConfigOverrides {
            bind: Some("0.0.0.0:9000".parse().unwrap()),
            database_url: Some("postgres://override@localhost/db".to_string()),
            storage: Some(StorageBackend::Postgres),
            slot_count: Some(16),
        })
        .unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.database.database_url, "postgres://override@localhost/db");
        assert_eq!(config.bracket.slot_count, 16);
    }
}
