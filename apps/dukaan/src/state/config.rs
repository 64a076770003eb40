//! # Application Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DUKAAN_STOCK_POLICY=reject_insufficient                            │
//! │     DUKAAN_LOG=debug                                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/dukaan/dukaan.toml (Linux)                               │
//! │     ~/Library/Application Support/in.dukaan.pos/dukaan.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │                                                                         │
//! │  DUKAAN_DB_PATH is not a config key: the path resolver reads it        │
//! │  before anything else.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # dukaan.toml
//! [database]
//! file_name = "dukaan.db"
//! legacy_dir = "C:/Dukaan"   # where older releases kept the file
//! max_connections = 5
//! busy_timeout_secs = 5
//!
//! [sales]
//! stock_policy = "allow_negative"  # allow_negative | reject_insufficient
//!
//! [logging]
//! filter = "info,dukaan=debug,sqlx=warn"
//! ```

use dukaan_core::StockPolicy;
use dukaan_db::{DbConfig, PathResolver};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the config file inside the OS config directory.
pub const CONFIG_FILE_NAME: &str = "dukaan.toml";

/// Log filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_LOG_FILTER: &str = "info,dukaan=debug,sqlx=warn";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config directory available on this system")]
    NoConfigDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Where the database lives and how the pool is sized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// File name used in both the legacy and the application-data location.
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Directory older releases kept the database in.
    /// Default: the current working directory.
    #[serde(default)]
    pub legacy_dir: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked file.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_file_name() -> String {
    dukaan_db::resolver::DEFAULT_FILE_NAME.to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            file_name: default_file_name(),
            legacy_dir: None,
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesSettings {
    #[serde(default)]
    pub stock_policy: StockPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives. `RUST_LOG` still wins when set.
    #[serde(default)]
    pub filter: Option<String>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sales: SalesSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (dukaan.toml)
    /// 3. Environment variables
    ///
    /// An explicit `config_path` that does not exist is an error; a missing
    /// file at the default location is not.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    fn from_file(path: &Path) -> ConfigResult<Self> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(path)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let name = self.database.file_name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("database.file_name must not be empty".into()));
        }
        if name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "database.file_name must be a bare file name, got: {}",
                name
            )));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `DUKAAN_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("DUKAAN_DB_FILE_NAME") {
            debug!(file_name = %name, "Overriding database file name from environment");
            self.database.file_name = name;
        }

        if let Some(dir) = lookup("DUKAAN_LEGACY_DIR") {
            self.database.legacy_dir = Some(PathBuf::from(dir));
        }

        if let Some(max) = lookup("DUKAAN_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring non-numeric DUKAAN_MAX_CONNECTIONS"),
            }
        }

        if let Some(secs) = lookup("DUKAAN_BUSY_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_secs = n,
                Err(_) => warn!(value = %secs, "Ignoring non-numeric DUKAAN_BUSY_TIMEOUT_SECS"),
            }
        }

        if let Some(policy) = lookup("DUKAAN_STOCK_POLICY") {
            match parse_stock_policy(&policy) {
                Some(p) => {
                    debug!(policy = ?p, "Overriding stock policy from environment");
                    self.sales.stock_policy = p;
                }
                None => warn!(value = %policy, "Unknown stock policy in environment"),
            }
        }

        if let Some(filter) = lookup("DUKAAN_LOG") {
            self.logging.filter = Some(filter);
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("in", "dukaan", "pos").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool settings for the database at `path`.
    pub fn db_config(&self, path: impl Into<PathBuf>) -> DbConfig {
        DbConfig::new(path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs))
            .stock_policy(self.sales.stock_policy)
    }

    /// Resolver over the legacy location and the OS application-data
    /// directory, honouring `DUKAAN_DB_PATH`.
    pub fn path_resolver(&self) -> PathResolver {
        PathResolver::from_environment(&self.database.file_name, self.database.legacy_dir.as_deref())
    }

    /// The log filter to use when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &str {
        self.logging
            .filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_LOG_FILTER)
    }
}

fn parse_stock_policy(raw: &str) -> Option<StockPolicy> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "allow_negative" => Some(StockPolicy::AllowNegative),
        "reject_insufficient" | "reject" => Some(StockPolicy::RejectInsufficient),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.file_name, "dukaan.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.sales.stock_policy, StockPolicy::AllowNegative);
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [sales]
            stock_policy = "reject_insufficient"
            "#,
        )
        .unwrap();

        assert_eq!(config.sales.stock_policy, StockPolicy::RejectInsufficient);
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("DUKAAN_STOCK_POLICY", "reject-insufficient"),
            ("DUKAAN_MAX_CONNECTIONS", "2"),
            ("DUKAAN_BUSY_TIMEOUT_SECS", "soon"),
            ("DUKAAN_LOG", "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.sales.stock_policy, StockPolicy::RejectInsufficient);
        assert_eq!(config.database.max_connections, 2);
        // Unparseable values are ignored
        assert_eq!(config.database.busy_timeout_secs, 5);
        assert_eq!(config.log_filter(), "warn");
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.database.file_name = "data/dukaan.db".to_string();
        assert!(config.validate().is_err());

        config.database.file_name = "  ".to_string();
        assert!(config.validate().is_err());

        config.database.file_name = "shop.db".to_string();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join(CONFIG_FILE_NAME);

        let mut config = AppConfig::default();
        config.database.legacy_dir = Some(PathBuf::from("/srv/dukaan"));
        config.sales.stock_policy = StockPolicy::RejectInsufficient;

        assert_eq!(config.save(Some(path.clone())).unwrap(), path);
        assert_eq!(AppConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(AppConfig::load(Some(missing)), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_unparseable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[database\nfile_name = ").unwrap();

        assert!(matches!(AppConfig::load(Some(path.clone())), Err(ConfigError::Parse(_))));
        assert_eq!(AppConfig::load_or_default(Some(path)).database, DatabaseSettings::default());
    }

    #[test]
    fn test_db_config_carries_settings() {
        let mut config = AppConfig::default();
        config.database.max_connections = 3;
        config.sales.stock_policy = StockPolicy::RejectInsufficient;

        let db = config.db_config("/tmp/dukaan.db");
        assert_eq!(db.max_connections, 3);
        assert_eq!(db.busy_timeout, Duration::from_secs(5));
        assert_eq!(db.stock_policy, StockPolicy::RejectInsufficient);
    }
}
