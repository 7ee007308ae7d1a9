//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/reforger-stats/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/reforger-stats/` (~/.config/reforger-stats/)
//! - Data: `$XDG_DATA_HOME/reforger-stats/` (~/.local/share/reforger-stats/)
//! - State/Logs: `$XDG_STATE_HOME/reforger-stats/` (~/.local/state/reforger-stats/)

use crate::db::TableName;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "reforger-stats";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Stats database location and timeouts
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Stats command configuration
    #[serde(default)]
    pub stats: StatsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Stats database configuration
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite stats database (defaults to the XDG data dir)
    pub path: Option<PathBuf>,

    /// Upper bound for one lookup, including waits on the database lock
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Number of read-only connections shared by concurrent lookups
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            query_timeout_ms: default_query_timeout_ms(),
            pool_size: default_pool_size(),
        }
    }
}

fn default_query_timeout_ms() -> u64 {
    5000
}

fn default_pool_size() -> u32 {
    4
}

/// Stats command configuration
#[derive(Debug, Deserialize)]
pub struct StatsConfig {
    /// Name of the stats table (required)
    pub table: Option<String>,

    /// Name of the player registry table
    #[serde(default = "default_registry_table")]
    pub registry_table: String,

    /// Number of game servers writing into the stats table
    #[serde(default = "default_servers")]
    pub servers: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            table: None,
            registry_table: default_registry_table(),
            servers: default_servers(),
        }
    }
}

fn default_registry_table() -> String {
    "players".to_string()
}

fn default_servers() -> u32 {
    1
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Validated settings a lookup runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSettings {
    pub stats_table: TableName,
    pub registry_table: TableName,
    /// Valid server scopes are `1..=servers`
    pub servers: u32,
    pub query_timeout: Duration,
}

impl StatsSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let table = config.stats.table.as_deref().ok_or_else(|| {
            Error::Config("stats.table is required: set the name of the stats table".to_string())
        })?;

        if config.stats.servers == 0 {
            return Err(Error::Config(
                "stats.servers must be at least 1".to_string(),
            ));
        }
        if config.database.query_timeout_ms == 0 {
            return Err(Error::Config(
                "database.query_timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            stats_table: TableName::new(table)?,
            registry_table: TableName::new(&config.stats.registry_table)?,
            servers: config.stats.servers,
            query_timeout: Duration::from_millis(config.database.query_timeout_ms),
        })
    }
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Validated lookup settings
    pub fn settings(&self) -> Result<StatsSettings> {
        StatsSettings::from_config(self)
    }

    /// Configured database path, or the default under the data directory
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Self::database_path)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/reforger-stats/config.toml` (~/.config/reforger-stats/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join(APP_DIR).join("config.toml")
    }

    /// Returns the data directory path
    ///
    /// `$XDG_DATA_HOME/reforger-stats/` (~/.local/share/reforger-stats/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join(APP_DIR)
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/reforger-stats/` (~/.local/state/reforger-stats/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join(APP_DIR)
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/reforger-stats/stats.db`
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("stats.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/reforger-stats/reforger-stats.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("reforger-stats.log")
    }
}
