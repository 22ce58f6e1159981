use crate::config::constants::defaults;
use serde::{Deserialize, Serialize};

/// HTTP server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Agents kept in memory between requests; the least recently used is dropped first
    #[serde(default = "default_max_live_sessions")]
    pub max_live_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_live_sessions: default_max_live_sessions(),
        }
    }
}

fn default_bind_address() -> String {
    defaults::BIND_ADDRESS.to_string()
}
fn default_max_live_sessions() -> usize {
    defaults::MAX_LIVE_SESSIONS
}

/// SQLite database location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    defaults::DATABASE_PATH.to_string()
}

/// Logging destination and verbosity
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path; an empty string disables file output
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_log_level() -> String {
    defaults::LOG_LEVEL.to_string()
}
fn default_log_file() -> String {
    defaults::LOG_FILE.to_string()
}

/// Ads insight cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_expiration_hours")]
    pub expiration_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiration_hours: default_expiration_hours(),
        }
    }
}

fn default_expiration_hours() -> i64 {
    defaults::CACHE_EXPIRATION_HOURS
}
