pub mod auth;
pub mod database;
pub mod maintenance;
pub mod server;

use once_cell::sync::Lazy;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server: server::ServerConfig,
    pub database: database::DatabaseConfig,
    pub auth: auth::AuthConfig,
    pub maintenance: maintenance::MaintenanceConfig,

    // Build info
    pub commit_hash: String,
    pub build_time: String,
    pub version: String,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server: server::ServerConfig::from_env(),
            database: database::DatabaseConfig::from_env(),
            auth: auth::AuthConfig::from_env(),
            maintenance: maintenance::MaintenanceConfig::from_env(),

            commit_hash: env::var("COMMIT_HASH").unwrap_or_else(|_| "unknown".to_string()),
            build_time: env::var("BUILD_TIME").unwrap_or_else(|_| "unknown".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),

            log_level: env::var("LABSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

/// Read `key` as `T`, falling back to `default` when unset or unparsable
pub(crate) fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = Config::from_env();
        assert!(!config.version.is_empty());
        assert!(config.maintenance.request_retention_days > 0);
        assert!(!config.auth.identity_header.is_empty());
        assert!(config.database.max_connections >= config.database.min_connections);
    }

    #[test]
    fn test_parse_env_falls_back_on_garbage() {
        env::set_var("LABSYNC_TEST_GARBAGE_NUMBER", "not-a-number");
        assert_eq!(parse_env("LABSYNC_TEST_GARBAGE_NUMBER", 42i64), 42);
    }

    #[test]
    fn test_parse_env_reads_value() {
        env::set_var("LABSYNC_TEST_RETENTION", "14");
        assert_eq!(parse_env("LABSYNC_TEST_RETENTION", 7i64), 14);
    }

    #[test]
    fn test_pool_size_from_env() {
        env::set_var("LABSYNC_DB_MAX_CONNECTIONS", "4");
        let config = database::DatabaseConfig::from_env();
        env::remove_var("LABSYNC_DB_MAX_CONNECTIONS");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.connect_timeout_secs, 30);
    }
}
