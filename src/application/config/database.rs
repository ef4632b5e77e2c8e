use std::env;

use super::parse_env;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("LABSYNC_DATABASE_URL")
                .or_else(|_| env::var("DATABASE_URL"))
                .unwrap_or_else(|_| "sqlite://labsync.db?mode=rwc".to_string()),
            max_connections: parse_env("LABSYNC_DB_MAX_CONNECTIONS", 10),
            min_connections: parse_env("LABSYNC_DB_MIN_CONNECTIONS", 1),
            connect_timeout_secs: parse_env("LABSYNC_DB_CONNECT_TIMEOUT_SECS", 30),
            idle_timeout_secs: parse_env("LABSYNC_DB_IDLE_TIMEOUT_SECS", 600),
        }
    }

    /// Config for `url` with the default pool sizing
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            database_url: url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}
