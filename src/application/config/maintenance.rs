use super::parse_env;

/// Retention windows and thresholds for background maintenance
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Age in days after which rejected/cancelled requests are purged
    pub request_retention_days: i64,
    /// Seconds between purge runs
    pub purge_interval_secs: u64,
    pub audit_retention_days: i64,
    /// Materials at or below this quantity are reported as low stock
    pub low_stock_threshold: i32,
}

impl MaintenanceConfig {
    pub fn from_env() -> Self {
        Self {
            request_retention_days: parse_env("LABSYNC_REQUEST_RETENTION_DAYS", 7),
            purge_interval_secs: parse_env("LABSYNC_PURGE_INTERVAL_SECS", 3600),
            audit_retention_days: parse_env("LABSYNC_AUDIT_RETENTION_DAYS", 90),
            low_stock_threshold: parse_env("LABSYNC_LOW_STOCK_THRESHOLD", 5),
        }
    }
}
