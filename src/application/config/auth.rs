use std::env;

/// Identity assertion from the upstream session gateway
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Header carrying the authenticated user id (env: `LABSYNC_IDENTITY_HEADER`)
    pub identity_header: String,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            identity_header: env::var("LABSYNC_IDENTITY_HEADER")
                .map(|v| v.to_lowercase())
                .unwrap_or_else(|_| "x-user-id".to_string()),
        }
    }
}
