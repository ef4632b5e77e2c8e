use crate::db::DbConn;
use crate::services::audit::AuditService;

/// Application state containing all shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DbConn,
    pub audit: AuditService,
}

impl AppState {
    pub fn new(db: DbConn, audit: AuditService) -> Self {
        Self { db, audit }
    }
}
