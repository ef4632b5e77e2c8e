use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Router,
};

use crate::config::CONFIG;
use crate::endpoints::extractors::{Json, Query};
use crate::error::Result;
use crate::middleware::permissions::{AuditManage, AuditView, Authorized};
use crate::services::audit::{clear_old_logs, get_audit_logs, AuditLogQuery, AuditLogResponse};
use crate::state::AppState;

/// Create audit routes
pub fn audit_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_audit_logs))
        .route("/clear", post(clear_audit_logs))
        .with_state(state)
}

/// List audit logs with filtering and pagination
async fn list_audit_logs(
    State(state): State<AppState>,
    _auth: Authorized<AuditView>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditLogResponse>> {
    let logs = get_audit_logs(&state.db, query).await?;
    Ok(Json(logs))
}

#[derive(serde::Deserialize, Default)]
pub struct ClearLogsRequest {
    pub days: Option<i64>,
}

#[derive(serde::Serialize)]
pub struct ClearLogsResponse {
    pub deleted: u64,
    pub message: String,
}

/// Clear audit logs past the retention window (admin only)
async fn clear_audit_logs(
    State(state): State<AppState>,
    _auth: Authorized<AuditManage>,
    body: Bytes,
) -> Result<Json<ClearLogsResponse>> {
    // Body is optional
    let request: ClearLogsRequest = if body.is_empty() {
        ClearLogsRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };
    let days = request
        .days
        .unwrap_or(CONFIG.maintenance.audit_retention_days)
        .max(0);
    let deleted = clear_old_logs(&state.db, days).await?;

    Ok(Json(ClearLogsResponse {
        deleted,
        message: format!(
            "Se eliminaron {} registros de auditoría con más de {} días",
            deleted, days
        ),
    }))
}
