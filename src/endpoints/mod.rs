pub mod audit;
pub mod dashboard;
pub mod debts;
pub mod extractors;
pub mod materials;
pub mod requests;
pub mod users;

use axum::{middleware as axum_middleware, routing::get, Json, Router};

use crate::config::CONFIG;
use crate::error::Result;
use crate::middleware::{require_auth, AuthenticatedUser};
use crate::models::audit_log::{AuditAction, ResourceType};
use crate::state::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/version", get(get_version));

    // Protected routes (identity required)
    let protected_routes = Router::new()
        .nest("/api", api_routes(state.clone()))
        .layer(axum_middleware::from_fn_with_state(state, require_auth));

    public_routes.merge(protected_routes)
}

/// API routes under /api/* (protected by auth middleware)
fn api_routes(state: AppState) -> Router {
    Router::new()
        .nest("/materials", materials::materials_routes(state.clone()))
        .nest("/requests", requests::requests_routes(state.clone()))
        .nest("/debts", debts::debts_routes(state.clone()))
        .nest("/users", users::users_routes(state.clone()))
        .nest("/groups", users::groups_routes(state.clone()))
        .nest("/audit", audit::audit_routes(state.clone()))
        .nest("/dashboard", dashboard::dashboard_routes(state))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn get_version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "version": CONFIG.version,
        "commit_hash": CONFIG.commit_hash,
        "build_time": CONFIG.build_time,
    }))
}

/// Record the outcome of a state-changing call, then pass it through
pub(crate) async fn audited<T>(
    state: &AppState,
    actor: &AuthenticatedUser,
    action: AuditAction,
    resource_type: ResourceType,
    resource_id: impl ToString,
    result: Result<T>,
) -> Result<T> {
    match &result {
        Ok(_) => {
            state
                .audit
                .log_success(Some(actor), action, resource_type, resource_id, None)
                .await
        }
        Err(e) => {
            state
                .audit
                .log_failure(Some(actor), action, resource_type, resource_id, &e.to_string())
                .await
        }
    }
    result
}
