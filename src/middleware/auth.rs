//! Identity middleware for API routes
//!
//! The session gateway in front of the API authenticates the caller and
//! asserts their user id in a trusted header. This layer loads that user and
//! their warehouse flags; anything missing, unknown or inactive is a 401.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::config::CONFIG;
use crate::models::prelude::*;
use crate::models::user::{self, Role};
use crate::models::warehouse_permission::WarehouseFlags;
use crate::state::AppState;

/// Authenticated user stored in request extensions
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user: user::Model,
    pub flags: WarehouseFlags,
}

impl AuthenticatedUser {
    pub fn new(user: user::Model, flags: WarehouseFlags) -> Self {
        Self { user, flags }
    }

    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn permissions(&self) -> Vec<&'static str> {
        self.user.role.capabilities(self.flags)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions().contains(&permission)
    }
}

/// Auth middleware that resolves the asserted identity
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let user_id = match extract_user_id(&req) {
        Some(id) => id,
        None => return unauthorized_response("Sesión requerida"),
    };

    let auth_user = match load_user(&state, user_id).await {
        Ok(u) => u,
        Err(msg) => return unauthorized_response(&msg),
    };

    req.extensions_mut().insert(auth_user);

    next.run(req).await
}

fn extract_user_id(req: &Request) -> Option<i64> {
    let value = req.headers().get(CONFIG.auth.identity_header.as_str())?;
    value.to_str().ok()?.trim().parse().ok()
}

async fn load_user(state: &AppState, user_id: i64) -> Result<AuthenticatedUser, String> {
    let found_user = User::find_by_id(user_id)
        .filter(user::Column::IsActive.eq(true))
        .one(&state.db)
        .await
        .map_err(|e| {
            tracing::error!(user_id, error = %e, "Failed to load user");
            "Sesión inválida".to_string()
        })?
        .ok_or_else(|| "Usuario no encontrado o inactivo".to_string())?;

    let flags: WarehouseFlags = if found_user.role == Role::Warehouse {
        WarehousePermission::find_by_id(user_id)
            .one(&state.db)
            .await
            .map_err(|e| {
                tracing::error!(user_id, error = %e, "Failed to load warehouse flags");
                "Sesión inválida".to_string()
            })?
            .into()
    } else {
        WarehouseFlags::default()
    };

    Ok(AuthenticatedUser::new(found_user, flags))
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
