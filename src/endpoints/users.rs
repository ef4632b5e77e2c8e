use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};
use serde::Deserialize;

use crate::endpoints::extractors::{Json, Path};
use crate::error::Result;
use crate::middleware::permissions::{Authenticated, Authorized, UsersManage, UsersView};
use crate::models::audit_log::{AuditAction, ResourceType};
use crate::models::group;
use crate::models::warehouse_permission::WarehouseFlags;
use crate::services::users::{self, NewUser, UserUpdate, UserView};
use crate::state::AppState;

/// Create users routes
pub fn users_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(get_current_user))
        .route(
            "/{user_id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route(
            "/{user_id}/warehouse-permissions",
            put(set_warehouse_permissions),
        )
        .with_state(state)
}

/// Create groups routes
pub fn groups_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

async fn list_users(
    State(state): State<AppState>,
    _auth: Authorized<UsersView>,
) -> Result<Json<Vec<UserView>>> {
    Ok(Json(users::list_users(&state.db).await?))
}

async fn get_current_user(auth: Authenticated) -> Json<UserView> {
    Json(UserView::new(auth.0.user, auth.0.flags))
}

async fn get_user(
    State(state): State<AppState>,
    _auth: Authorized<UsersView>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserView>> {
    Ok(Json(users::get_user(&state.db, user_id).await?))
}

async fn create_user(
    State(state): State<AppState>,
    auth: Authorized<UsersManage>,
    Json(new): Json<NewUser>,
) -> Result<(StatusCode, Json<UserView>)> {
    let created = users::create_user(&state.db, new).await?;

    state
        .audit
        .log_success(
            Some(&auth.0),
            AuditAction::UserCreated,
            ResourceType::User,
            created.user.id,
            Some(serde_json::json!({
                "email": created.user.email,
                "role": created.user.role,
            })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_user(
    State(state): State<AppState>,
    auth: Authorized<UsersManage>,
    Path(user_id): Path<i64>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserView>> {
    let updated = users::update_user(&state.db, user_id, update).await?;

    state
        .audit
        .log_success(
            Some(&auth.0),
            AuditAction::UserUpdated,
            ResourceType::User,
            user_id,
            Some(serde_json::json!({
                "role": updated.user.role,
                "is_active": updated.user.is_active,
            })),
        )
        .await;

    Ok(Json(updated))
}

async fn delete_user(
    State(state): State<AppState>,
    auth: Authorized<UsersManage>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode> {
    users::delete_user(&state.db, auth.user_id(), user_id).await?;

    state
        .audit
        .log_success(
            Some(&auth.0),
            AuditAction::UserDeleted,
            ResourceType::User,
            user_id,
            None,
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

async fn set_warehouse_permissions(
    State(state): State<AppState>,
    auth: Authorized<UsersManage>,
    Path(user_id): Path<i64>,
    Json(flags): Json<WarehouseFlags>,
) -> Result<Json<UserView>> {
    let updated = users::set_warehouse_permissions(&state.db, user_id, flags).await?;

    state
        .audit
        .log_success(
            Some(&auth.0),
            AuditAction::PermissionsChanged,
            ResourceType::User,
            user_id,
            Some(serde_json::json!({
                "chat_access": flags.chat_access,
                "stock_modify": flags.stock_modify,
            })),
        )
        .await;

    Ok(Json(updated))
}

async fn list_groups(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<Vec<group::Model>>> {
    Ok(Json(users::list_groups(&state.db).await?))
}

async fn create_group(
    State(state): State<AppState>,
    auth: Authorized<UsersManage>,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<group::Model>)> {
    let created = users::create_group(&state.db, &request.name).await?;

    state
        .audit
        .log_success(
            Some(&auth.0),
            AuditAction::GroupCreated,
            ResourceType::Group,
            created.id,
            Some(serde_json::json!({ "name": created.name })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(created)))
}
