//! User, group and warehouse-permission administration.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::models::prelude::*;
use crate::models::user::{self, Role};
use crate::models::warehouse_permission::{self, WarehouseFlags};
use crate::models::{debt, group};

const USER_NOT_FOUND: &str = "Usuario no encontrado";

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// A user together with their effective capabilities
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: user::Model,
    pub warehouse_flags: Option<WarehouseFlags>,
    pub permissions: Vec<&'static str>,
}

impl UserView {
    pub fn new(user: user::Model, flags: WarehouseFlags) -> Self {
        let permissions = user.role.capabilities(flags);
        let warehouse_flags = (user.role == Role::Warehouse).then_some(flags);
        Self {
            user,
            warehouse_flags,
            permissions,
        }
    }
}

pub async fn list_users(db: &DbConn) -> Result<Vec<UserView>> {
    let users = User::find()
        .find_also_related(WarehousePermission)
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?;

    Ok(users
        .into_iter()
        .map(|(u, perms)| UserView::new(u, perms.into()))
        .collect())
}

pub async fn get_user(db: &DbConn, id: i64) -> Result<UserView> {
    let (found, perms) = User::find_by_id(id)
        .find_also_related(WarehousePermission)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;
    Ok(UserView::new(found, perms.into()))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 120, message = "El nombre es obligatorio"))]
    pub name: String,
    #[validate(email(message = "Correo inválido"))]
    pub email: String,
    #[validate(length(min = 8, message = "La contraseña debe tener al menos 8 caracteres"))]
    pub password: String,
    pub role: String,
    pub group_id: Option<i64>,
}

/// Admin-created accounts are active immediately
pub async fn create_user(db: &DbConn, new: NewUser) -> Result<UserView> {
    new.validate()?;
    let role = Role::from_tag(&new.role)?;
    let email = new.email.trim().to_lowercase();

    let taken = User::find()
        .filter(user::Column::Email.eq(email.clone()))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(AppError::Conflict("El correo ya está registrado".to_string()));
    }
    if let Some(group_id) = new.group_id {
        ensure_group_exists(db, group_id).await?;
    }

    let now = Utc::now();
    let created = user::ActiveModel {
        name: Set(new.name.trim().to_string()),
        email: Set(email),
        hashed_password: Set(hash_password(&new.password)?),
        role: Set(role),
        is_active: Set(true),
        group_id: Set(new.group_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = created.id, role = %role, "User created");
    Ok(UserView::new(created, WarehouseFlags::default()))
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 120, message = "El nombre es obligatorio"))]
    pub name: Option<String>,
    pub role: Option<String>,
    /// `Some(None)` removes the group
    #[serde(default, deserialize_with = "present_or_null")]
    pub group_id: Option<Option<i64>>,
    /// false blocks the account
    pub is_active: Option<bool>,
}

/// Distinguishes an explicit `null` from an absent field
fn present_or_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

pub async fn update_user(db: &DbConn, id: i64, update: UserUpdate) -> Result<UserView> {
    update.validate()?;

    let found = User::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

    let mut active = found.into_active_model();
    if let Some(name) = update.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(tag) = update.role {
        active.role = Set(Role::from_tag(&tag)?);
    }
    if let Some(group_id) = update.group_id {
        if let Some(group_id) = group_id {
            ensure_group_exists(db, group_id).await?;
        }
        active.group_id = Set(group_id);
    }
    if let Some(is_active) = update.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await?;

    get_user(db, id).await
}

/// Hard-delete a user. Refused while they still owe material.
pub async fn delete_user(db: &DbConn, acting_user_id: i64, id: i64) -> Result<()> {
    if acting_user_id == id {
        return Err(AppError::BadRequest(
            "No puedes eliminar tu propia cuenta".to_string(),
        ));
    }

    let owing = Debt::find()
        .filter(debt::Column::UserId.eq(id))
        .filter(debt::Column::OutstandingQuantity.gt(0))
        .count(db)
        .await?;
    if owing > 0 {
        return Err(AppError::Conflict(
            "El usuario tiene adeudos pendientes".to_string(),
        ));
    }

    let txn = db.begin().await?;
    WarehousePermission::delete_many()
        .filter(warehouse_permission::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    let result = User::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(USER_NOT_FOUND.to_string()));
    }
    txn.commit().await?;

    tracing::info!(user_id = id, "User deleted");
    Ok(())
}

/// Create or replace a warehouse user's flags
pub async fn set_warehouse_permissions(
    db: &DbConn,
    id: i64,
    flags: WarehouseFlags,
) -> Result<UserView> {
    let found = User::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;
    if found.role != Role::Warehouse {
        return Err(AppError::BadRequest(
            "Solo el personal de almacén tiene permisos de almacén".to_string(),
        ));
    }

    let now = Utc::now();
    match WarehousePermission::find_by_id(id).one(db).await? {
        Some(existing) => {
            let mut active = existing.into_active_model();
            active.chat_access = Set(flags.chat_access);
            active.stock_modify = Set(flags.stock_modify);
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            warehouse_permission::ActiveModel {
                user_id: Set(id),
                chat_access: Set(flags.chat_access),
                stock_modify: Set(flags.stock_modify),
                updated_at: Set(now),
            }
            .insert(db)
            .await?;
        }
    }

    tracing::info!(
        user_id = id,
        chat_access = flags.chat_access,
        stock_modify = flags.stock_modify,
        "Warehouse permissions updated"
    );
    Ok(UserView::new(found, flags))
}

pub async fn list_groups(db: &DbConn) -> Result<Vec<group::Model>> {
    Ok(Group::find().order_by_asc(group::Column::Name).all(db).await?)
}

pub async fn create_group(db: &DbConn, name: &str) -> Result<group::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest(
            "El nombre del grupo es obligatorio".to_string(),
        ));
    }

    let taken = Group::find()
        .filter(group::Column::Name.eq(name))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(AppError::Conflict("El grupo ya existe".to_string()));
    }

    Ok(group::ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn ensure_group_exists(db: &DbConn, group_id: i64) -> Result<()> {
    Group::find_by_id(group_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::BadRequest("Grupo inexistente".to_string()))
}
