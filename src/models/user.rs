use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::warehouse_permission::WarehouseFlags;

/// Closed set of account roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "student")]
    Student,
    #[sea_orm(string_value = "teacher")]
    Teacher,
    #[sea_orm(string_value = "warehouse")]
    Warehouse,
    #[sea_orm(string_value = "admin")]
    Admin,
}

// Capability names, also used by the permission extractors
pub const REQUESTS_CREATE: &str = "requests.create";
pub const REQUESTS_CANCEL_OWN: &str = "requests.cancel_own";
pub const REQUESTS_CANCEL_ANY: &str = "requests.cancel_any";
pub const REQUESTS_REVIEW: &str = "requests.review";
pub const REQUESTS_DELIVER: &str = "requests.deliver";
pub const REQUESTS_VIEW_ALL: &str = "requests.view_all";
pub const MATERIALS_VIEW: &str = "materials.view";
pub const MATERIALS_MANAGE: &str = "materials.manage";
pub const STOCK_ADJUST: &str = "stock.adjust";
pub const DEBTS_VIEW_OWN: &str = "debts.view_own";
pub const DEBTS_VIEW_ALL: &str = "debts.view_all";
pub const DEBTS_SETTLE: &str = "debts.settle";
pub const USERS_VIEW: &str = "users.view";
pub const USERS_MANAGE: &str = "users.manage";
pub const AUDIT_VIEW: &str = "audit.view";
pub const AUDIT_MANAGE: &str = "audit.manage";
pub const CHAT_ACCESS: &str = "chat.access";

/// Warehouse capabilities that only apply with the stock-modify flag
const STOCK_MODIFY_CAPABILITIES: &[&str] = &[
    REQUESTS_DELIVER,
    DEBTS_SETTLE,
    STOCK_ADJUST,
    MATERIALS_MANAGE,
];

impl Role {
    /// Parse a role name as received from the API
    pub fn from_tag(tag: &str) -> crate::error::Result<Self> {
        match tag.trim().to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "warehouse" => Ok(Role::Warehouse),
            "admin" => Ok(Role::Admin),
            _ => Err(AppError::BadRequest("Rol inválido".to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Warehouse => "warehouse",
            Role::Admin => "admin",
        }
    }

    /// Capabilities granted by the role alone
    pub fn base_capabilities(self) -> &'static [&'static str] {
        match self {
            Role::Student => &[
                REQUESTS_CREATE,
                REQUESTS_CANCEL_OWN,
                MATERIALS_VIEW,
                DEBTS_VIEW_OWN,
            ],
            Role::Teacher => &[
                REQUESTS_CREATE,
                REQUESTS_REVIEW,
                MATERIALS_VIEW,
                DEBTS_VIEW_OWN,
            ],
            Role::Warehouse => &[
                MATERIALS_VIEW,
                REQUESTS_VIEW_ALL,
                REQUESTS_CANCEL_ANY,
                DEBTS_VIEW_ALL,
            ],
            Role::Admin => &[
                MATERIALS_VIEW,
                MATERIALS_MANAGE,
                STOCK_ADJUST,
                USERS_VIEW,
                USERS_MANAGE,
                AUDIT_VIEW,
                AUDIT_MANAGE,
                REQUESTS_VIEW_ALL,
                DEBTS_VIEW_ALL,
            ],
        }
    }

    /// Full capability set, including the fine-grained warehouse flags.
    /// Flags are ignored for every role other than warehouse.
    pub fn capabilities(self, flags: WarehouseFlags) -> Vec<&'static str> {
        let mut caps = self.base_capabilities().to_vec();
        if self == Role::Warehouse {
            if flags.stock_modify {
                caps.extend_from_slice(STOCK_MODIFY_CAPABILITIES);
            }
            if flags.chat_access {
                caps.push(CHAT_ACCESS);
            }
        }
        caps
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub role: Role,
    pub is_active: bool,
    pub group_id: Option<i64>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
    #[sea_orm(has_one = "super::warehouse_permission::Entity")]
    WarehousePermission,
    #[sea_orm(has_many = "super::request::Entity")]
    Requests,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::warehouse_permission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WarehousePermission.def()
    }
}

impl Related<super::request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
