use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub timestamp: DateTimeUtc,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Option<String>, // JSON string for flexible data
    pub success: bool,
    pub error_message: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

// Audit action types
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum AuditAction {
    // Request workflow
    RequestCreated,
    RequestApproved,
    RequestRejected,
    RequestDelivered,
    RequestCancelled,
    RequestDeleted,
    DebtSettled,

    // Inventory
    MaterialCreated,
    MaterialUpdated,
    MaterialDeleted,
    StockAdjusted,

    // User management
    UserCreated,
    UserUpdated,
    UserDeleted,
    PermissionsChanged,
    GroupCreated,

    // Maintenance
    RequestsPurged,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::RequestCreated => write!(f, "request_created"),
            AuditAction::RequestApproved => write!(f, "request_approved"),
            AuditAction::RequestRejected => write!(f, "request_rejected"),
            AuditAction::RequestDelivered => write!(f, "request_delivered"),
            AuditAction::RequestCancelled => write!(f, "request_cancelled"),
            AuditAction::RequestDeleted => write!(f, "request_deleted"),
            AuditAction::DebtSettled => write!(f, "debt_settled"),
            AuditAction::MaterialCreated => write!(f, "material_created"),
            AuditAction::MaterialUpdated => write!(f, "material_updated"),
            AuditAction::MaterialDeleted => write!(f, "material_deleted"),
            AuditAction::StockAdjusted => write!(f, "stock_adjusted"),
            AuditAction::UserCreated => write!(f, "user_created"),
            AuditAction::UserUpdated => write!(f, "user_updated"),
            AuditAction::UserDeleted => write!(f, "user_deleted"),
            AuditAction::PermissionsChanged => write!(f, "permissions_changed"),
            AuditAction::GroupCreated => write!(f, "group_created"),
            AuditAction::RequestsPurged => write!(f, "requests_purged"),
        }
    }
}

// Resource types
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ResourceType {
    Request,
    Debt,
    Material,
    User,
    Group,
    System,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Request => write!(f, "request"),
            ResourceType::Debt => write!(f, "debt"),
            ResourceType::Material => write!(f, "material"),
            ResourceType::User => write!(f, "user"),
            ResourceType::Group => write!(f, "group"),
            ResourceType::System => write!(f, "system"),
        }
    }
}
