use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::db::DbConn;
use crate::error::Result;
use crate::middleware::AuthenticatedUser;
use crate::models::audit_log::{self, AuditAction, ResourceType};

/// Audit service for workflow events
#[derive(Clone)]
pub struct AuditService {
    db: DbConn,
}

impl AuditService {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    /// Insert one audit entry
    #[allow(clippy::too_many_arguments)]
    pub async fn log(
        &self,
        action: AuditAction,
        resource_type: ResourceType,
        resource_id: Option<String>,
        user_id: Option<i64>,
        username: Option<String>,
        details: Option<serde_json::Value>,
        success: bool,
        error_message: Option<String>,
    ) -> Result<()> {
        let log_entry = audit_log::ActiveModel {
            timestamp: Set(chrono::Utc::now()),
            user_id: Set(user_id),
            username: Set(username),
            action: Set(action.to_string()),
            resource_type: Set(resource_type.to_string()),
            resource_id: Set(resource_id),
            details: Set(details.map(|d| d.to_string())),
            success: Set(success),
            error_message: Set(error_message),
            ..Default::default()
        };

        log_entry.insert(&self.db).await?;
        Ok(())
    }

    /// Record a successful action by `actor`. Never fails the caller.
    pub async fn log_success(
        &self,
        actor: Option<&AuthenticatedUser>,
        action: AuditAction,
        resource_type: ResourceType,
        resource_id: impl ToString,
        details: Option<serde_json::Value>,
    ) {
        let result = self
            .log(
                action,
                resource_type,
                Some(resource_id.to_string()),
                actor.map(|a| a.id()),
                actor.map(|a| a.user.name.clone()),
                details,
                true,
                None,
            )
            .await;

        if let Err(e) = result {
            tracing::warn!(action = %action, error = %e, "Failed to write audit entry");
        }
    }

    /// Record a refused or failed action by `actor`. Never fails the caller.
    pub async fn log_failure(
        &self,
        actor: Option<&AuthenticatedUser>,
        action: AuditAction,
        resource_type: ResourceType,
        resource_id: impl ToString,
        error: &str,
    ) {
        let result = self
            .log(
                action,
                resource_type,
                Some(resource_id.to_string()),
                actor.map(|a| a.id()),
                actor.map(|a| a.user.name.clone()),
                None,
                false,
                Some(error.to_string()),
            )
            .await;

        if let Err(e) = result {
            tracing::warn!(action = %action, error = %e, "Failed to write audit entry");
        }
    }
}

/// Query parameters for fetching audit logs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub user_id: Option<i64>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub success: Option<bool>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
    pub search: Option<String>,
}

/// Paginated audit log response
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogResponse {
    pub logs: Vec<audit_log::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

/// Get audit logs with filtering and pagination
pub async fn get_audit_logs(db: &DbConn, query: AuditLogQuery) -> Result<AuditLogResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut select = audit_log::Entity::find();

    if let Some(user_id) = query.user_id {
        select = select.filter(audit_log::Column::UserId.eq(user_id));
    }

    if let Some(action) = &query.action {
        select = select.filter(audit_log::Column::Action.eq(action.clone()));
    }

    if let Some(resource_type) = &query.resource_type {
        select = select.filter(audit_log::Column::ResourceType.eq(resource_type.clone()));
    }

    if let Some(success) = query.success {
        select = select.filter(audit_log::Column::Success.eq(success));
    }

    if let Some(from) = query.from {
        select = select.filter(audit_log::Column::Timestamp.gte(from));
    }

    if let Some(to) = query.to {
        select = select.filter(audit_log::Column::Timestamp.lte(to));
    }

    if let Some(search) = &query.search {
        select = select.filter(
            audit_log::Column::Username
                .contains(search)
                .or(audit_log::Column::Action.contains(search))
                .or(audit_log::Column::ResourceId.contains(search))
                .or(audit_log::Column::Details.contains(search)),
        );
    }

    let total = select.clone().count(db).await?;

    let logs = select
        .order_by_desc(audit_log::Column::Timestamp)
        .order_by_desc(audit_log::Column::Id)
        .offset(offset)
        .limit(per_page)
        .all(db)
        .await?;

    let total_pages = total.div_ceil(per_page);

    Ok(AuditLogResponse {
        logs,
        total,
        page,
        per_page,
        total_pages,
    })
}

/// Clear audit logs older than `days` (retention policy)
pub async fn clear_old_logs(db: &DbConn, days: i64) -> Result<u64> {
    let cutoff = chrono::Utc::now() - chrono::Duration::days(days);

    let result = audit_log::Entity::delete_many()
        .filter(audit_log::Column::Timestamp.lt(cutoff))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
