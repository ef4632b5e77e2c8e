//! Periodic task scheduler
//!
//! Runs maintenance sweeps at fixed intervals. Add new tasks by implementing
//! the `PeriodicTask` trait.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, TransactionTrait};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::config::CONFIG;
use crate::models::prelude::*;
use crate::models::request::{self, RequestStatus};
use crate::models::request_item;
use crate::models::audit_log::{AuditAction, ResourceType};
use crate::services::audit::{clear_old_logs, AuditService};

/// Trait for periodic background tasks
#[async_trait]
pub trait PeriodicTask: Send + Sync {
    /// Task name for logging
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    async fn run(&self, db: &DatabaseConnection) -> anyhow::Result<()>;
}

/// Start all periodic tasks
pub fn start_scheduler(db: Arc<DatabaseConnection>, audit: AuditService) {
    let every = Duration::from_secs(CONFIG.maintenance.purge_interval_secs.max(1));
    let tasks: Vec<Box<dyn PeriodicTask>> = vec![
        Box::new(RequestPurgeTask {
            retention_days: CONFIG.maintenance.request_retention_days,
            every,
            audit,
        }),
        Box::new(AuditRetentionTask {
            retention_days: CONFIG.maintenance.audit_retention_days,
            every,
        }),
    ];

    for task in tasks {
        let db = db.clone();
        tokio::spawn(async move {
            run_task(task, db).await;
        });
    }

    tracing::info!("Periodic task scheduler started");
}

/// Run a single task on its interval
async fn run_task(task: Box<dyn PeriodicTask>, db: Arc<DatabaseConnection>) {
    let mut ticker = interval(task.interval());

    // Skip the first immediate tick
    ticker.tick().await;

    loop {
        ticker.tick().await;

        tracing::debug!(task = task.name(), "Running periodic task");

        match task.run(&db).await {
            Ok(()) => {
                tracing::debug!(task = task.name(), "Periodic task completed");
            }
            Err(e) => {
                tracing::error!(task = task.name(), error = %e, "Periodic task failed");
            }
        }
    }
}

// ============================================================================
// Request Purge Task
// ============================================================================

/// Deletes rejected and cancelled requests past the retention window
pub struct RequestPurgeTask {
    pub retention_days: i64,
    pub every: Duration,
    pub audit: AuditService,
}

#[async_trait]
impl PeriodicTask for RequestPurgeTask {
    fn name(&self) -> &'static str {
        "request_purge"
    }

    fn interval(&self) -> Duration {
        self.every
    }

    async fn run(&self, db: &DatabaseConnection) -> anyhow::Result<()> {
        let purged = purge_closed_requests(db, self.retention_days).await?;
        if purged > 0 {
            tracing::info!(purged, retention_days = self.retention_days, "Purged closed requests");
            self.audit
                .log(
                    AuditAction::RequestsPurged,
                    ResourceType::System,
                    None,
                    None,
                    None,
                    Some(serde_json::json!({
                        "purged": purged,
                        "retention_days": self.retention_days,
                    })),
                    true,
                    None,
                )
                .await?;
        }
        Ok(())
    }
}

/// Remove rejected/cancelled requests created more than `days` ago, with
/// their items. Returns how many requests were removed.
pub async fn purge_closed_requests(db: &DatabaseConnection, days: i64) -> crate::error::Result<u64> {
    let cutoff = Utc::now() - chrono::Duration::days(days);

    let txn = db.begin().await?;
    let stale: Vec<i64> = Request::find()
        .select_only()
        .column(request::Column::Id)
        .filter(request::Column::Status.is_in([RequestStatus::Rejected, RequestStatus::Cancelled]))
        .filter(request::Column::CreatedAt.lt(cutoff))
        .into_tuple()
        .all(&txn)
        .await?;

    if stale.is_empty() {
        return Ok(0);
    }

    RequestItem::delete_many()
        .filter(request_item::Column::RequestId.is_in(stale.clone()))
        .exec(&txn)
        .await?;
    let removed = Request::delete_many()
        .filter(request::Column::Id.is_in(stale))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    Ok(removed.rows_affected)
}

// ============================================================================
// Audit Retention Task
// ============================================================================

/// Drops audit entries older than the audit retention window
pub struct AuditRetentionTask {
    pub retention_days: i64,
    pub every: Duration,
}

#[async_trait]
impl PeriodicTask for AuditRetentionTask {
    fn name(&self) -> &'static str {
        "audit_retention"
    }

    fn interval(&self) -> Duration {
        self.every
    }

    async fn run(&self, db: &DatabaseConnection) -> anyhow::Result<()> {
        let cleared = clear_old_logs(db, self.retention_days).await?;
        if cleared > 0 {
            tracing::info!(cleared, "Cleared old audit entries");
        }
        Ok(())
    }
}
