//! Manual stock corrections by warehouse staff and administrators.

use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};

use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::material::{Material, MaterialKind};
use crate::models::stock_movement::MovementType;
use crate::models::user::STOCK_ADJUST;
use crate::services::catalog;
use crate::services::stock::{self, MovementRecord};

#[derive(Debug, Clone, Serialize)]
pub struct Adjustment {
    pub material: Material,
    pub previous_quantity: i32,
    pub delta: i32,
}

/// Set a material's stock to an absolute, non-negative quantity
pub async fn adjust(
    db: &DbConn,
    actor: &AuthenticatedUser,
    kind: MaterialKind,
    id: i64,
    quantity: i32,
    reason: Option<String>,
) -> Result<Adjustment> {
    ensure_can_adjust(actor)?;

    let txn = db.begin().await?;
    let previous = stock::set_absolute(&txn, kind, id, quantity).await?;
    let delta = quantity - previous;
    stock::record_movement(
        &txn,
        MovementRecord {
            kind,
            material_id: id,
            delta,
            resulting_quantity: quantity,
            movement_type: MovementType::Adjustment,
            reason,
            request_id: None,
            user_id: Some(actor.id()),
        },
    )
    .await?;
    txn.commit().await?;

    tracing::info!(kind = %kind, material_id = id, previous, quantity, "Stock set");

    Ok(Adjustment {
        material: catalog::get_material(db, kind, id).await?,
        previous_quantity: previous,
        delta,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkEntry {
    pub id: i64,
    pub kind: String,
    pub delta: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkResult {
    pub id: i64,
    pub kind: MaterialKind,
    pub delta: i32,
    pub resulting_quantity: i32,
}

/// Apply signed deltas to several materials; all or nothing
pub async fn adjust_bulk(
    db: &DbConn,
    actor: &AuthenticatedUser,
    entries: Vec<BulkEntry>,
    reason: Option<String>,
) -> Result<Vec<BulkResult>> {
    ensure_can_adjust(actor)?;
    if entries.is_empty() {
        return Err(AppError::BadRequest(
            "Debe indicar al menos un ajuste".to_string(),
        ));
    }

    let parsed = entries
        .into_iter()
        .map(|entry| Ok((MaterialKind::from_tag(&entry.kind)?, entry)))
        .collect::<Result<Vec<_>>>()?;

    let txn = db.begin().await?;
    let mut results = Vec::with_capacity(parsed.len());
    for (kind, entry) in parsed {
        let resulting = stock::apply_delta(&txn, kind, entry.id, entry.delta).await?;
        stock::record_movement(
            &txn,
            MovementRecord {
                kind,
                material_id: entry.id,
                delta: entry.delta,
                resulting_quantity: resulting,
                movement_type: MovementType::Adjustment,
                reason: reason.clone(),
                request_id: None,
                user_id: Some(actor.id()),
            },
        )
        .await?;
        results.push(BulkResult {
            id: entry.id,
            kind,
            delta: entry.delta,
            resulting_quantity: resulting,
        });
    }
    txn.commit().await?;

    tracing::info!(entries = results.len(), user_id = actor.id(), "Bulk stock adjustment applied");
    Ok(results)
}

fn ensure_can_adjust(actor: &AuthenticatedUser) -> Result<()> {
    if actor.has_permission(STOCK_ADJUST) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Permiso denegado: se requiere stock.adjust".to_string(),
        ))
    }
}
