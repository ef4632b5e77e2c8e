//! Debts: what a requester still owes after delivery, and settlement of returns.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::debt;
use crate::models::request;
use crate::models::stock_movement::MovementType;
use crate::models::user::{DEBTS_SETTLE, DEBTS_VIEW_ALL};
use crate::services::stock::{self, MovementRecord};

/// Whether the user holds any unreturned material
pub async fn has_outstanding<C: ConnectionTrait>(conn: &C, user_id: i64) -> Result<bool> {
    let count = debt::Entity::find()
        .filter(debt::Column::UserId.eq(user_id))
        .filter(debt::Column::OutstandingQuantity.gt(0))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Outstanding debts visible to the caller: their own, or everyone's for
/// warehouse and admin
pub async fn list_outstanding(db: &DbConn, actor: &AuthenticatedUser) -> Result<Vec<debt::Model>> {
    let mut select = debt::Entity::find().filter(debt::Column::OutstandingQuantity.gt(0));
    if !actor.has_permission(DEBTS_VIEW_ALL) {
        select = select.filter(debt::Column::UserId.eq(actor.id()));
    }

    Ok(select
        .order_by_asc(debt::Column::DeliveredAt)
        .order_by_asc(debt::Column::Id)
        .all(db)
        .await?)
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestDebts {
    pub request_id: i64,
    pub debts: Vec<debt::Model>,
    /// No debt of the request is outstanding
    pub settled: bool,
}

/// Debt rows of one request, for its owner or staff
pub async fn for_request(
    db: &DbConn,
    actor: &AuthenticatedUser,
    request_id: i64,
) -> Result<RequestDebts> {
    let found = request::Entity::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Solicitud no encontrada".to_string()))?;

    if found.user_id != actor.id() && !actor.has_permission(DEBTS_VIEW_ALL) {
        return Err(AppError::Forbidden(
            "No puedes consultar adeudos de otra persona".to_string(),
        ));
    }

    request_debts(db, request_id).await
}

async fn request_debts<C: ConnectionTrait>(conn: &C, request_id: i64) -> Result<RequestDebts> {
    let debts = debt::Entity::find()
        .filter(debt::Column::RequestId.eq(request_id))
        .order_by_asc(debt::Column::Id)
        .all(conn)
        .await?;
    let settled = debts.iter().all(|d| d.outstanding_quantity == 0);

    Ok(RequestDebts {
        request_id,
        debts,
        settled,
    })
}

/// One returned item; `quantity` defaults to everything still owed
#[derive(Debug, Clone, Deserialize)]
pub struct ReturnedItem {
    pub item_id: i64,
    pub quantity: Option<i32>,
}

/// Record returned material for a delivered request.
///
/// Each named request item has its outstanding quantity reduced and the same
/// quantity restored to stock. Items not named stay owed. Runs in one
/// transaction.
pub async fn settle(
    db: &DbConn,
    actor: &AuthenticatedUser,
    request_id: i64,
    returns: Vec<ReturnedItem>,
) -> Result<RequestDebts> {
    if !actor.has_permission(DEBTS_SETTLE) {
        return Err(AppError::Forbidden(
            "Permiso denegado: se requiere debts.settle".to_string(),
        ));
    }
    if returns.is_empty() {
        return Err(AppError::BadRequest(
            "Debe indicar al menos un material devuelto".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let found = request::Entity::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Solicitud no encontrada".to_string()))?;

    for returned in &returns {
        let owed = debt::Entity::find()
            .filter(debt::Column::RequestId.eq(request_id))
            .filter(debt::Column::RequestItemId.eq(returned.item_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Adeudo no encontrado para el material {}",
                    returned.item_id
                ))
            })?;

        let qty = returned.quantity.unwrap_or(owed.outstanding_quantity);
        if qty <= 0 {
            if owed.outstanding_quantity == 0 && returned.quantity.is_none() {
                // already fully returned; nothing to do
                continue;
            }
            return Err(AppError::BadRequest(
                "La cantidad devuelta debe ser mayor a cero".to_string(),
            ));
        }
        if qty > owed.outstanding_quantity {
            return Err(AppError::BadRequest(format!(
                "La cantidad devuelta ({}) excede lo adeudado ({})",
                qty, owed.outstanding_quantity
            )));
        }

        let reduced = debt::Entity::update_many()
            .col_expr(
                debt::Column::OutstandingQuantity,
                Expr::col(debt::Column::OutstandingQuantity).sub(qty),
            )
            .filter(debt::Column::Id.eq(owed.id))
            .filter(debt::Column::OutstandingQuantity.gte(qty))
            .exec(&txn)
            .await?;
        if reduced.rows_affected == 0 {
            return Err(AppError::Conflict(
                "El adeudo cambió durante la operación, intente de nuevo".to_string(),
            ));
        }

        let remaining = owed.outstanding_quantity - qty;
        if remaining == 0 {
            let mut closed = owed.clone().into_active_model();
            closed.outstanding_quantity = Set(0);
            closed.settled_at = Set(Some(Utc::now()));
            closed.update(&txn).await?;
        }

        let resulting = stock::release(&txn, owed.material_kind, owed.material_id, qty).await?;
        stock::record_movement(
            &txn,
            MovementRecord {
                kind: owed.material_kind,
                material_id: owed.material_id,
                delta: qty,
                resulting_quantity: resulting,
                movement_type: MovementType::Return,
                reason: Some(format!("Devolución de la solicitud {}", found.folio)),
                request_id: Some(request_id),
                user_id: Some(actor.id()),
            },
        )
        .await?;
    }

    let outcome = request_debts(&txn, request_id).await?;
    let remaining: i32 = outcome.debts.iter().map(|d| d.outstanding_quantity).sum();

    let mut active = found.into_active_model();
    active.debt_amount = Set(Some(f64::from(remaining)));
    active.updated_at = Set(Utc::now());
    active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        request_id,
        returned = returns.len(),
        settled = outcome.settled,
        "Debt settlement recorded"
    );

    Ok(outcome)
}
