//! Request workflow: creation, review, delivery and cancellation.
//!
//! Stock policy: a request created as pending reserves its stock at once and
//! is flagged `stock_reserved`. Rejecting or cancelling it releases the
//! reservation. A request created approved holds nothing, and its stock is
//! consumed at delivery. Every multi-step write runs in one transaction, and
//! status changes are conditional on the expected prior status.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::debt;
use crate::models::group;
use crate::models::material::MaterialKind;
use crate::models::request::{self, RequestStatus, UNASSIGNED_REVIEWER};
use crate::models::request_item;
use crate::models::stock_movement::MovementType;
use crate::models::user::{
    self, Role, REQUESTS_CANCEL_ANY, REQUESTS_CANCEL_OWN, REQUESTS_CREATE, REQUESTS_DELIVER,
    REQUESTS_REVIEW, REQUESTS_VIEW_ALL,
};
use crate::services::debts;
use crate::services::stock::{self, MovementRecord};

const REQUEST_NOT_FOUND: &str = "Solicitud no encontrada";
const FOLIO_BYTES: usize = 4;
const FOLIO_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewRequestItem {
    pub material_id: i64,
    /// Material type tag, checked by the resolver
    pub kind: String,
    #[validate(range(min = 1, message = "La cantidad debe ser mayor a cero"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRequest {
    #[validate(length(min = 1, message = "La solicitud debe incluir al menos un material"), nested)]
    pub items: Vec<NewRequestItem>,
    #[validate(length(min = 1, max = 1000, message = "El motivo es obligatorio"))]
    pub reason: String,
    /// Date the material is needed; defaults to now
    pub requested_for: Option<DateTime<Utc>>,
    pub reviewer_id: Option<i64>,
    #[serde(default)]
    pub auto_approve: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedRequest {
    pub id: i64,
    pub folio: String,
    pub status: RequestStatus,
    pub reviewer_name: String,
    pub group_name: Option<String>,
}

/// Create a request with its items.
pub async fn create_request(
    db: &DbConn,
    actor: &AuthenticatedUser,
    new: NewRequest,
) -> Result<CreatedRequest> {
    if !actor.has_permission(REQUESTS_CREATE) {
        return Err(AppError::Forbidden(
            "Solo estudiantes y docentes pueden crear solicitudes".to_string(),
        ));
    }
    new.validate()?;
    let reason = new.reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("El motivo es obligatorio".to_string()));
    }

    // Resolve every tag before any write
    let items = new
        .items
        .iter()
        .map(|item| Ok((MaterialKind::from_tag(&item.kind)?, item)))
        .collect::<Result<Vec<_>>>()?;

    let is_student = actor.role() == Role::Student;
    if is_student && debts::has_outstanding(db, actor.id()).await? {
        return Err(AppError::BadRequest(
            "Tienes adeudos pendientes; no puedes crear nuevas solicitudes".to_string(),
        ));
    }

    let status = if actor.role() == Role::Teacher || new.auto_approve {
        RequestStatus::Approved
    } else {
        RequestStatus::Pending
    };
    let (reviewer_id, reviewer_name) = resolve_reviewer(db, actor, status, new.reviewer_id).await?;
    let group_name = match actor.user.group_id {
        Some(group_id) => group::Entity::find_by_id(group_id)
            .one(db)
            .await?
            .map(|g| g.name),
        None => None,
    };

    let reserve = status == RequestStatus::Pending;
    let now = Utc::now();

    let txn = db.begin().await?;

    // Writes come first so the transaction holds the write lock before it reads
    let mut reserved = Vec::with_capacity(items.len());
    if reserve {
        for (kind, item) in &items {
            reserved.push(stock::reserve(&txn, *kind, item.material_id, item.quantity).await?);
        }
    }

    let folio = generate_folio(&txn).await?;

    let created = request::ActiveModel {
        user_id: Set(actor.id()),
        requested_for: Set(new.requested_for.unwrap_or(now)),
        status: Set(status),
        reason: Set(reason.to_string()),
        reviewer_id: Set(reviewer_id),
        student_name: Set(actor.user.name.clone()),
        reviewer_name: Set(reviewer_name.clone()),
        folio: Set(folio.clone()),
        group_id: Set(actor.user.group_id),
        group_name: Set(group_name.clone()),
        debt_amount: Set(None),
        stock_reserved: Set(reserve),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for (index, (kind, item)) in items.into_iter().enumerate() {
        if let Some(&resulting) = reserved.get(index) {
            stock::record_movement(
                &txn,
                movement(&created, actor, kind, item.material_id, -item.quantity, resulting, MovementType::Reserve),
            )
            .await?;
        } else {
            let available = stock::current_stock(&txn, kind, item.material_id).await?;
            if is_student && available < item.quantity {
                return Err(AppError::BadRequest(format!(
                    "Stock insuficiente para el material {} ({}): disponible {}, solicitado {}",
                    item.material_id, kind, available, item.quantity
                )));
            }
        }

        request_item::ActiveModel {
            request_id: Set(created.id),
            material_id: Set(item.material_id),
            material_kind: Set(kind),
            quantity: Set(item.quantity),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    tracing::info!(
        request_id = created.id,
        folio = %created.folio,
        status = %status,
        user_id = actor.id(),
        "Request created"
    );

    Ok(CreatedRequest {
        id: created.id,
        folio,
        status,
        reviewer_name,
        group_name,
    })
}

/// Pick the reviewing teacher: the creator when self-approved, else the
/// chosen active teacher, else the first active teacher, else unassigned.
async fn resolve_reviewer(
    db: &DbConn,
    actor: &AuthenticatedUser,
    status: RequestStatus,
    chosen: Option<i64>,
) -> Result<(Option<i64>, String)> {
    if status == RequestStatus::Approved {
        return Ok((Some(actor.id()), actor.user.name.clone()));
    }

    let active_teachers = user::Entity::find()
        .filter(user::Column::Role.eq(Role::Teacher))
        .filter(user::Column::IsActive.eq(true));

    if let Some(reviewer_id) = chosen {
        let teacher = active_teachers
            .filter(user::Column::Id.eq(reviewer_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest("El revisor elegido no es un docente activo".to_string())
            })?;
        return Ok((Some(teacher.id), teacher.name));
    }

    let first = active_teachers
        .order_by_asc(user::Column::Id)
        .one(db)
        .await?;

    Ok(match first {
        Some(teacher) => (Some(teacher.id), teacher.name),
        None => (None, UNASSIGNED_REVIEWER.to_string()),
    })
}

/// Short human-facing code, retried until unused
async fn generate_folio<C: ConnectionTrait>(conn: &C) -> Result<String> {
    for _ in 0..FOLIO_ATTEMPTS {
        let bytes: [u8; FOLIO_BYTES] = rand::random();
        let folio = hex::encode_upper(bytes);

        let taken = request::Entity::find()
            .filter(request::Column::Folio.eq(folio.clone()))
            .count(conn)
            .await?;
        if taken == 0 {
            return Ok(folio);
        }
        tracing::debug!(folio = %folio, "Folio collision, retrying");
    }

    Err(AppError::Internal(
        "Could not generate a unique folio".to_string(),
    ))
}

/// pending → approved. Approving an approved request is a no-op.
pub async fn approve_request(
    db: &DbConn,
    actor: &AuthenticatedUser,
    id: i64,
) -> Result<request::Model> {
    ensure_permission(actor, REQUESTS_REVIEW)?;

    let found = find_request(db, id).await?;
    match found.status {
        RequestStatus::Approved => return Ok(found),
        RequestStatus::Pending => {}
        other => {
            return Err(AppError::BadRequest(format!(
                "No se puede aprobar una solicitud en estado {}",
                other
            )))
        }
    }

    if !transition(db, id, &[RequestStatus::Pending], RequestStatus::Approved, None).await? {
        // Lost a race; report the state that won
        let current = find_request(db, id).await?;
        if current.status == RequestStatus::Approved {
            return Ok(current);
        }
        return Err(AppError::BadRequest(format!(
            "No se puede aprobar una solicitud en estado {}",
            current.status
        )));
    }

    tracing::info!(request_id = id, reviewer = actor.id(), "Request approved");
    find_request(db, id).await
}

/// pending/approved → rejected, releasing any reserved stock.
pub async fn reject_request(
    db: &DbConn,
    actor: &AuthenticatedUser,
    id: i64,
) -> Result<request::Model> {
    ensure_permission(actor, REQUESTS_REVIEW)?;

    let txn = db.begin().await?;
    let found = find_request(&txn, id).await?;
    if !matches!(found.status, RequestStatus::Pending | RequestStatus::Approved) {
        return Err(AppError::BadRequest(format!(
            "No se puede rechazar una solicitud en estado {}",
            found.status
        )));
    }

    if found.stock_reserved {
        release_items(&txn, &found, actor).await?;
    }
    if !transition(
        &txn,
        id,
        &[RequestStatus::Pending, RequestStatus::Approved],
        RequestStatus::Rejected,
        Some(false),
    )
    .await?
    {
        return Err(AppError::Conflict(
            "La solicitud cambió durante la operación, intente de nuevo".to_string(),
        ));
    }

    let rejected = find_request(&txn, id).await?;
    txn.commit().await?;

    tracing::info!(request_id = id, reviewer = actor.id(), "Request rejected");
    Ok(rejected)
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveredRequest {
    pub request: request::Model,
    pub debts: Vec<debt::Model>,
}

/// approved → delivered: consume unreserved stock and open one debt per item.
pub async fn deliver_request(
    db: &DbConn,
    actor: &AuthenticatedUser,
    id: i64,
) -> Result<DeliveredRequest> {
    ensure_permission(actor, REQUESTS_DELIVER)?;

    let txn = db.begin().await?;
    let found = find_request(&txn, id).await?;
    if found.status != RequestStatus::Approved {
        return Err(AppError::BadRequest(format!(
            "Solo se pueden entregar solicitudes aprobadas (estado actual: {})",
            found.status
        )));
    }

    let items = request_items(&txn, id).await?;
    if !found.stock_reserved {
        for item in &items {
            let resulting =
                stock::reserve(&txn, item.material_kind, item.material_id, item.quantity).await?;
            stock::record_movement(
                &txn,
                movement(&found, actor, item.material_kind, item.material_id, -item.quantity, resulting, MovementType::Consume),
            )
            .await?;
        }
    }

    if !transition(&txn, id, &[RequestStatus::Approved], RequestStatus::Delivered, Some(false)).await? {
        return Err(AppError::Conflict(
            "La solicitud cambió durante la operación, intente de nuevo".to_string(),
        ));
    }

    let delivered_at = Utc::now();
    let mut debts = Vec::with_capacity(items.len());
    for item in &items {
        let created = debt::ActiveModel {
            request_id: Set(id),
            request_item_id: Set(item.id),
            user_id: Set(found.user_id),
            material_id: Set(item.material_id),
            material_kind: Set(item.material_kind),
            original_quantity: Set(item.quantity),
            outstanding_quantity: Set(item.quantity),
            delivered_at: Set(delivered_at),
            settled_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        debts.push(created);
    }

    let total: i32 = items.iter().map(|i| i.quantity).sum();
    request::Entity::update_many()
        .col_expr(request::Column::DebtAmount, Expr::value(f64::from(total)))
        .filter(request::Column::Id.eq(id))
        .exec(&txn)
        .await?;

    let request = find_request(&txn, id).await?;
    txn.commit().await?;

    tracing::info!(request_id = id, debts = debts.len(), "Request delivered");
    Ok(DeliveredRequest { request, debts })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// Owner withdrew a pending request; it no longer exists
    Deleted,
    /// Warehouse closed the request; it stays listed
    Cancelled,
}

/// Cancel a request. Owners withdraw their pending requests outright;
/// warehouse staff soft-cancel pending or approved ones.
pub async fn cancel_request(
    db: &DbConn,
    actor: &AuthenticatedUser,
    id: i64,
) -> Result<CancelOutcome> {
    if actor.has_permission(REQUESTS_CANCEL_ANY) {
        return staff_cancel(db, actor, id).await;
    }
    if !actor.has_permission(REQUESTS_CANCEL_OWN) {
        return Err(AppError::Forbidden(
            "No tienes permiso para cancelar solicitudes".to_string(),
        ));
    }

    let txn = db.begin().await?;
    let found = find_request(&txn, id).await?;
    if found.user_id != actor.id() {
        return Err(AppError::Forbidden(
            "Solo puedes cancelar tus propias solicitudes".to_string(),
        ));
    }
    if found.status != RequestStatus::Pending {
        return Err(AppError::BadRequest(
            "Solo se pueden cancelar solicitudes pendientes".to_string(),
        ));
    }

    if found.stock_reserved {
        release_items(&txn, &found, actor).await?;
    }

    request_item::Entity::delete_many()
        .filter(request_item::Column::RequestId.eq(id))
        .exec(&txn)
        .await?;
    let deleted = request::Entity::delete_many()
        .filter(request::Column::Id.eq(id))
        .filter(request::Column::Status.eq(RequestStatus::Pending))
        .exec(&txn)
        .await?;
    if deleted.rows_affected == 0 {
        return Err(AppError::Conflict(
            "La solicitud cambió durante la operación, intente de nuevo".to_string(),
        ));
    }

    txn.commit().await?;

    tracing::info!(request_id = id, user_id = actor.id(), "Request withdrawn by owner");
    Ok(CancelOutcome::Deleted)
}

async fn staff_cancel(db: &DbConn, actor: &AuthenticatedUser, id: i64) -> Result<CancelOutcome> {
    let txn = db.begin().await?;
    let found = find_request(&txn, id).await?;
    if !matches!(found.status, RequestStatus::Pending | RequestStatus::Approved) {
        return Err(AppError::BadRequest(format!(
            "No se puede cancelar una solicitud en estado {}",
            found.status
        )));
    }

    if found.stock_reserved {
        release_items(&txn, &found, actor).await?;
    }
    if !transition(
        &txn,
        id,
        &[RequestStatus::Pending, RequestStatus::Approved],
        RequestStatus::Cancelled,
        Some(false),
    )
    .await?
    {
        return Err(AppError::Conflict(
            "La solicitud cambió durante la operación, intente de nuevo".to_string(),
        ));
    }

    txn.commit().await?;

    tracing::info!(request_id = id, user_id = actor.id(), "Request cancelled by staff");
    Ok(CancelOutcome::Cancelled)
}

/// Requests visible to the caller. Staff see all; everyone else sees what
/// they created or were assigned to review.
pub async fn list_requests(
    db: &DbConn,
    actor: &AuthenticatedUser,
    status: Option<RequestStatus>,
) -> Result<Vec<request::Model>> {
    let mut select = request::Entity::find();
    if !actor.has_permission(REQUESTS_VIEW_ALL) {
        select = select.filter(
            Condition::any()
                .add(request::Column::UserId.eq(actor.id()))
                .add(request::Column::ReviewerId.eq(actor.id())),
        );
    }
    if let Some(status) = status {
        select = select.filter(request::Column::Status.eq(status));
    }

    Ok(select
        .order_by_desc(request::Column::CreatedAt)
        .order_by_desc(request::Column::Id)
        .all(db)
        .await?)
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestItemView {
    pub id: i64,
    pub material_id: i64,
    pub kind: MaterialKind,
    pub quantity: i32,
    /// `None` once the material has been removed from the catalog
    pub material_name: Option<String>,
    pub unit: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: request::Model,
    pub items: Vec<RequestItemView>,
}

pub async fn get_request_detail(
    db: &DbConn,
    actor: &AuthenticatedUser,
    id: i64,
) -> Result<RequestDetail> {
    let found = find_request(db, id).await?;
    let involved = found.user_id == actor.id() || found.reviewer_id == Some(actor.id());
    if !involved && !actor.has_permission(REQUESTS_VIEW_ALL) {
        return Err(AppError::Forbidden(
            "No tienes acceso a esta solicitud".to_string(),
        ));
    }

    let mut items = Vec::new();
    for item in request_items(db, id).await? {
        let material = stock::find_material(db, item.material_kind, item.material_id).await?;
        items.push(RequestItemView {
            id: item.id,
            material_id: item.material_id,
            kind: item.material_kind,
            quantity: item.quantity,
            material_name: material.map(|m| m.name),
            unit: item.material_kind.resolve().unit,
        });
    }

    Ok(RequestDetail {
        request: found,
        items,
    })
}

async fn find_request<C: ConnectionTrait>(conn: &C, id: i64) -> Result<request::Model> {
    request::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(REQUEST_NOT_FOUND.to_string()))
}

async fn request_items<C: ConnectionTrait>(conn: &C, id: i64) -> Result<Vec<request_item::Model>> {
    Ok(request_item::Entity::find()
        .filter(request_item::Column::RequestId.eq(id))
        .order_by_asc(request_item::Column::Id)
        .all(conn)
        .await?)
}

/// Conditional status update; false when the request was no longer in
/// one of `from`
async fn transition<C: ConnectionTrait>(
    conn: &C,
    id: i64,
    from: &[RequestStatus],
    to: RequestStatus,
    stock_reserved: Option<bool>,
) -> Result<bool> {
    let mut update = request::Entity::update_many()
        .col_expr(request::Column::Status, Expr::value(to))
        .col_expr(request::Column::UpdatedAt, Expr::value(Utc::now()));
    if let Some(reserved) = stock_reserved {
        update = update.col_expr(request::Column::StockReserved, Expr::value(reserved));
    }

    let result = update
        .filter(request::Column::Id.eq(id))
        .filter(request::Column::Status.is_in(from.iter().copied()))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Give back every item's reservation
async fn release_items(
    txn: &DatabaseTransaction,
    found: &request::Model,
    actor: &AuthenticatedUser,
) -> Result<()> {
    for item in request_items(txn, found.id).await? {
        let resulting =
            stock::release(txn, item.material_kind, item.material_id, item.quantity).await?;
        stock::record_movement(
            txn,
            movement(found, actor, item.material_kind, item.material_id, item.quantity, resulting, MovementType::Release),
        )
        .await?;
    }
    Ok(())
}

fn movement(
    found: &request::Model,
    actor: &AuthenticatedUser,
    kind: MaterialKind,
    material_id: i64,
    delta: i32,
    resulting_quantity: i32,
    movement_type: MovementType,
) -> MovementRecord {
    MovementRecord {
        kind,
        material_id,
        delta,
        resulting_quantity,
        movement_type,
        reason: Some(format!("Solicitud {}", found.folio)),
        request_id: Some(found.id),
        user_id: Some(actor.id()),
    }
}

fn ensure_permission(actor: &AuthenticatedUser, permission: &str) -> Result<()> {
    if actor.has_permission(permission) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Permiso denegado: se requiere {}",
            permission
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: &str, quantity: i32) -> NewRequestItem {
        NewRequestItem {
            material_id: 1,
            kind: kind.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_empty_items_fail_validation() {
        let request = NewRequest {
            items: vec![],
            reason: "Práctica 3".to_string(),
            requested_for: None,
            reviewer_id: None,
            auto_approve: false,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_zero_quantity_fails_validation() {
        let request = NewRequest {
            items: vec![item("solid", 0)],
            reason: "Práctica 3".to_string(),
            requested_for: None,
            reviewer_id: None,
            auto_approve: false,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_well_formed_request_validates() {
        let request = NewRequest {
            items: vec![item("solid", 30), item("equipment", 1)],
            reason: "Práctica 3".to_string(),
            requested_for: None,
            reviewer_id: None,
            auto_approve: false,
        };
        assert!(request.validate().is_ok());
    }
}
