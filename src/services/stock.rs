//! Stock ledger over the four material tables.
//!
//! Every read and write resolves `(kind, id)` through [`MaterialKind::resolve`]
//! and is built with sea-query, so one code path serves all tables. Functions
//! are generic over [`ConnectionTrait`] to run inside the caller's transaction.
//!
//! Decrements are conditional (`WHERE quantity >= n`) and checked through the
//! affected-row count, so concurrent workflows can never drive stock negative.

use sea_orm::sea_query::{Alias, Expr, Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::models::material::{MaterialKind, MaterialRow};
use crate::models::stock_movement::{self, MovementType};

pub const MATERIAL_NOT_FOUND: &str = "Material no encontrado";

const HAZARD_COLUMNS: [&str; 3] = ["physical_hazards", "health_hazards", "environmental_hazards"];

#[derive(Debug, FromQueryResult)]
struct QuantityRow {
    quantity: i32,
}

/// Base select for a material table, quantity aliased to `quantity`.
/// Tables without hazard columns yield NULLs so every kind maps to [`MaterialRow`].
pub(crate) fn material_select(kind: MaterialKind) -> SelectStatement {
    let target = kind.resolve();
    let mut select = Query::select();
    select
        .column(Alias::new("id"))
        .column(Alias::new("name"))
        .expr_as(
            Expr::col(Alias::new(target.quantity_column)),
            Alias::new("quantity"),
        )
        .from(Alias::new(target.table));

    for column in HAZARD_COLUMNS {
        if target.has_hazards {
            select.column(Alias::new(column));
        } else {
            select.expr_as(Expr::cust("NULL"), Alias::new(column));
        }
    }

    select
}

/// Load one material row, `None` if absent
pub async fn find_material<C: ConnectionTrait>(
    conn: &C,
    kind: MaterialKind,
    id: i64,
) -> Result<Option<MaterialRow>> {
    let mut select = material_select(kind);
    select.and_where(Expr::col(Alias::new("id")).eq(id));
    let stmt = conn.get_database_backend().build(&select);

    Ok(MaterialRow::find_by_statement(stmt).one(conn).await?)
}

/// Current quantity of a material, 404 if it does not exist
pub async fn current_stock<C: ConnectionTrait>(conn: &C, kind: MaterialKind, id: i64) -> Result<i32> {
    let target = kind.resolve();
    let select = Query::select()
        .expr_as(
            Expr::col(Alias::new(target.quantity_column)),
            Alias::new("quantity"),
        )
        .from(Alias::new(target.table))
        .and_where(Expr::col(Alias::new("id")).eq(id))
        .to_owned();
    let stmt = conn.get_database_backend().build(&select);

    QuantityRow::find_by_statement(stmt)
        .one(conn)
        .await?
        .map(|row| row.quantity)
        .ok_or_else(|| AppError::NotFound(MATERIAL_NOT_FOUND.to_string()))
}

/// Take `qty` out of stock. Returns the resulting quantity.
///
/// 404 if the material is missing, 400 if stock does not cover `qty`.
pub async fn reserve<C: ConnectionTrait>(
    conn: &C,
    kind: MaterialKind,
    id: i64,
    qty: i32,
) -> Result<i32> {
    ensure_positive(qty)?;
    let target = kind.resolve();
    let column = Alias::new(target.quantity_column);

    let update = Query::update()
        .table(Alias::new(target.table))
        .value(column.clone(), Expr::col(column.clone()).sub(qty))
        .and_where(Expr::col(Alias::new("id")).eq(id))
        .and_where(Expr::col(column).gte(qty))
        .to_owned();
    let result = conn
        .execute(conn.get_database_backend().build(&update))
        .await?;

    if result.rows_affected() == 0 {
        // Either missing or short; current_stock distinguishes the two
        let available = current_stock(conn, kind, id).await?;
        tracing::debug!(kind = %kind, material_id = id, available, requested = qty, "Stock short");
        return Err(insufficient_stock(kind, id, available, qty));
    }

    current_stock(conn, kind, id).await
}

/// Put `qty` back into stock. Returns the resulting quantity.
pub async fn release<C: ConnectionTrait>(
    conn: &C,
    kind: MaterialKind,
    id: i64,
    qty: i32,
) -> Result<i32> {
    ensure_positive(qty)?;
    let target = kind.resolve();
    let column = Alias::new(target.quantity_column);

    let update = Query::update()
        .table(Alias::new(target.table))
        .value(column.clone(), Expr::col(column).add(qty))
        .and_where(Expr::col(Alias::new("id")).eq(id))
        .to_owned();
    let result = conn
        .execute(conn.get_database_backend().build(&update))
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(MATERIAL_NOT_FOUND.to_string()));
    }

    current_stock(conn, kind, id).await
}

/// Overwrite the quantity. Returns the previous quantity.
pub async fn set_absolute<C: ConnectionTrait>(
    conn: &C,
    kind: MaterialKind,
    id: i64,
    qty: i32,
) -> Result<i32> {
    if qty < 0 {
        return Err(AppError::BadRequest(
            "La cantidad debe ser un entero no negativo".to_string(),
        ));
    }

    let previous = current_stock(conn, kind, id).await?;
    let target = kind.resolve();

    let update = Query::update()
        .table(Alias::new(target.table))
        .value(Alias::new(target.quantity_column), qty)
        .and_where(Expr::col(Alias::new("id")).eq(id))
        .to_owned();
    conn.execute(conn.get_database_backend().build(&update))
        .await?;

    Ok(previous)
}

/// Add a signed delta. Negative deltas never take stock below zero.
pub async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    kind: MaterialKind,
    id: i64,
    delta: i32,
) -> Result<i32> {
    match delta {
        0 => current_stock(conn, kind, id).await,
        d if d > 0 => release(conn, kind, id, d).await,
        d => reserve(conn, kind, id, d.saturating_neg()).await,
    }
}

/// One ledger entry to append
#[derive(Debug, Clone)]
pub struct MovementRecord {
    pub kind: MaterialKind,
    pub material_id: i64,
    pub delta: i32,
    pub resulting_quantity: i32,
    pub movement_type: MovementType,
    pub reason: Option<String>,
    pub request_id: Option<i64>,
    pub user_id: Option<i64>,
}

pub async fn record_movement<C: ConnectionTrait>(
    conn: &C,
    record: MovementRecord,
) -> Result<stock_movement::Model> {
    let movement = stock_movement::ActiveModel {
        material_id: Set(record.material_id),
        material_kind: Set(record.kind),
        delta: Set(record.delta),
        resulting_quantity: Set(record.resulting_quantity),
        movement_type: Set(record.movement_type.to_string()),
        reason: Set(record.reason),
        request_id: Set(record.request_id),
        user_id: Set(record.user_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(movement.insert(conn).await?)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementQuery {
    pub kind: Option<String>,
    pub material_id: Option<i64>,
    pub request_id: Option<i64>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementPage {
    pub movements: Vec<stock_movement::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Ledger entries, newest first
pub async fn list_movements(db: &DbConn, query: MovementQuery) -> Result<MovementPage> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 200);

    let mut select = stock_movement::Entity::find();

    if let Some(tag) = &query.kind {
        let kind = MaterialKind::from_tag(tag)?;
        select = select.filter(stock_movement::Column::MaterialKind.eq(kind));
    }
    if let Some(material_id) = query.material_id {
        select = select.filter(stock_movement::Column::MaterialId.eq(material_id));
    }
    if let Some(request_id) = query.request_id {
        select = select.filter(stock_movement::Column::RequestId.eq(request_id));
    }

    let total = select.clone().count(db).await?;
    let movements = select
        .order_by_desc(stock_movement::Column::CreatedAt)
        .order_by_desc(stock_movement::Column::Id)
        .offset((page - 1) * per_page)
        .limit(per_page)
        .all(db)
        .await?;

    Ok(MovementPage {
        movements,
        total,
        page,
        per_page,
    })
}

fn ensure_positive(qty: i32) -> Result<()> {
    if qty <= 0 {
        return Err(AppError::BadRequest(
            "La cantidad debe ser mayor a cero".to_string(),
        ));
    }
    Ok(())
}

fn insufficient_stock(kind: MaterialKind, id: i64, available: i32, requested: i32) -> AppError {
    AppError::BadRequest(format!(
        "Stock insuficiente para el material {} ({}): disponible {}, solicitado {}",
        id, kind, available, requested
    ))
}
