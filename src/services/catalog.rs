//! Material catalog: CRUD over the four material tables through the resolver.

use sea_orm::sea_query::{Alias, Expr, Order, Query, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
};
use serde::Deserialize;

use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::models::debt;
use crate::models::material::{join_tags, Hazards, Material, MaterialKind, MaterialRow};
use crate::models::request::{self, RequestStatus};
use crate::models::request_item;
use crate::services::stock::{find_material, material_select, MATERIAL_NOT_FOUND};

/// Fields for a new material
#[derive(Debug, Clone, Deserialize)]
pub struct NewMaterial {
    pub name: String,
    #[serde(default)]
    pub quantity: i32,
    pub hazards: Option<Hazards>,
}

/// Catalog fields that may change outside the stock ledger
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialUpdate {
    pub name: Option<String>,
    pub hazards: Option<Hazards>,
}

/// All materials, optionally restricted to one kind
pub async fn list_materials(db: &DbConn, kind: Option<MaterialKind>) -> Result<Vec<Material>> {
    let kinds = match kind {
        Some(k) => vec![k],
        None => MaterialKind::ALL.to_vec(),
    };

    let mut materials = Vec::new();
    for kind in kinds {
        let mut select = material_select(kind);
        select.order_by(Alias::new("name"), Order::Asc);
        let stmt = db.get_database_backend().build(&select);
        let rows = MaterialRow::find_by_statement(stmt).all(db).await?;
        materials.extend(rows.into_iter().map(|row| Material::from_row(kind, row)));
    }

    Ok(materials)
}

pub async fn get_material(db: &DbConn, kind: MaterialKind, id: i64) -> Result<Material> {
    find_material(db, kind, id)
        .await?
        .map(|row| Material::from_row(kind, row))
        .ok_or_else(|| AppError::NotFound(MATERIAL_NOT_FOUND.to_string()))
}

pub async fn create_material(db: &DbConn, kind: MaterialKind, new: NewMaterial) -> Result<Material> {
    let target = kind.resolve();
    let name = normalize_name(&new.name)?;
    if new.quantity < 0 {
        return Err(AppError::BadRequest(
            "La cantidad debe ser un entero no negativo".to_string(),
        ));
    }

    let mut columns = vec![Alias::new("name"), Alias::new(target.quantity_column)];
    let mut values: Vec<SimpleExpr> = vec![name.into(), new.quantity.into()];
    if let Some(hazards) = hazard_values(kind, new.hazards.as_ref())? {
        for (column, value) in hazards {
            columns.push(Alias::new(column));
            values.push(value.into());
        }
    }

    let insert = Query::insert()
        .into_table(Alias::new(target.table))
        .columns(columns)
        .values(values)
        .map_err(|e| AppError::Internal(format!("Failed to build insert: {}", e)))?
        .returning_col(Alias::new("id"))
        .to_owned();

    let row = db
        .query_one(db.get_database_backend().build(&insert))
        .await?
        .ok_or_else(|| AppError::Internal("Insert returned no id".to_string()))?;
    let id: i64 = row.try_get("", "id")?;

    tracing::info!(kind = %kind, material_id = id, "Material created");
    get_material(db, kind, id).await
}

pub async fn update_material(
    db: &DbConn,
    kind: MaterialKind,
    id: i64,
    update: MaterialUpdate,
) -> Result<Material> {
    let target = kind.resolve();
    let mut values: Vec<(Alias, SimpleExpr)> = Vec::new();

    if let Some(name) = &update.name {
        values.push((Alias::new("name"), normalize_name(name)?.into()));
    }
    if let Some(hazards) = hazard_values(kind, update.hazards.as_ref())? {
        for (column, value) in hazards {
            values.push((Alias::new(column), value.into()));
        }
    }

    if values.is_empty() {
        return get_material(db, kind, id).await;
    }

    let update = Query::update()
        .table(Alias::new(target.table))
        .values(values)
        .and_where(Expr::col(Alias::new("id")).eq(id))
        .to_owned();
    let result = db.execute(db.get_database_backend().build(&update)).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(MATERIAL_NOT_FOUND.to_string()));
    }

    get_material(db, kind, id).await
}

/// Remove a material. Refused while an open request or an unsettled debt
/// still points at it.
pub async fn delete_material(db: &DbConn, kind: MaterialKind, id: i64) -> Result<()> {
    let open_items = request_item::Entity::find()
        .inner_join(request::Entity)
        .filter(request_item::Column::MaterialKind.eq(kind))
        .filter(request_item::Column::MaterialId.eq(id))
        .filter(request::Column::Status.is_in([RequestStatus::Pending, RequestStatus::Approved]))
        .count(db)
        .await?;

    let open_debts = debt::Entity::find()
        .filter(debt::Column::MaterialKind.eq(kind))
        .filter(debt::Column::MaterialId.eq(id))
        .filter(debt::Column::OutstandingQuantity.gt(0))
        .count(db)
        .await?;

    if open_items > 0 || open_debts > 0 {
        return Err(AppError::Conflict(
            "El material tiene solicitudes o adeudos abiertos".to_string(),
        ));
    }

    let target = kind.resolve();
    let delete = Query::delete()
        .from_table(Alias::new(target.table))
        .and_where(Expr::col(Alias::new("id")).eq(id))
        .to_owned();
    let result = db.execute(db.get_database_backend().build(&delete)).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(MATERIAL_NOT_FOUND.to_string()));
    }

    tracing::info!(kind = %kind, material_id = id, "Material deleted");
    Ok(())
}

/// Materials at or below `threshold`, lowest first
pub async fn low_stock(db: &DbConn, threshold: i32) -> Result<Vec<Material>> {
    let mut low = Vec::new();
    for kind in MaterialKind::ALL {
        let target = kind.resolve();
        let mut select = material_select(kind);
        select.and_where(Expr::col(Alias::new(target.quantity_column)).lte(threshold));
        let stmt = db.get_database_backend().build(&select);
        let rows = MaterialRow::find_by_statement(stmt).all(db).await?;
        low.extend(rows.into_iter().map(|row| Material::from_row(kind, row)));
    }

    low.sort_by_key(|m| m.quantity);
    Ok(low)
}

fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "El nombre del material es obligatorio".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Column/value pairs for hazard descriptors; only reagents carry them
fn hazard_values(
    kind: MaterialKind,
    hazards: Option<&Hazards>,
) -> Result<Option<[(&'static str, Option<String>); 3]>> {
    let Some(hazards) = hazards else {
        return Ok(None);
    };

    if !kind.resolve().has_hazards {
        return Err(AppError::BadRequest(format!(
            "El tipo {} no admite descriptores de peligro",
            kind
        )));
    }

    Ok(Some([
        ("physical_hazards", join_tags(&hazards.physical)),
        ("health_hazards", join_tags(&hazards.health)),
        ("environmental_hazards", join_tags(&hazards.environmental)),
    ]))
}
