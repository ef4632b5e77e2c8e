use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::endpoints::extractors::{Json, Path, Query};
use crate::endpoints::audited;
use crate::error::{AppError, Result};
use crate::middleware::permissions::{Authorized, MaterialsManage, MaterialsView, StockAdjust};
use crate::models::audit_log::{AuditAction, ResourceType};
use crate::models::material::{Hazards, Material, MaterialKind};
use crate::services::catalog::{self, MaterialUpdate, NewMaterial};
use crate::services::inventory::{self, Adjustment, BulkEntry, BulkResult};
use crate::services::stock::{self, MovementPage, MovementQuery};
use crate::state::AppState;

/// Create materials routes
pub fn materials_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_materials).post(create_material))
        .route("/movements", get(list_movements))
        .route("/adjust-bulk", post(adjust_bulk))
        .route("/{target}/adjust", post(adjust_material))
        .route(
            "/{target}/{id}",
            get(get_material).patch(update_material).delete(delete_material),
        )
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMaterialRequest {
    pub kind: String,
    #[validate(length(min = 1, max = 200, message = "El nombre del material es obligatorio"))]
    pub name: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "La cantidad debe ser un entero no negativo"))]
    pub quantity: i32,
    pub hazards: Option<Hazards>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub kind: String,
    pub quantity: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAdjustRequest {
    pub adjustments: Vec<BulkEntry>,
    pub reason: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_materials(
    State(state): State<AppState>,
    _auth: Authorized<MaterialsView>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Material>>> {
    let kind = params.kind.as_deref().map(MaterialKind::from_tag).transpose()?;
    Ok(Json(catalog::list_materials(&state.db, kind).await?))
}

async fn get_material(
    State(state): State<AppState>,
    _auth: Authorized<MaterialsView>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<Json<Material>> {
    let kind = MaterialKind::from_tag(&kind)?;
    Ok(Json(catalog::get_material(&state.db, kind, id).await?))
}

async fn create_material(
    State(state): State<AppState>,
    auth: Authorized<MaterialsManage>,
    Json(request): Json<CreateMaterialRequest>,
) -> Result<(StatusCode, Json<Material>)> {
    request.validate()?;
    let kind = MaterialKind::from_tag(&request.kind)?;

    let material = catalog::create_material(
        &state.db,
        kind,
        NewMaterial {
            name: request.name,
            quantity: request.quantity,
            hazards: request.hazards,
        },
    )
    .await?;

    state
        .audit
        .log_success(
            Some(&auth.0),
            AuditAction::MaterialCreated,
            ResourceType::Material,
            format!("{}:{}", kind, material.id),
            Some(serde_json::json!({ "name": material.name, "quantity": material.quantity })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(material)))
}

async fn update_material(
    State(state): State<AppState>,
    auth: Authorized<MaterialsManage>,
    Path((kind, id)): Path<(String, i64)>,
    Json(update): Json<MaterialUpdate>,
) -> Result<Json<Material>> {
    let kind = MaterialKind::from_tag(&kind)?;
    let material = catalog::update_material(&state.db, kind, id, update).await?;

    state
        .audit
        .log_success(
            Some(&auth.0),
            AuditAction::MaterialUpdated,
            ResourceType::Material,
            format!("{}:{}", kind, id),
            None,
        )
        .await;

    Ok(Json(material))
}

async fn delete_material(
    State(state): State<AppState>,
    auth: Authorized<MaterialsManage>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<StatusCode> {
    let kind = MaterialKind::from_tag(&kind)?;
    let result = catalog::delete_material(&state.db, kind, id).await;
    audited(
        &state,
        &auth.0,
        AuditAction::MaterialDeleted,
        ResourceType::Material,
        format!("{}:{}", kind, id),
        result,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Set a material's stock to an absolute quantity
async fn adjust_material(
    State(state): State<AppState>,
    auth: Authorized<StockAdjust>,
    Path(id): Path<i64>,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<Adjustment>> {
    let kind = MaterialKind::from_tag(&request.kind)?;
    let quantity = i32::try_from(request.quantity)
        .ok()
        .filter(|q| *q >= 0)
        .ok_or_else(|| {
            AppError::BadRequest("La cantidad debe ser un entero no negativo".to_string())
        })?;

    let result = inventory::adjust(&state.db, &auth.0, kind, id, quantity, request.reason).await;
    let adjustment = audited(
        &state,
        &auth.0,
        AuditAction::StockAdjusted,
        ResourceType::Material,
        format!("{}:{}", kind, id),
        result,
    )
    .await?;

    Ok(Json(adjustment))
}

async fn adjust_bulk(
    State(state): State<AppState>,
    auth: Authorized<StockAdjust>,
    Json(request): Json<BulkAdjustRequest>,
) -> Result<Json<Vec<BulkResult>>> {
    let count = request.adjustments.len();
    let result = inventory::adjust_bulk(&state.db, &auth.0, request.adjustments, request.reason).await;
    let results = audited(
        &state,
        &auth.0,
        AuditAction::StockAdjusted,
        ResourceType::Material,
        format!("bulk:{}", count),
        result,
    )
    .await?;

    Ok(Json(results))
}

async fn list_movements(
    State(state): State<AppState>,
    _auth: Authorized<StockAdjust>,
    Query(query): Query<MovementQuery>,
) -> Result<Json<MovementPage>> {
    Ok(Json(stock::list_movements(&state.db, query).await?))
}
