use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::endpoints::extractors::{Json, Path, Query};
use crate::endpoints::audited;
use crate::error::Result;
use crate::middleware::permissions::{
    Authenticated, Authorized, RequestsCreate, RequestsDeliver, RequestsReview,
};
use crate::models::audit_log::{AuditAction, ResourceType};
use crate::models::request::{self, RequestStatus};
use crate::services::requests::{
    self as workflow, CancelOutcome, CreatedRequest, DeliveredRequest, NewRequest, RequestDetail,
};
use crate::state::AppState;

/// Create requests routes
pub fn requests_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_requests).post(create_request))
        .route("/{id}", get(get_request))
        .route("/{id}/approve", post(approve_request))
        .route("/{id}/reject", post(reject_request))
        .route("/{id}/deliver", post(deliver_request))
        .route("/{id}/cancel", post(cancel_request))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub id: i64,
    pub outcome: CancelOutcome,
}

async fn list_requests(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<request::Model>>> {
    let status = params
        .status
        .as_deref()
        .map(RequestStatus::from_tag)
        .transpose()?;
    Ok(Json(workflow::list_requests(&state.db, &auth.0, status).await?))
}

async fn create_request(
    State(state): State<AppState>,
    auth: Authorized<RequestsCreate>,
    Json(new): Json<NewRequest>,
) -> Result<(StatusCode, Json<CreatedRequest>)> {
    let created = workflow::create_request(&state.db, &auth.0, new).await?;

    state
        .audit
        .log_success(
            Some(&auth.0),
            AuditAction::RequestCreated,
            ResourceType::Request,
            created.id,
            Some(serde_json::json!({
                "folio": created.folio,
                "status": created.status,
            })),
        )
        .await;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_request(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<RequestDetail>> {
    Ok(Json(workflow::get_request_detail(&state.db, &auth.0, id).await?))
}

async fn approve_request(
    State(state): State<AppState>,
    auth: Authorized<RequestsReview>,
    Path(id): Path<i64>,
) -> Result<Json<request::Model>> {
    let result = workflow::approve_request(&state.db, &auth.0, id).await;
    let approved = audited(
        &state,
        &auth.0,
        AuditAction::RequestApproved,
        ResourceType::Request,
        id,
        result,
    )
    .await?;
    Ok(Json(approved))
}

async fn reject_request(
    State(state): State<AppState>,
    auth: Authorized<RequestsReview>,
    Path(id): Path<i64>,
) -> Result<Json<request::Model>> {
    let result = workflow::reject_request(&state.db, &auth.0, id).await;
    let rejected = audited(
        &state,
        &auth.0,
        AuditAction::RequestRejected,
        ResourceType::Request,
        id,
        result,
    )
    .await?;
    Ok(Json(rejected))
}

async fn deliver_request(
    State(state): State<AppState>,
    auth: Authorized<RequestsDeliver>,
    Path(id): Path<i64>,
) -> Result<Json<DeliveredRequest>> {
    let result = workflow::deliver_request(&state.db, &auth.0, id).await;
    let delivered = audited(
        &state,
        &auth.0,
        AuditAction::RequestDelivered,
        ResourceType::Request,
        id,
        result,
    )
    .await?;
    Ok(Json(delivered))
}

/// Owners withdraw pending requests; warehouse staff cancel them
async fn cancel_request(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<Json<CancelResponse>> {
    let result = workflow::cancel_request(&state.db, &auth.0, id).await;
    let action = match &result {
        Ok(CancelOutcome::Deleted) => AuditAction::RequestDeleted,
        _ => AuditAction::RequestCancelled,
    };
    let outcome = audited(&state, &auth.0, action, ResourceType::Request, id, result).await?;
    Ok(Json(CancelResponse { id, outcome }))
}
