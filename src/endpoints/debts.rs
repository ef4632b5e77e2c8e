use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::endpoints::extractors::{Json, Path};
use crate::endpoints::audited;
use crate::error::Result;
use crate::middleware::permissions::{Authenticated, Authorized, DebtsSettle};
use crate::models::audit_log::{AuditAction, ResourceType};
use crate::models::debt;
use crate::services::debts::{self, RequestDebts, ReturnedItem};
use crate::state::AppState;

/// Create debts routes
pub fn debts_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_debts))
        .route("/{request_id}", get(get_request_debts))
        .route("/{request_id}/settle", post(settle_debts))
        .with_state(state)
}

/// Returned material, either as full entries or as bare item ids meaning
/// "everything still owed for this item"
#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    #[serde(default)]
    pub returns: Vec<ReturnedItem>,
    #[serde(default)]
    pub item_ids: Vec<i64>,
}

impl SettleRequest {
    fn into_returns(self) -> Vec<ReturnedItem> {
        let mut returns = self.returns;
        returns.extend(self.item_ids.into_iter().map(|item_id| ReturnedItem {
            item_id,
            quantity: None,
        }));
        returns
    }
}

async fn list_debts(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<Vec<debt::Model>>> {
    Ok(Json(debts::list_outstanding(&state.db, &auth.0).await?))
}

async fn get_request_debts(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(request_id): Path<i64>,
) -> Result<Json<RequestDebts>> {
    Ok(Json(debts::for_request(&state.db, &auth.0, request_id).await?))
}

async fn settle_debts(
    State(state): State<AppState>,
    auth: Authorized<DebtsSettle>,
    Path(request_id): Path<i64>,
    Json(request): Json<SettleRequest>,
) -> Result<Json<RequestDebts>> {
    let result = debts::settle(&state.db, &auth.0, request_id, request.into_returns()).await;
    let outcome = audited(
        &state,
        &auth.0,
        AuditAction::DebtSettled,
        ResourceType::Debt,
        request_id,
        result,
    )
    .await?;
    Ok(Json(outcome))
}
