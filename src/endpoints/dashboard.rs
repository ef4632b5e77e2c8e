use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;

use crate::config::CONFIG;
use crate::error::Result;
use crate::middleware::permissions::Authenticated;
use crate::models::material::Material;
use crate::models::prelude::*;
use crate::models::request::{self, RequestStatus};
use crate::models::user::{DEBTS_VIEW_ALL, MATERIALS_VIEW, REQUESTS_VIEW_ALL};
use crate::models::debt;
use crate::services::catalog;
use crate::state::AppState;

/// Create dashboard routes
pub fn dashboard_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_dashboard))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    /// Request count per status, within what the caller may see
    pub requests: BTreeMap<&'static str, u64>,
    pub outstanding_debts: u64,
    pub low_stock_threshold: i32,
    pub low_stock: Vec<Material>,
}

async fn get_dashboard(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Json<DashboardResponse>> {
    let actor = &auth.0;
    let see_all_requests = actor.has_permission(REQUESTS_VIEW_ALL);

    let mut requests = BTreeMap::new();
    for status in [
        RequestStatus::Pending,
        RequestStatus::Approved,
        RequestStatus::Rejected,
        RequestStatus::Delivered,
        RequestStatus::Cancelled,
    ] {
        let mut select = Request::find().filter(request::Column::Status.eq(status));
        if !see_all_requests {
            select = select.filter(
                Condition::any()
                    .add(request::Column::UserId.eq(actor.id()))
                    .add(request::Column::ReviewerId.eq(actor.id())),
            );
        }
        requests.insert(status.as_str(), select.count(&state.db).await?);
    }

    let mut debts = Debt::find().filter(debt::Column::OutstandingQuantity.gt(0));
    if !actor.has_permission(DEBTS_VIEW_ALL) {
        debts = debts.filter(debt::Column::UserId.eq(actor.id()));
    }
    let outstanding_debts = debts.count(&state.db).await?;

    let threshold = CONFIG.maintenance.low_stock_threshold;
    let low_stock = if actor.has_permission(MATERIALS_VIEW) {
        catalog::low_stock(&state.db, threshold).await?
    } else {
        Vec::new()
    };

    Ok(Json(DashboardResponse {
        requests,
        outstanding_debts,
        low_stock_threshold: threshold,
        low_stock,
    }))
}
