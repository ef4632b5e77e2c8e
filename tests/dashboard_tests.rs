//! Dashboard counters scoped to what the caller may see.

mod common;
use common::*;

use axum::http::StatusCode;
use labsync::models::material::MaterialKind;
use labsync::models::user::Role;
use serde_json::json;

#[tokio::test]
async fn test_dashboard_scopes_counts() {
    let (app, db) = create_test_app().await;
    let ana = create_user(&db, "Ana", Role::Student).await;
    let pablo = create_user(&db, "Pablo", Role::Student).await;
    let teacher = create_user(&db, "Luis", Role::Teacher).await;
    let staff = create_warehouse_user(&db, "Rosa", true, false).await;
    let tube = create_material(&db, MaterialKind::Lab, "Tubo de ensayo", 30).await;
    create_material(&db, MaterialKind::Solid, "Yodo", 2).await;
    let items = json!([{ "material_id": tube, "kind": "lab", "quantity": 1 }]);

    let (_, first) = create_request(&app, ana.id, items.clone()).await;
    create_request(&app, pablo.id, items).await;
    let id = first["id"].as_i64().unwrap();
    post(&app, &format!("/api/requests/{}/approve", id), teacher.id, json!({})).await;
    post(&app, &format!("/api/requests/{}/deliver", id), staff.id, json!({})).await;

    let (status, mine) = get(&app, "/api/dashboard", ana.id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["requests"]["delivered"], 1);
    assert_eq!(mine["requests"]["pending"], 0);
    assert_eq!(mine["outstanding_debts"], 1);

    let (_, other) = get(&app, "/api/dashboard", pablo.id).await;
    assert_eq!(other["requests"]["pending"], 1);
    assert_eq!(other["outstanding_debts"], 0);

    let (_, all) = get(&app, "/api/dashboard", staff.id).await;
    assert_eq!(all["requests"]["pending"], 1);
    assert_eq!(all["requests"]["delivered"], 1);
    assert_eq!(all["outstanding_debts"], 1);

    let low = all["low_stock"].as_array().unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["name"], "Yodo");
}
