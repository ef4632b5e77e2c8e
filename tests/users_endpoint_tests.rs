//! Identity resolution, user administration and groups.

mod common;
use common::*;

use axum::http::StatusCode;
use labsync::models::material::MaterialKind;
use labsync::models::prelude::*;
use labsync::models::user::Role;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde_json::json;

#[tokio::test]
async fn test_identity_header_is_required() {
    let (app, db) = create_test_app().await;
    let ana = create_user(&db, "Ana", Role::Student).await;

    let (status, _) = send(&app, "GET", "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = get(&app, "/api/users/me", ana.id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Ana");
    assert_eq!(me["role"], "student");
    assert!(me["warehouse_flags"].is_null());
    assert!(me.get("hashed_password").is_none());
    assert!(me["permissions"]
        .as_array()
        .unwrap()
        .contains(&json!("requests.create")));
}

#[tokio::test]
async fn test_inactive_user_is_rejected() {
    let (app, db) = create_test_app().await;
    let ana = create_user(&db, "Ana", Role::Student).await;

    let mut blocked = ana.clone().into_active_model();
    blocked.is_active = Set(false);
    blocked.update(&db).await.unwrap();

    let (status, body) = get(&app, "/api/users/me", ana.id).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_warehouse_flags_shape_permissions() {
    let (app, db) = create_test_app().await;
    let admin = create_user(&db, "Root", Role::Admin).await;
    let rosa = create_user(&db, "Rosa", Role::Warehouse).await;

    // No flag record yet: both flags off
    let (_, me) = get(&app, "/api/users/me", rosa.id).await;
    assert_eq!(me["warehouse_flags"], json!({ "chat_access": false, "stock_modify": false }));
    let perms = me["permissions"].as_array().unwrap().clone();
    assert!(!perms.contains(&json!("requests.deliver")));

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/users/{}/warehouse-permissions", rosa.id),
        Some(admin.id),
        Some(json!({ "chat_access": true, "stock_modify": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warehouse_flags"]["stock_modify"], true);

    let (_, me) = get(&app, "/api/users/me", rosa.id).await;
    let perms = me["permissions"].as_array().unwrap();
    assert!(perms.contains(&json!("requests.deliver")));
    assert!(perms.contains(&json!("chat.access")));

    // Flags only exist for warehouse accounts
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/users/{}/warehouse-permissions", admin.id),
        Some(admin.id),
        Some(json!({ "chat_access": true, "stock_modify": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_creates_user_and_rejects_duplicates() {
    let (app, db) = create_test_app().await;
    let admin = create_user(&db, "Root", Role::Admin).await;

    let (status, group) = post(&app, "/api/groups", admin.id, json!({ "name": "3A" })).await;
    assert_eq!(status, StatusCode::CREATED);

    let new_user = json!({
        "name": "Carla",
        "email": "Carla@Escuela.mx",
        "password": "secreto123",
        "role": "student",
        "group_id": group["id"],
    });
    let (status, created) = post(&app, "/api/users", admin.id, new_user.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["email"], "carla@escuela.mx");
    assert_eq!(created["is_active"], true);
    assert_eq!(created["group_id"], group["id"]);

    let (status, _) = post(&app, "/api/users", admin.id, new_user).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let stored = User::find_by_id(created["id"].as_i64().unwrap())
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(bcrypt::verify("secreto123", &stored.hashed_password).unwrap());
}

#[tokio::test]
async fn test_create_user_validation() {
    let (app, db) = create_test_app().await;
    let admin = create_user(&db, "Root", Role::Admin).await;

    for body in [
        json!({ "name": "X", "email": "no-es-correo", "password": "secreto123", "role": "student" }),
        json!({ "name": "X", "email": "x@escuela.mx", "password": "corta", "role": "student" }),
        json!({ "name": "X", "email": "x@escuela.mx", "password": "secreto123", "role": "janitor" }),
        json!({ "name": "X", "email": "x@escuela.mx", "password": "secreto123", "role": "student", "group_id": 99 }),
    ] {
        let (status, _) = post(&app, "/api/users", admin.id, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_user_management_requires_admin() {
    let (app, db) = create_test_app().await;
    let teacher = create_user(&db, "Luis", Role::Teacher).await;
    let staff = create_warehouse_user(&db, "Rosa", true, true).await;

    for user_id in [teacher.id, staff.id] {
        let (status, _) = get(&app, "/api/users", user_id).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = post(&app, "/api/groups", user_id, json!({ "name": "4B" })).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    // Anyone signed in may read groups
    let (status, _) = get(&app, "/api/groups", teacher.id).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_user_role_and_group() {
    let (app, db) = create_test_app().await;
    let admin = create_user(&db, "Root", Role::Admin).await;
    let ana = create_user(&db, "Ana", Role::Student).await;
    let (_, group) = post(&app, "/api/groups", admin.id, json!({ "name": "5C" })).await;
    let uri = format!("/api/users/{}", ana.id);

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(admin.id),
        Some(json!({ "role": "teacher", "group_id": group["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "teacher");
    assert_eq!(body["group_id"], group["id"]);

    // Explicit null clears the group; absent fields stay as they were
    let (_, body) = send(&app, "PATCH", &uri, Some(admin.id), Some(json!({ "group_id": null }))).await;
    assert!(body["group_id"].is_null());
    assert_eq!(body["role"], "teacher");

    let (_, body) = send(&app, "PATCH", &uri, Some(admin.id), Some(json!({ "is_active": false }))).await;
    assert_eq!(body["is_active"], false);
    let (status, _) = get(&app, "/api/users/me", ana.id).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_user_rules() {
    let (app, db) = create_test_app().await;
    let admin = create_user(&db, "Root", Role::Admin).await;
    let teacher = create_user(&db, "Luis", Role::Teacher).await;
    let staff = create_warehouse_user(&db, "Rosa", true, false).await;
    let spare = create_user(&db, "Pablo", Role::Student).await;
    let scope = create_material(&db, MaterialKind::Equipment, "Microscopio", 4).await;

    let (status, _) = send(&app, "DELETE", &format!("/api/users/{}", admin.id), Some(admin.id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, created) = create_request(
        &app,
        teacher.id,
        json!([{ "material_id": scope, "kind": "equipment", "quantity": 1 }]),
    )
    .await;
    post(&app, &format!("/api/requests/{}/deliver", created["id"]), staff.id, json!({})).await;

    let (status, _) = send(&app, "DELETE", &format!("/api/users/{}", teacher.id), Some(admin.id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "DELETE", &format!("/api/users/{}", spare.id), Some(admin.id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(User::find_by_id(spare.id).one(&db).await.unwrap().is_none());

    let (status, _) = send(&app, "DELETE", &format!("/api/users/{}", staff.id), Some(admin.id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(WarehousePermission::find_by_id(staff.id).one(&db).await.unwrap().is_none());

    let (status, _) = send(&app, "DELETE", &format!("/api/users/{}", spare.id), Some(admin.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_group_conflicts() {
    let (app, db) = create_test_app().await;
    let admin = create_user(&db, "Root", Role::Admin).await;

    let (status, _) = post(&app, "/api/groups", admin.id, json!({ "name": "6A" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post(&app, "/api/groups", admin.id, json!({ "name": "6A" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = post(&app, "/api/groups", admin.id, json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, groups) = get(&app, "/api/groups", admin.id).await;
    assert_eq!(groups.as_array().unwrap().len(), 1);
}
