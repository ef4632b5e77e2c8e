//! Test helpers shared by the integration tests.
//!
//! Every test gets its own in-memory SQLite database migrated with the real
//! `Migrator`, and drives the real router with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tower::ServiceExt;

use labsync::config::database::DatabaseConfig;
use labsync::config::CONFIG;
use labsync::db;
use labsync::endpoints::create_router;
use labsync::migrations::Migrator;
use labsync::models::material::MaterialKind;
use labsync::models::user::{self, Role};
use labsync::models::warehouse_permission;
use labsync::services::catalog::{self, NewMaterial};
use labsync::services::stock;
use labsync::services::AuditService;
use labsync::state::AppState;

/// Create an in-memory SQLite database for testing
pub async fn create_test_db() -> DatabaseConnection {
    // One connection, otherwise each pooled connection sees its own database
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opts)
        .await
        .expect("Failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run test migrations");

    db
}

/// Router plus the database behind it
pub async fn create_test_app() -> (Router, DatabaseConnection) {
    let db = create_test_db().await;
    let state = AppState::new(db.clone(), AuditService::new(db.clone()));
    (create_router(state), db)
}

/// Router over a SQLite file served by a pool of several connections.
///
/// Keep the returned `TempDir` alive for as long as the database is used.
pub async fn create_pooled_test_app() -> (Router, DatabaseConnection, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("labsync.db").display());

    let mut config = DatabaseConfig::with_url(url);
    config.max_connections = 4;
    config.min_connections = 2;
    let db = db::connect(&config)
        .await
        .expect("Failed to create pooled test database");

    let state = AppState::new(db.clone(), AuditService::new(db.clone()));
    (create_router(state), db, dir)
}

/// Create an active user with the given role
pub async fn create_user(db: &DatabaseConnection, name: &str, role: Role) -> user::Model {
    let now = chrono::Utc::now();
    let email = format!("{}@escuela.mx", name.to_lowercase().replace(' ', "."));

    user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email),
        hashed_password: Set(bcrypt::hash("password123", 4).unwrap()),
        role: Set(role),
        is_active: Set(true),
        group_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Create a warehouse user with explicit flags
pub async fn create_warehouse_user(
    db: &DatabaseConnection,
    name: &str,
    stock_modify: bool,
    chat_access: bool,
) -> user::Model {
    let staff = create_user(db, name, Role::Warehouse).await;

    warehouse_permission::ActiveModel {
        user_id: Set(staff.id),
        chat_access: Set(chat_access),
        stock_modify: Set(stock_modify),
        updated_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
    .unwrap();

    staff
}

/// Add a material and return its id
pub async fn create_material(
    db: &DatabaseConnection,
    kind: MaterialKind,
    name: &str,
    quantity: i32,
) -> i64 {
    catalog::create_material(
        db,
        kind,
        NewMaterial {
            name: name.to_string(),
            quantity,
            hazards: None,
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn stock_of(db: &DatabaseConnection, kind: MaterialKind, id: i64) -> i32 {
    stock::current_stock(db, kind, id).await.unwrap()
}

/// Send a request as `user_id` (or anonymously) and return status + JSON body
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user_id: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user_id {
        builder = builder.header(CONFIG.auth.identity_header.as_str(), id.to_string());
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json)
}

pub async fn get(app: &Router, uri: &str, user_id: i64) -> (StatusCode, Value) {
    send(app, "GET", uri, Some(user_id), None).await
}

pub async fn post(app: &Router, uri: &str, user_id: i64, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(user_id), Some(body)).await
}

/// Create a request through the API with a fixed reason
pub async fn create_request(
    app: &Router,
    user_id: i64,
    items: Value,
) -> (StatusCode, Value) {
    post(
        app,
        "/api/requests",
        user_id,
        serde_json::json!({
            "items": items,
            "reason": "Práctica de laboratorio",
        }),
    )
    .await
}
