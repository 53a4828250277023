//! HTTP tests driving the full router over in-memory infrastructure.
//!
//! No database or Redis is involved: health reports both as disabled and
//! rate limiting is skipped.

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::Harness;
use payroll_api::api::{create_router, AppState};

fn app() -> Router {
    let harness = Harness::new();
    let state = AppState::new(Arc::new(harness.services), harness.config);
    create_router(state)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/api/auth/register",
            None,
            json!({
                "name": "Ravi Kumar",
                "email": email,
                "password": "Secret123",
                "department": "Engineering"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["accessToken"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_disabled_backends() {
    let app = app();

    let (status, body) = send(&app, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"]["status"], "disabled");
    assert_eq!(body["services"]["redis"]["status"], "disabled");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = app();

    let (status, body) = send(&app, get("/api-docs/openapi.json", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/expenses"].is_object());
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = app();

    let (status, body) = send(&app, get("/api/expenses", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MISSING_TOKEN");

    let (status, _) = send(&app, get("/api/auth/me", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registered_employee_can_log_in() {
    let app = app();
    let token = register(&app, "ravi@company.com").await;

    let (status, body) = send(&app, get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "ravi@company.com");
    assert_eq!(body["data"]["role"], "employee");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "RAVI@company.com", "password": "Secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["accessToken"].is_string());

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "ravi@company.com", "password": "Wrong1234" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app();
    register(&app, "ravi@company.com").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "name": "Ravi", "email": "ravi@company.com", "password": "Secret123" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn employees_are_kept_out_of_admin_routes() {
    let app = app();
    let token = register(&app, "ravi@company.com").await;

    let (status, body) = send(&app, get("/api/users", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/notifications/broadcast",
            Some(&token),
            json!({ "title": "Hello", "message": "Everyone" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn employee_lists_their_own_empty_records() {
    let app = app();
    let token = register(&app, "ravi@company.com").await;

    let (status, body) = send(&app, get("/api/expenses?page=1&limit=5", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"]["total"], 0);

    let (status, body) = send(&app, get("/api/notifications", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unreadCount"], 0);
}

#[tokio::test]
async fn invalid_salary_payload_is_rejected() {
    let app = app();
    let token = register(&app, "ravi@company.com").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/salary-slips",
            Some(&token),
            json!({
                "employeeId": "550e8400-e29b-41d4-a716-446655440000",
                "month": 13,
                "year": 2024,
                "basicSalary": 50000,
                "workingDays": { "total": 22, "worked": 22 }
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
