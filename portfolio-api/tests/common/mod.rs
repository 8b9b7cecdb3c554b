//! Common test utilities for API integration tests

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use portfolio_api::{routes, AppState, Config};

pub const ADMIN_EMAIL: &str = "admin@test.local";
pub const ADMIN_PASSWORD: &str = "StrongPass123!";

pub struct TestContext {
    pub server: TestServer,
    pub state: Arc<AppState>,
    _data_dir: TempDir,
}

pub fn test_config(data_dir: &TempDir) -> Config {
    Config {
        env: "test".to_string(),
        port: 0,
        api_prefix: "/api/v1".to_string(),
        data_file: data_dir.path().join("db.json"),
        jwt_secret: "test-secret".to_string(),
        jwt_ttl_minutes: 30,
        admin_email: ADMIN_EMAIL.to_string(),
        admin_password: ADMIN_PASSWORD.to_string(),
        cors_origins: Vec::new(),
        trust_proxy: false,
        login_max_attempts: 5,
        login_lock_window: Duration::from_secs(60),
        cache_max_entries: 256,
    }
}

/// Create a test server over a fresh temp-dir-backed store.
pub async fn create_test_context() -> TestContext {
    let data_dir = TempDir::new().expect("create temp dir");
    let config = test_config(&data_dir);
    let state = AppState::new(config).await.expect("build app state");
    let server =
        TestServer::new(routes::create_router(state.clone())).expect("create test server");

    TestContext {
        server,
        state,
        _data_dir: data_dir,
    }
}

/// Log in as the provisioned admin and return the bearer token.
pub async fn login_admin(server: &TestServer) -> String {
    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    body["accessToken"]
        .as_str()
        .expect("login response carries accessToken")
        .to_string()
}

/// Build the Authorization header pair for a bearer token.
pub fn bearer(token: &str) -> (axum::http::HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).expect("valid header value"),
    )
}
