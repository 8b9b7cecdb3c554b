//! Tests for the project catalogue and admin content management

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::{bearer, create_test_context, login_admin};
use serde_json::{json, Value};

fn project_payload(title: &str, year: i32, tags: &[&str], status: &str) -> Value {
    json!({
        "title": title,
        "summary": "A summary long enough to pass validation easily.",
        "impact": "An impact statement long enough to pass validation.",
        "year": year,
        "tags": tags,
        "stack": ["Rust", "axum"],
        "status": status,
    })
}

async fn create_project(server: &TestServer, token: &str, payload: &Value) -> Value {
    let (name, value) = bearer(token);
    let response = server
        .post("/api/v1/projects")
        .add_header(name, value)
        .json(payload)
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn create_requires_authentication() {
    let ctx = create_test_context().await;

    let response = ctx
        .server
        .post("/api/v1/projects")
        .json(&project_payload("Unauthenticated", 2026, &["backend"], "published"))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_then_list_round_trip() {
    let ctx = create_test_context().await;
    let token = login_admin(&ctx.server).await;

    let created = create_project(
        &ctx.server,
        &token,
        &project_payload("Portfolio API", 2026, &["backend"], "published"),
    )
    .await;
    assert!(created["id"].as_str().unwrap().starts_with("project-"));

    let listed = ctx.server.get("/api/v1/projects").await;
    assert_eq!(listed.status_code(), StatusCode::OK);
    let body: Value = listed.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn drafts_stay_out_of_the_public_catalogue() {
    let ctx = create_test_context().await;
    let token = login_admin(&ctx.server).await;

    let draft = create_project(
        &ctx.server,
        &token,
        &project_payload("Draft Project", 2026, &["backend"], "draft"),
    )
    .await;

    let listed = ctx.server.get("/api/v1/projects").await;
    let body: Value = listed.json();
    assert!(body["items"].as_array().unwrap().is_empty());

    let fetched = ctx
        .server
        .get(&format!("/api/v1/projects/{}", draft["id"].as_str().unwrap()))
        .await;
    assert_eq!(fetched.status_code(), StatusCode::NOT_FOUND);
    let body: Value = fetched.json();
    assert_eq!(body["error"]["code"], "PROJECT_NOT_FOUND");
}

#[tokio::test]
async fn list_filters_by_tag_and_search() {
    let ctx = create_test_context().await;
    let token = login_admin(&ctx.server).await;

    create_project(
        &ctx.server,
        &token,
        &project_payload("Data Platform", 2026, &["data", "backend"], "published"),
    )
    .await;
    create_project(
        &ctx.server,
        &token,
        &project_payload("Design System", 2025, &["frontend"], "published"),
    )
    .await;

    let by_tag = ctx.server.get("/api/v1/projects?tag=frontend").await;
    let body: Value = by_tag.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["title"], "Design System");

    let by_search = ctx.server.get("/api/v1/projects?search=platform").await;
    let body: Value = by_search.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["title"], "Data Platform");
}

#[tokio::test]
async fn list_sorts_recent_by_default_and_alpha_on_request() {
    let ctx = create_test_context().await;
    let token = login_admin(&ctx.server).await;

    create_project(
        &ctx.server,
        &token,
        &project_payload("Alpha Portal", 2020, &["backend"], "published"),
    )
    .await;
    create_project(
        &ctx.server,
        &token,
        &project_payload("Zulu Platform", 2026, &["backend"], "published"),
    )
    .await;

    let recent = ctx.server.get("/api/v1/projects").await;
    let body: Value = recent.json();
    assert_eq!(body["items"][0]["title"], "Zulu Platform");

    let alpha = ctx.server.get("/api/v1/projects?sort=alpha").await;
    let body: Value = alpha.json();
    assert_eq!(body["items"][0]["title"], "Alpha Portal");
}

#[tokio::test]
async fn writes_invalidate_the_cached_listing() {
    let ctx = create_test_context().await;
    let token = login_admin(&ctx.server).await;

    create_project(
        &ctx.server,
        &token,
        &project_payload("First", 2026, &["backend"], "published"),
    )
    .await;

    // Prime the cache.
    let listed = ctx.server.get("/api/v1/projects").await;
    let body: Value = listed.json();
    assert_eq!(body["pagination"]["total"], 1);

    create_project(
        &ctx.server,
        &token,
        &project_payload("Second", 2025, &["backend"], "published"),
    )
    .await;

    // The write must be visible immediately, not after the TTL.
    let listed = ctx.server.get("/api/v1/projects").await;
    let body: Value = listed.json();
    assert_eq!(body["pagination"]["total"], 2);
}

#[tokio::test]
async fn update_changes_fields_and_missing_ids_are_not_found() {
    let ctx = create_test_context().await;
    let token = login_admin(&ctx.server).await;

    let created = create_project(
        &ctx.server,
        &token,
        &project_payload("Before", 2026, &["backend"], "published"),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (name, value) = bearer(&token);
    let updated = ctx
        .server
        .patch(&format!("/api/v1/projects/{id}"))
        .add_header(name, value)
        .json(&json!({ "title": "After", "year": 2024 }))
        .await;
    assert_eq!(updated.status_code(), StatusCode::OK);
    let body: Value = updated.json();
    assert_eq!(body["title"], "After");
    assert_eq!(body["year"], 2024);
    assert_eq!(body["summary"], created["summary"]);

    let (name, value) = bearer(&token);
    let missing = ctx
        .server
        .patch("/api/v1/projects/project-missing")
        .add_header(name, value)
        .json(&json!({ "title": "Nothing" }))
        .await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_the_project() {
    let ctx = create_test_context().await;
    let token = login_admin(&ctx.server).await;

    let created = create_project(
        &ctx.server,
        &token,
        &project_payload("Doomed", 2026, &["backend"], "published"),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (name, value) = bearer(&token);
    let deleted = ctx
        .server
        .delete(&format!("/api/v1/projects/{id}"))
        .add_header(name, value)
        .await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

    let (name, value) = bearer(&token);
    let again = ctx
        .server
        .delete(&format!("/api/v1/projects/{id}"))
        .add_header(name, value)
        .await;
    assert_eq!(again.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn insights_aggregate_published_projects() {
    let ctx = create_test_context().await;
    let token = login_admin(&ctx.server).await;

    create_project(
        &ctx.server,
        &token,
        &project_payload("Data Portal", 2026, &["data", "backend"], "published"),
    )
    .await;
    create_project(
        &ctx.server,
        &token,
        &project_payload("Design System", 2025, &["frontend"], "published"),
    )
    .await;

    let response = ctx.server.get("/api/v1/projects/insights").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|value| value.to_str().ok()),
        Some("public, max-age=60, stale-while-revalidate=300")
    );

    let body: Value = response.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["byTag"]["data"], 1);
    assert_eq!(body["byTag"]["frontend"], 1);
    assert_eq!(body["byYear"]["2026"], 1);
}

#[tokio::test]
async fn tags_return_the_aggregated_taxonomy() {
    let ctx = create_test_context().await;
    let token = login_admin(&ctx.server).await;

    create_project(
        &ctx.server,
        &token,
        &project_payload("Data API", 2026, &["data", "backend"], "published"),
    )
    .await;
    create_project(
        &ctx.server,
        &token,
        &project_payload("Frontend Portal", 2025, &["frontend"], "published"),
    )
    .await;

    let response = ctx.server.get("/api/v1/projects/tags").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["totalTags"], 3);
    // Equal counts fall back to alphabetical order.
    assert_eq!(body["tags"][0]["tag"], "backend");
    assert_eq!(body["tags"][0]["count"], 1);
}

#[tokio::test]
async fn suspicious_payloads_are_blocked() {
    let ctx = create_test_context().await;
    let token = login_admin(&ctx.server).await;

    let mut payload = project_payload("Evil", 2026, &["backend"], "published");
    payload["summary"] = json!("union select password from users somewhere");

    let (name, value) = bearer(&token);
    let response = ctx
        .server
        .post("/api/v1/projects")
        .add_header(name, value)
        .json(&payload)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "SUSPICIOUS_PAYLOAD");
}

#[tokio::test]
async fn validation_errors_carry_the_field_message() {
    let ctx = create_test_context().await;
    let token = login_admin(&ctx.server).await;

    let mut payload = project_payload("Ok", 2026, &["backend"], "published");
    payload["title"] = json!("ab");

    let (name, value) = bearer(&token);
    let response = ctx
        .server
        .post("/api/v1/projects")
        .add_header(name, value)
        .json(&payload)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"].as_str().unwrap().contains("title"));
}
