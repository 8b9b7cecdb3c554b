//! HTTP routes for the portfolio API

pub mod auth;
pub mod contacts;
pub mod projects;
pub mod system;

use std::sync::Arc;

use axum::http::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ApiError;
use crate::state::AppState;

/// Create the router with all routes mounted under the API prefix.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    let api = Router::new()
        .route("/health", get(system::health))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/projects", get(projects::list).post(projects::create))
        .route("/projects/insights", get(projects::insights))
        .route("/projects/tags", get(projects::tags))
        .route(
            "/projects/:id",
            get(projects::get_by_id)
                .patch(projects::update)
                .delete(projects::remove),
        )
        .route("/contacts", post(contacts::create).get(contacts::list))
        .route("/contacts/summary", get(contacts::summary))
        .route("/contacts/:id", get(contacts::get_by_id))
        .route("/contacts/:id/status", patch(contacts::update_status))
        .route("/system/health", get(system::health))
        .route("/system/readiness", get(system::readiness))
        .with_state(state.clone());

    Router::new()
        .nest(&state.config.api_prefix, api)
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}

/// With no configured origins the API stays open (public portfolio);
/// otherwise only the listed origins pass.
fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("idempotency-key"),
        ]);

    if config.cors_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
