//! HTTP API for the ingestion service.
//!
//! This module provides the REST API endpoints for:
//! - Health monitoring and service identification
//! - File upload and processing
//! - Asset and chunk listing

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::service::DataService;

pub mod data;
use data::{list_assets_handler, list_chunks_handler, process_handler, upload_handler};

/// Application state
pub struct AppState {
    pub service: Arc<DataService>,
    pub start_time: Instant,
}

/// Build the API router
pub fn router(service: Arc<DataService>) -> Router {
    let config = service.config.clone();

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let data_routes = Router::new()
        // Upload gets a body limit just above the file size ceiling
        .route(
            "/upload/{project_id}",
            post(upload_handler).layer(DefaultBodyLimit::max(config.upload.body_limit())),
        )
        .route("/process/{project_id}", post(process_handler))
        .route("/assets/{project_id}", get(list_assets_handler))
        .route("/chunks/{project_id}", get(list_chunks_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1", get(welcome_handler))
        .route("/api/v1/", get(welcome_handler))
        .nest("/api/v1/data", data_routes)
        .layer(cors)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.server.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
}

// === Service identification ===

async fn welcome_handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        app_name: env!("CARGO_PKG_NAME"),
        app_version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct WelcomeResponse {
    app_name: &'static str,
    app_version: &'static str,
}
