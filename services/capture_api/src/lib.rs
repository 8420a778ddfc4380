//! services/capture_api/src/lib.rs
//!
//! The capture service: HTTP and WebSocket endpoints in front of a single
//! `CaptureSession`, with snapshots persisted through a `SnapshotStore`.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;

use crate::web::{
    entities_handler, events_handler, ingest_handler, rest::ApiDoc, snapshot_handler,
    state::AppState, status_handler, ws_handler,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Intercepted responses can be large course listings.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Assembles the full application router, including the Swagger UI.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(app_state.config.allowed_origin.clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    let api_router = Router::new()
        .route("/capture", post(ingest_handler))
        .route("/capture/status", get(status_handler))
        .route("/capture/snapshot", get(snapshot_handler))
        .route("/capture/entities/{kind}", get(entities_handler))
        .route("/capture/events", get(events_handler))
        .route("/ws", get(ws_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
