//! services/capture_api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use course_capture_core::{CaptureSnapshot, CaptureSummary, EntityKind, SessionState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        ingest_handler,
        status_handler,
        snapshot_handler,
        entities_handler,
        crate::web::sse::events_handler,
    ),
    components(
        schemas(IngestRequest, IngestResponse, StatusResponse, SummaryBody, EntitiesResponse, SnapshotResponse)
    ),
    tags(
        (name = "Course Capture API", description = "Ingests intercepted course-platform responses and serves the reconciled records.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One intercepted response, as forwarded by the capturing client.
#[derive(Deserialize, ToSchema)]
pub struct IngestRequest {
    /// The URL the response was fetched from.
    pub origin: String,
    /// The parsed JSON body of the response.
    #[schema(value_type = Object)]
    pub payload: Value,
}

#[derive(Serialize, ToSchema)]
pub struct IngestResponse {
    /// The normalizer the payload was routed to, or null when it was dropped.
    pub route: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SummaryBody {
    pub course_count: usize,
    pub section_count: usize,
    pub assignment_count: usize,
    pub instructor_count: usize,
    pub book_count: usize,
}

impl From<CaptureSummary> for SummaryBody {
    fn from(summary: CaptureSummary) -> Self {
        Self {
            course_count: summary.course_count,
            section_count: summary.section_count,
            assignment_count: summary.assignment_count,
            instructor_count: summary.instructor_count,
            book_count: summary.book_count,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// `collecting` or `complete`.
    pub state: String,
    /// Set once complete: whether the capture was flushed by the timeout.
    pub partial: Option<bool>,
    pub has_profile: bool,
    pub summary: SummaryBody,
    pub populated_kinds: Vec<String>,
    pub subscribers: usize,
    /// Seconds after session start at which partial results are flushed.
    pub completion_timeout_secs: u64,
    pub event_bus_capacity: usize,
}

#[derive(Serialize, ToSchema)]
pub struct EntitiesResponse {
    pub kind: String,
    pub count: usize,
    /// The full current list for the kind; the profile object (or null) for `profile`.
    #[schema(value_type = Object)]
    pub entities: Value,
}

#[derive(Serialize, ToSchema)]
pub struct SnapshotResponse {
    pub session_id: Uuid,
    #[schema(value_type = Object)]
    pub snapshot: CaptureSnapshot,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Ingest one intercepted response.
///
/// Unrecognized or unusable payloads are accepted and dropped; the response reports
/// which normalizer, if any, handled the payload.
#[utoipa::path(
    post,
    path = "/capture",
    request_body = IngestRequest,
    responses(
        (status = 202, description = "Payload accepted", body = IngestResponse),
        (status = 400, description = "Malformed request body")
    )
)]
pub async fn ingest_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> impl IntoResponse {
    let route = app_state.ingest(&req.origin, &req.payload).await;
    let response = IngestResponse {
        route: route.map(|r| r.as_str().to_string()),
    };
    (StatusCode::ACCEPTED, Json(response))
}

/// Report the session's progress toward completion.
#[utoipa::path(
    get,
    path = "/capture/status",
    responses(
        (status = 200, description = "Current session status", body = StatusResponse)
    )
)]
pub async fn status_handler(State(app_state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let session = app_state.session.lock().await;
    let (state, partial) = match session.state() {
        SessionState::Collecting => ("collecting", None),
        SessionState::Complete { partial } => ("complete", Some(partial)),
    };
    Json(StatusResponse {
        session_id: session.id(),
        started_at: session.started_at(),
        state: state.to_string(),
        partial,
        has_profile: session.store().profile().is_some(),
        summary: session.summary().into(),
        populated_kinds: session
            .populated_kinds()
            .into_iter()
            .map(|kind| kind.as_str().to_string())
            .collect(),
        subscribers: app_state.events.subscriber_count(),
        completion_timeout_secs: session.config().completion_timeout.as_secs(),
        event_bus_capacity: app_state.events.capacity(),
    })
}

/// Return every collected record at once.
#[utoipa::path(
    get,
    path = "/capture/snapshot",
    responses(
        (status = 200, description = "The whole store", body = SnapshotResponse)
    )
)]
pub async fn snapshot_handler(State(app_state): State<Arc<AppState>>) -> Json<SnapshotResponse> {
    let session = app_state.session.lock().await;
    Json(SnapshotResponse {
        session_id: session.id(),
        snapshot: session.snapshot(),
    })
}

/// Return the full current list of one entity kind.
#[utoipa::path(
    get,
    path = "/capture/entities/{kind}",
    params(
        ("kind" = String, Path, description = "One of profile, courses, sections, instructors, books, assignments")
    ),
    responses(
        (status = 200, description = "The kind's records", body = EntitiesResponse),
        (status = 404, description = "Unknown entity kind")
    )
)]
pub async fn entities_handler(
    State(app_state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<EntitiesResponse>, (StatusCode, String)> {
    let kind: EntityKind = kind
        .parse()
        .map_err(|e: course_capture_core::UnknownKind| (StatusCode::NOT_FOUND, e.to_string()))?;

    let snapshot = app_state.session.lock().await.store().snapshot_of(kind);
    let count = snapshot.len();
    let mut json = serde_json::to_value(&snapshot).map_err(|e| {
        error!("Failed to serialize {} snapshot: {:?}", kind, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to serialize entities".to_string(),
        )
    })?;

    Ok(Json(EntitiesResponse {
        kind: kind.as_str().to_string(),
        count,
        entities: json["entities"].take(),
    }))
}
