//! crates/course_capture_core/src/session.rs
//!
//! The capture session controller: the single stateful coordination point.
//!
//! A session owns the entity store, routes every inbound payload to its normalizer,
//! tells subscribers which kinds changed, and decides, exactly once, when enough data
//! has arrived to call the capture complete. The host is responsible for calling
//! [`CaptureSession::on_timeout`] once `SessionConfig::completion_timeout` elapses, and
//! for serializing calls when the session is shared between threads.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{
    CaptureEvent, CaptureSnapshot, CaptureSummary, CompletionReport, EntityKind,
};
use crate::normalize;
use crate::ports::EventSink;
use crate::router::{self, Route};
use crate::store::EntityStore;

pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long to wait for the completion predicate before flushing partial results.
    pub completion_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
        }
    }
}

/// `Collecting` until the one-shot completion; `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Collecting,
    Complete { partial: bool },
}

pub struct CaptureSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    config: SessionConfig,
    store: EntityStore,
    state: SessionState,
    /// Latched by the first completion event; never cleared.
    notified: bool,
    sink: Arc<dyn EventSink>,
}

impl CaptureSession {
    pub fn new(config: SessionConfig, sink: Arc<dyn EventSink>) -> Self {
        let id = Uuid::new_v4();
        info!(session_id = %id, "Capture session started");
        Self {
            id,
            started_at: Utc::now(),
            config,
            store: EntityStore::new(),
            state: SessionState::Collecting,
            notified: false,
            sink,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.notified
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn summary(&self) -> CaptureSummary {
        self.store.summary()
    }

    pub fn snapshot(&self) -> CaptureSnapshot {
        self.store.to_snapshot()
    }

    /// Replays a previously persisted snapshot before live ingestion begins.
    /// Seeding is silent: no update events and no completion check.
    pub fn seed(&mut self, snapshot: CaptureSnapshot) {
        self.store.absorb(snapshot);
        debug!(session_id = %self.id, summary = ?self.store.summary(), "Session seeded");
    }

    /// The inbound entry point. Returns the route the payload took, or `None` when it
    /// was not recognized and dropped.
    pub fn ingest(&mut self, origin: &str, payload: &Value) -> Option<Route> {
        let Some(route) = router::classify(origin, payload) else {
            debug!(origin, "Payload not recognized; dropped");
            return None;
        };

        let touched = normalize::apply(route, origin, payload, &mut self.store);
        if touched.is_empty() {
            debug!(origin, ?route, "Payload carried nothing usable");
            return Some(route);
        }

        for &kind in touched.kinds() {
            self.sink
                .publish(CaptureEvent::Updated(self.store.snapshot_of(kind)));
        }
        self.evaluate();
        Some(route)
    }

    /// Fired once by the host's timer. Flushes whatever has been collected if the
    /// predicate never held. Returns true when a partial completion was emitted.
    pub fn on_timeout(&mut self) -> bool {
        if self.notified {
            return false;
        }
        if self.store.is_empty() {
            info!(session_id = %self.id, "Completion timeout elapsed with no data");
            return false;
        }
        self.complete(true);
        true
    }

    /// `hasProfile AND (hasCourses OR hasSections OR hasAssignments)`
    fn predicate_holds(&self) -> bool {
        self.store.profile().is_some()
            && !(self.store.courses.is_empty()
                && self.store.sections.is_empty()
                && self.store.assignments.is_empty())
    }

    fn evaluate(&mut self) {
        if !self.notified && self.predicate_holds() {
            self.complete(false);
        }
    }

    fn complete(&mut self, partial: bool) {
        self.notified = true;
        self.state = SessionState::Complete { partial };

        let report = CompletionReport {
            profile: self.store.profile().cloned(),
            partial,
            summary: self.store.summary(),
        };
        info!(
            session_id = %self.id,
            partial,
            courses = report.summary.course_count,
            sections = report.summary.section_count,
            assignments = report.summary.assignment_count,
            "Capture complete"
        );
        self.sink.publish(CaptureEvent::Completed(report));
    }

    /// Kinds with at least one record, in canonical order.
    pub fn populated_kinds(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|&kind| !self.store.snapshot_of(kind).is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<CaptureEvent>>);

    impl EventSink for RecordingSink {
        fn publish(&self, event: CaptureEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl RecordingSink {
        fn completions(&self) -> Vec<CompletionReport> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter_map(|event| match event {
                    CaptureEvent::Completed(report) => Some(report.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    fn session() -> (CaptureSession, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (CaptureSession::new(SessionConfig::default(), sink.clone()), sink)
    }

    #[test]
    fn unrecognized_payload_emits_nothing() {
        let (mut session, sink) = session();
        assert_eq!(session.ingest("/telemetry", &json!({ "beacon": 1 })), None);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn updates_carry_the_full_kind_list() {
        let (mut session, sink) = session();
        session.ingest("/studentassignments", &json!({ "courses": [{ "id": "1" }] }));
        session.ingest("/studentassignments", &json!({ "courses": [{ "id": "2" }] }));

        let events = sink.0.lock().unwrap();
        match events.last() {
            Some(CaptureEvent::Updated(snapshot)) => {
                assert_eq!(snapshot.kind(), EntityKind::Course);
                assert_eq!(snapshot.len(), 2);
            }
            other => panic!("expected a course update, got {other:?}"),
        }
    }

    #[test]
    fn timeout_without_data_is_silent() {
        let (mut session, sink) = session();
        assert!(!session.on_timeout());
        assert_eq!(session.state(), SessionState::Collecting);
        assert!(sink.completions().is_empty());
    }

    #[test]
    fn timeout_after_completion_does_not_fire_again() {
        let (mut session, sink) = session();
        session.ingest("/users/me", &json!({ "email": "ada@uni.edu" }));
        session.ingest("/studentassignments", &json!({ "sections": [{ "id": "20" }] }));
        assert_eq!(session.state(), SessionState::Complete { partial: false });
        assert!(!session.on_timeout());
        assert_eq!(sink.completions().len(), 1);
    }

    #[test]
    fn profile_alone_does_not_satisfy_predicate() {
        let (mut session, sink) = session();
        session.ingest("/users/me", &json!({ "email": "ada@uni.edu" }));
        session.ingest("/textbooks", &json!([{ "title": "Campbell Biology" }]));
        assert_eq!(session.state(), SessionState::Collecting);
        assert!(sink.completions().is_empty());

        assert!(session.on_timeout());
        let reports = sink.completions();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].partial);
        assert_eq!(reports[0].summary.book_count, 1);
        assert!(reports[0].profile.is_some());
    }

    #[test]
    fn seeding_is_silent_but_counts_toward_timeout() {
        let (mut seeded, _) = session();
        seeded.ingest("/studentassignments", &json!({ "courses": [{ "id": "1", "name": "Bio" }] }));

        let (mut session, sink) = session();
        session.seed(seeded.snapshot());
        assert!(sink.0.lock().unwrap().is_empty());
        assert_eq!(session.populated_kinds(), [EntityKind::Course]);

        assert!(session.on_timeout());
        assert_eq!(sink.completions()[0].summary.course_count, 1);
    }
}
