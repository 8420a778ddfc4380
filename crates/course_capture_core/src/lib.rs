pub mod domain;
pub mod normalize;
pub mod ports;
pub mod resolver;
pub mod router;
pub mod session;
pub mod store;

pub use domain::{
    Assignment, Attempt, Book, CaptureEvent, CaptureSnapshot, CaptureSummary, CompletionReport,
    Course, EntityKind, EntitySnapshot, Instructor, Record, Section, UnknownKind, UserProfile,
};
pub use ports::{EventSink, PortError, PortResult, SnapshotStore};
pub use router::Route;
pub use session::{CaptureSession, SessionConfig, SessionState};
pub use store::{Collection, EntityStore};
