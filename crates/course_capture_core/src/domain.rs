//! crates/course_capture_core/src/domain.rs
//!
//! Defines the canonical entity records that captured payloads are reconciled into.
//! These structs are independent of any payload shape or storage backend.
//!
//! Every record is immutable-by-replacement: an upsert merges a patch of the same
//! type into the live record through [`Record::merge`]. An empty string or `None`
//! in a patch means "unknown" and never erases what is already known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Entity Kinds
//=========================================================================================

/// The kinds of entity held by the store. The serialized names double as event tags,
/// snapshot keys and URL segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "profile")]
    Profile,
    #[serde(rename = "courses")]
    Course,
    #[serde(rename = "sections")]
    Section,
    #[serde(rename = "instructors")]
    Instructor,
    #[serde(rename = "books")]
    Book,
    #[serde(rename = "assignments")]
    Assignment,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Profile,
        EntityKind::Course,
        EntityKind::Section,
        EntityKind::Instructor,
        EntityKind::Book,
        EntityKind::Assignment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Profile => "profile",
            EntityKind::Course => "courses",
            EntityKind::Section => "sections",
            EntityKind::Instructor => "instructors",
            EntityKind::Book => "books",
            EntityKind::Assignment => "assignments",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name any [`EntityKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown entity kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

//=========================================================================================
// Merge Semantics
//=========================================================================================

/// A record that can be upserted by natural key.
pub trait Record: Clone {
    /// The key that identifies this record within its kind. Empty when the record
    /// carries nothing usable as a key.
    fn natural_key(&self) -> String;

    /// Folds a patch into `self`. Fields the patch does not know are left untouched.
    fn merge(&mut self, patch: Self);
}

fn take_text(slot: &mut String, value: String) {
    if !value.is_empty() {
        *slot = value;
    }
}

fn take_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

//=========================================================================================
// Entities
//=========================================================================================

/// The signed-in student. There is at most one per capture session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_id: String,
    pub institution_id: String,
    pub institution_name: String,
    pub captured_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// A profile is worth keeping once it names the person somehow.
    pub fn is_identified(&self) -> bool {
        !self.name.is_empty() || !self.email.is_empty() || !self.user_id.is_empty()
    }
}

impl Record for UserProfile {
    fn natural_key(&self) -> String {
        "profile".to_string()
    }

    fn merge(&mut self, patch: Self) {
        take_text(&mut self.name, patch.name);
        take_text(&mut self.first_name, patch.first_name);
        take_text(&mut self.last_name, patch.last_name);
        take_text(&mut self.email, patch.email);
        take_text(&mut self.user_id, patch.user_id);
        take_text(&mut self.institution_id, patch.institution_id);
        take_text(&mut self.institution_name, patch.institution_name);
        // First capture time sticks so that re-ingesting a profile is idempotent.
        if self.captured_at.is_none() {
            self.captured_at = patch.captured_at;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub code: String,
    pub time_zone: String,
    pub discipline_id: String,
    pub discipline_name: String,
    pub is_self_study_enabled: Option<bool>,
}

impl Record for Course {
    fn natural_key(&self) -> String {
        self.id.clone()
    }

    fn merge(&mut self, patch: Self) {
        take_text(&mut self.id, patch.id);
        take_text(&mut self.name, patch.name);
        take_text(&mut self.code, patch.code);
        take_text(&mut self.time_zone, patch.time_zone);
        take_text(&mut self.discipline_id, patch.discipline_id);
        take_text(&mut self.discipline_name, patch.discipline_name);
        take_some(&mut self.is_self_study_enabled, patch.is_self_study_enabled);
    }
}

/// A class section of a course, taught by one instructor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Section {
    pub id: String,
    pub name: String,
    pub course_id: String,
    /// Only set when the section payload itself names its course.
    pub course_name: String,
    pub instructor_id: String,
    pub instructor_name: String,
    pub instructor_email: String,
    pub section_url: String,
    pub is_archived: Option<bool>,
}

impl Record for Section {
    fn natural_key(&self) -> String {
        self.id.clone()
    }

    fn merge(&mut self, patch: Self) {
        take_text(&mut self.id, patch.id);
        take_text(&mut self.name, patch.name);
        take_text(&mut self.course_id, patch.course_id);
        take_text(&mut self.course_name, patch.course_name);
        take_text(&mut self.instructor_id, patch.instructor_id);
        take_text(&mut self.instructor_name, patch.instructor_name);
        take_text(&mut self.instructor_email, patch.instructor_email);
        take_text(&mut self.section_url, patch.section_url);
        take_some(&mut self.is_archived, patch.is_archived);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instructor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub section_id: String,
}

impl Record for Instructor {
    /// Keyed by section so the same section never yields two instructors.
    fn natural_key(&self) -> String {
        if self.section_id.is_empty() {
            self.id.clone()
        } else {
            self.section_id.clone()
        }
    }

    fn merge(&mut self, patch: Self) {
        take_text(&mut self.id, patch.id);
        take_text(&mut self.name, patch.name);
        take_text(&mut self.email, patch.email);
        take_text(&mut self.section_id, patch.section_id);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub edition: String,
    pub cover_url: String,
    pub section_id: String,
}

impl Record for Book {
    fn natural_key(&self) -> String {
        if self.isbn.is_empty() {
            self.title.clone()
        } else {
            self.isbn.clone()
        }
    }

    fn merge(&mut self, patch: Self) {
        take_text(&mut self.isbn, patch.isbn);
        take_text(&mut self.title, patch.title);
        take_text(&mut self.author, patch.author);
        take_text(&mut self.edition, patch.edition);
        take_text(&mut self.cover_url, patch.cover_url);
        take_text(&mut self.section_id, patch.section_id);
    }
}

/// A student's assignment. `section_name`, `course_name` and `course_id` are derived
/// by joining against the section and course known at upsert time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Assignment {
    pub id: String,
    pub name: String,
    pub section_id: String,
    pub section_name: String,
    pub course_name: String,
    pub course_id: String,
    pub status: String,
    pub due_date: String,
    /// Monotonic: once true it stays true.
    pub completed: bool,
    pub in_progress: Option<bool>,
    pub attempt_id: String,
    pub submitted_at: String,
    pub machine_score: Option<f64>,
    pub manual_score: Option<f64>,
    pub seconds_spent: Option<u64>,
}

impl Record for Assignment {
    fn natural_key(&self) -> String {
        self.id.clone()
    }

    fn merge(&mut self, patch: Self) {
        take_text(&mut self.id, patch.id);
        take_text(&mut self.name, patch.name);
        take_text(&mut self.section_id, patch.section_id);
        take_text(&mut self.section_name, patch.section_name);
        take_text(&mut self.course_name, patch.course_name);
        take_text(&mut self.course_id, patch.course_id);
        take_text(&mut self.status, patch.status);
        take_text(&mut self.due_date, patch.due_date);
        take_some(&mut self.in_progress, patch.in_progress);
        take_text(&mut self.attempt_id, patch.attempt_id);
        take_text(&mut self.submitted_at, patch.submitted_at);
        take_some(&mut self.machine_score, patch.machine_score);
        take_some(&mut self.manual_score, patch.manual_score);
        take_some(&mut self.seconds_spent, patch.seconds_spent);

        self.completed = self.completed || patch.completed;
        if self.completed {
            self.in_progress = Some(false);
        }
    }
}

/// One attempt at an assignment. Attempts are never stored; they only patch the
/// assignment whose id equals `student_assignment`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attempt {
    pub student_assignment: String,
    pub attempt_id: String,
    pub submitted_date_time: String,
    pub in_progress: Option<bool>,
    pub machine_score: Option<f64>,
    pub manual_score: Option<f64>,
    pub seconds_spent: Option<u64>,
}

impl Attempt {
    /// A submission time alone is proof of completion.
    pub fn is_submitted(&self) -> bool {
        !self.submitted_date_time.is_empty()
    }

    /// Builds the assignment patch this attempt contributes.
    pub fn to_patch(&self) -> Assignment {
        Assignment {
            id: self.student_assignment.clone(),
            completed: self.is_submitted(),
            in_progress: self.in_progress,
            attempt_id: self.attempt_id.clone(),
            submitted_at: self.submitted_date_time.clone(),
            machine_score: self.machine_score,
            manual_score: self.manual_score,
            seconds_spent: self.seconds_spent,
            ..Default::default()
        }
    }
}

//=========================================================================================
// Outbound Events and Snapshots
//=========================================================================================

/// Entity counts reported with a completion event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSummary {
    pub course_count: usize,
    pub section_count: usize,
    pub assignment_count: usize,
    pub instructor_count: usize,
    pub book_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub profile: Option<UserProfile>,
    /// True when the report was forced by the timeout rather than the predicate.
    pub partial: bool,
    pub summary: CaptureSummary,
}

/// The full, ordered contents of one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entities")]
pub enum EntitySnapshot {
    #[serde(rename = "profile")]
    Profile(Option<UserProfile>),
    #[serde(rename = "courses")]
    Courses(Vec<Course>),
    #[serde(rename = "sections")]
    Sections(Vec<Section>),
    #[serde(rename = "instructors")]
    Instructors(Vec<Instructor>),
    #[serde(rename = "books")]
    Books(Vec<Book>),
    #[serde(rename = "assignments")]
    Assignments(Vec<Assignment>),
}

impl EntitySnapshot {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntitySnapshot::Profile(_) => EntityKind::Profile,
            EntitySnapshot::Courses(_) => EntityKind::Course,
            EntitySnapshot::Sections(_) => EntityKind::Section,
            EntitySnapshot::Instructors(_) => EntityKind::Instructor,
            EntitySnapshot::Books(_) => EntityKind::Book,
            EntitySnapshot::Assignments(_) => EntityKind::Assignment,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EntitySnapshot::Profile(profile) => usize::from(profile.is_some()),
            EntitySnapshot::Courses(items) => items.len(),
            EntitySnapshot::Sections(items) => items.len(),
            EntitySnapshot::Instructors(items) => items.len(),
            EntitySnapshot::Books(items) => items.len(),
            EntitySnapshot::Assignments(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the engine emits to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CaptureEvent {
    /// Fired after every successful upsert of a kind.
    Updated(EntitySnapshot),
    /// Fired at most once per session.
    Completed(CompletionReport),
}

/// A whole-store image, used to persist a session and to seed the next one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSnapshot {
    pub profile: Option<UserProfile>,
    pub courses: Vec<Course>,
    pub sections: Vec<Section>,
    pub instructors: Vec<Instructor>,
    pub books: Vec<Book>,
    pub assignments: Vec<Assignment>,
}

impl CaptureSnapshot {
    /// Replaces the part of the image covered by `snapshot`.
    pub fn apply(&mut self, snapshot: EntitySnapshot) {
        match snapshot {
            EntitySnapshot::Profile(profile) => self.profile = profile,
            EntitySnapshot::Courses(items) => self.courses = items,
            EntitySnapshot::Sections(items) => self.sections = items,
            EntitySnapshot::Instructors(items) => self.instructors = items,
            EntitySnapshot::Books(items) => self.books = items,
            EntitySnapshot::Assignments(items) => self.assignments = items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_names_round_trip_through_from_str() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>(), Ok(kind));
        }
        assert!("widgets".parse::<EntityKind>().is_err());
    }

    #[test]
    fn merge_keeps_known_text_when_patch_is_blank() {
        let mut course = Course {
            id: "10".into(),
            name: "Biology 101".into(),
            ..Default::default()
        };
        course.merge(Course {
            id: "10".into(),
            time_zone: "America/Chicago".into(),
            ..Default::default()
        });
        assert_eq!(course.name, "Biology 101");
        assert_eq!(course.time_zone, "America/Chicago");
    }

    #[test]
    fn completed_never_regresses() {
        let mut assignment = Assignment {
            id: "5".into(),
            completed: true,
            ..Default::default()
        };
        assignment.merge(Assignment {
            id: "5".into(),
            status: "IN_PROGRESS".into(),
            completed: false,
            in_progress: Some(true),
            ..Default::default()
        });
        assert!(assignment.completed);
        assert_eq!(assignment.in_progress, Some(false));
        assert_eq!(assignment.status, "IN_PROGRESS");
    }

    #[test]
    fn instructor_key_prefers_section() {
        let with_section = Instructor {
            id: "i-1".into(),
            section_id: "20".into(),
            ..Default::default()
        };
        let without_section = Instructor {
            id: "i-1".into(),
            ..Default::default()
        };
        assert_eq!(with_section.natural_key(), "20");
        assert_eq!(without_section.natural_key(), "i-1");
    }

    #[test]
    fn captured_at_keeps_first_value() {
        let first = Utc::now();
        let mut profile = UserProfile {
            captured_at: Some(first),
            ..Default::default()
        };
        profile.merge(UserProfile {
            email: "a@b.edu".into(),
            captured_at: Some(first + chrono::Duration::seconds(5)),
            ..Default::default()
        });
        assert_eq!(profile.captured_at, Some(first));
        assert_eq!(profile.email, "a@b.edu");
    }

    #[test]
    fn updated_event_serializes_kind_and_entities() {
        let event = CaptureEvent::Updated(EntitySnapshot::Courses(vec![Course {
            id: "10".into(),
            name: "Biology 101".into(),
            ..Default::default()
        }]));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "updated");
        assert_eq!(json["data"]["kind"], "courses");
        assert_eq!(json["data"]["entities"][0]["name"], "Biology 101");
    }
}
