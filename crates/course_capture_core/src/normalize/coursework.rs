//! crates/course_capture_core/src/normalize/coursework.rs
//!
//! The combined course / section / assignment normalizer. One payload may carry any
//! mix of `courses`, `sections`, `studentAssignments` and `attempts` arrays; they are
//! applied in that order so that later arrays can join against earlier ones.

use serde_json::Value;
use tracing::debug;

use super::{flag, items, number, text, Touched};
use crate::domain::{Assignment, Attempt, Course, EntityKind, Section};
use crate::resolver::{instructor_for_section, resolve_assignment};
use crate::store::EntityStore;

pub fn normalize(payload: &Value, store: &mut EntityStore) -> Touched {
    let mut touched = Touched::default();

    for raw in items(payload, "courses") {
        if store.courses.upsert_record(course_from(raw)).is_some() {
            touched.mark(EntityKind::Course);
        }
    }

    for raw in items(payload, "sections") {
        let Some(section) = store.sections.upsert_record(section_from(raw)).cloned() else {
            continue;
        };
        touched.mark(EntityKind::Section);

        if let Some(instructor) = instructor_for_section(&section) {
            store.instructors.upsert_record(instructor);
            touched.mark(EntityKind::Instructor);
        }
    }

    for raw in items(payload, "studentAssignments") {
        let mut assignment = assignment_from(raw);
        if assignment.id.is_empty() {
            continue;
        }
        // A payload that omits the section still joins through the stored one.
        if assignment.section_id.is_empty() {
            if let Some(known) = store.assignments.get(&assignment.id) {
                assignment.section_id = known.section_id.clone();
            }
        }
        resolve_assignment(store, &assignment.section_id).apply_to(&mut assignment);
        let key = assignment.id.clone();
        store.assignments.upsert(&key, assignment);
        for patch in store.take_deferred_attempts(&key) {
            store.assignments.upsert(&key, patch);
        }
        touched.mark(EntityKind::Assignment);
    }

    for raw in items(payload, "attempts") {
        let attempt = attempt_from(raw);
        if attempt.student_assignment.is_empty() {
            continue;
        }
        let mut patch = attempt.to_patch();
        let Some(known) = store.assignments.get(&attempt.student_assignment) else {
            debug!(
                assignment_id = %attempt.student_assignment,
                "Attempt deferred until its assignment arrives"
            );
            store.defer_attempt(patch);
            continue;
        };

        resolve_assignment(store, &known.section_id).apply_to(&mut patch);
        store.assignments.upsert(&attempt.student_assignment, patch);
        touched.mark(EntityKind::Assignment);
    }

    touched
}

//=========================================================================================
// Payload Shapes
//=========================================================================================

fn course_from(raw: &Value) -> Course {
    Course {
        id: text(raw, &["id", "courseId"]),
        name: text(raw, &["name", "courseName", "title"]),
        code: text(raw, &["code", "courseCode"]),
        time_zone: text(raw, &["timeZone", "timezone"]),
        discipline_id: text(raw, &["disciplineId", "discipline.id"]),
        discipline_name: text(raw, &["disciplineName", "discipline.name"]),
        is_self_study_enabled: flag(raw, &["isSelfStudyEnabled", "selfStudyEnabled"]),
    }
}

fn section_from(raw: &Value) -> Section {
    Section {
        id: text(raw, &["id", "sectionId"]),
        name: text(raw, &["name", "sectionName", "title"]),
        course_id: text(raw, &["course", "courseId", "course.id"]),
        course_name: text(raw, &["courseName", "course.name"]),
        instructor_id: text(raw, &["instructorId", "instructor.id"]),
        instructor_name: text(raw, &["instructorName", "instructor.name"]),
        instructor_email: text(
            raw,
            &["instructorUserName", "instructorEmail", "instructor.email"],
        ),
        section_url: text(raw, &["sectionUrl", "url"]),
        is_archived: flag(raw, &["isArchived", "archived"]),
    }
}

fn assignment_from(raw: &Value) -> Assignment {
    let status = text(raw, &["status", "assignmentStatus"]).to_ascii_uppercase();
    let completed = matches!(status.as_str(), "COMPLETE" | "COMPLETED")
        || flag(raw, &["completed", "isCompleted"]).unwrap_or(false);
    let in_progress = flag(raw, &["inProgress"])
        .or_else(|| (!status.is_empty()).then(|| status == "IN_PROGRESS"));

    Assignment {
        id: text(raw, &["id", "studentAssignmentId"]),
        name: text(raw, &["name", "title", "assignmentName"]),
        section_id: text(raw, &["section", "sectionId", "section.id"]),
        status,
        due_date: text(raw, &["dueDate", "dueDateTime", "due"]),
        completed,
        in_progress,
        ..Default::default()
    }
}

fn attempt_from(raw: &Value) -> Attempt {
    Attempt {
        student_assignment: text(raw, &["studentAssignment", "studentAssignmentId"]),
        attempt_id: text(raw, &["id", "attemptId"]),
        submitted_date_time: text(raw, &["submittedDateTime", "submittedAt"]),
        in_progress: flag(raw, &["inProgress"]),
        machine_score: number(raw, &["machineScore"]),
        manual_score: number(raw, &["manualScore"]),
        seconds_spent: number(raw, &["secondsSpent", "timeSpent"])
            .filter(|seconds| *seconds >= 0.0)
            .map(|seconds| seconds.round() as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seeded_store() -> EntityStore {
        let mut store = EntityStore::new();
        normalize(
            &json!({
                "courses": [{ "id": "10", "name": "Biology 101" }],
                "sections": [{
                    "id": "20", "course": "10", "name": "Sec A",
                    "instructorName": "Dr. Smith", "instructorUserName": "smith@uni.edu"
                }]
            }),
            &mut store,
        );
        store
    }

    #[test]
    fn section_synthesizes_instructor() {
        let store = seeded_store();
        let instructor = store.instructors.get("20").expect("instructor keyed by section");
        assert_eq!(instructor.name, "Dr. Smith");
        assert_eq!(instructor.email, "smith@uni.edu");
        assert_eq!(store.sections.get("20").unwrap().course_id, "10");
    }

    #[test]
    fn assignment_joins_known_section_and_course() {
        let mut store = seeded_store();
        let touched = normalize(
            &json!({ "studentAssignments": [{ "id": 5, "section": 20, "status": "in_progress" }] }),
            &mut store,
        );
        assert_eq!(touched.kinds(), [EntityKind::Assignment]);

        let assignment = store.assignments.get("5").unwrap();
        assert_eq!(assignment.section_name, "Sec A");
        assert_eq!(assignment.course_name, "Biology 101");
        assert_eq!(assignment.course_id, "10");
        assert_eq!(assignment.in_progress, Some(true));
        assert!(!assignment.completed);
    }

    #[test]
    fn attempt_with_submission_completes_assignment() {
        let mut store = seeded_store();
        normalize(
            &json!({ "studentAssignments": [{ "id": "5", "section": "20" }] }),
            &mut store,
        );
        normalize(
            &json!({ "attempts": [{
                "id": "a-1", "studentAssignment": "5",
                "submittedDateTime": "2024-01-01T00:00:00Z",
                "machineScore": 9, "secondsSpent": 120.4
            }] }),
            &mut store,
        );

        let assignment = store.assignments.get("5").unwrap();
        assert!(assignment.completed);
        assert_eq!(assignment.in_progress, Some(false));
        assert_eq!(assignment.attempt_id, "a-1");
        assert_eq!(assignment.machine_score, Some(9.0));
        assert_eq!(assignment.seconds_spent, Some(120));
    }

    #[test]
    fn early_attempt_is_held_then_applied_to_its_assignment() {
        let mut store = seeded_store();
        let touched = normalize(
            &json!({ "attempts": [{
                "id": "a-1", "studentAssignment": "5",
                "submittedDateTime": "2024-01-01T00:00:00Z"
            }] }),
            &mut store,
        );
        assert!(touched.is_empty());
        assert!(store.assignments.is_empty());
        assert_eq!(store.deferred_attempt_count(), 1);

        normalize(
            &json!({ "studentAssignments": [{ "id": "5", "section": "20", "status": "IN_PROGRESS" }] }),
            &mut store,
        );
        let assignment = store.assignments.get("5").unwrap();
        assert!(assignment.completed);
        assert_eq!(assignment.in_progress, Some(false));
        assert_eq!(assignment.attempt_id, "a-1");
        assert_eq!(assignment.section_name, "Sec A");
        assert_eq!(store.deferred_attempt_count(), 0);
    }

    #[test]
    fn attempt_without_assignment_id_is_dropped() {
        let mut store = EntityStore::new();
        normalize(&json!({ "attempts": [{ "submittedDateTime": "x" }] }), &mut store);
        assert_eq!(store.deferred_attempt_count(), 0);
    }

    #[test]
    fn derived_fields_are_not_revisited_when_section_arrives_later() {
        let mut store = EntityStore::new();
        normalize(
            &json!({ "studentAssignments": [{ "id": "5", "section": "20" }] }),
            &mut store,
        );
        normalize(
            &json!({ "sections": [{ "id": "20", "name": "Sec A", "course": "10" }] }),
            &mut store,
        );
        assert_eq!(store.assignments.get("5").unwrap().section_name, "");

        // A fresh upsert on the same key picks up the join.
        normalize(
            &json!({ "studentAssignments": [{ "id": "5" }] }),
            &mut store,
        );
        assert_eq!(store.assignments.get("5").unwrap().section_name, "Sec A");
    }

    #[test]
    fn entries_without_ids_are_ignored() {
        let mut store = EntityStore::new();
        let touched = normalize(
            &json!({ "courses": [{ "name": "No id" }], "sections": [{}], "studentAssignments": [{}] }),
            &mut store,
        );
        assert!(touched.is_empty());
        assert!(store.is_empty());
    }
}
