//! crates/course_capture_core/src/resolver.rs
//!
//! Cross-reference derivation: fields that only exist once two or more entity kinds
//! have been joined. Every function here is a pure read of the store as it is at the
//! moment of the call. Nothing is re-derived later when a missing leg arrives.

use crate::domain::{Assignment, Instructor, Section};
use crate::store::EntityStore;

/// The derived fields of an assignment. Any leg that cannot be resolved yet is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentLinks {
    pub section_name: String,
    pub course_name: String,
    pub course_id: String,
}

impl AssignmentLinks {
    pub fn apply_to(self, assignment: &mut Assignment) {
        assignment.section_name = self.section_name;
        assignment.course_name = self.course_name;
        assignment.course_id = self.course_id;
    }
}

/// Joins an assignment's section foreign key to its section and, through it, its course.
pub fn resolve_assignment(store: &EntityStore, section_id: &str) -> AssignmentLinks {
    let Some(section) = store.sections.get(section_id) else {
        return AssignmentLinks::default();
    };

    let course_name = store
        .courses
        .get(&section.course_id)
        .map(|course| course.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| section.course_name.clone());

    AssignmentLinks {
        section_name: section.name.clone(),
        course_name,
        course_id: section.course_id.clone(),
    }
}

/// The instructor a section implies, if the section names one.
pub fn instructor_for_section(section: &Section) -> Option<Instructor> {
    if section.instructor_name.is_empty() {
        return None;
    }
    Some(Instructor {
        id: section.instructor_id.clone(),
        name: section.instructor_name.clone(),
        email: section.instructor_email.clone(),
        section_id: section.id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Course;

    fn store_with_section(course: Option<Course>) -> EntityStore {
        let mut store = EntityStore::new();
        if let Some(course) = course {
            store.courses.upsert_record(course);
        }
        store.sections.upsert_record(Section {
            id: "20".into(),
            name: "Sec A".into(),
            course_id: "10".into(),
            ..Default::default()
        });
        store
    }

    #[test]
    fn resolves_both_legs_when_known() {
        let store = store_with_section(Some(Course {
            id: "10".into(),
            name: "Biology 101".into(),
            ..Default::default()
        }));
        let links = resolve_assignment(&store, "20");
        assert_eq!(links.section_name, "Sec A");
        assert_eq!(links.course_name, "Biology 101");
        assert_eq!(links.course_id, "10");
    }

    #[test]
    fn missing_course_leaves_course_name_empty() {
        let store = store_with_section(None);
        let links = resolve_assignment(&store, "20");
        assert_eq!(links.section_name, "Sec A");
        assert_eq!(links.course_name, "");
        assert_eq!(links.course_id, "10");
    }

    #[test]
    fn missing_section_resolves_nothing() {
        let store = EntityStore::new();
        assert_eq!(resolve_assignment(&store, "20"), AssignmentLinks::default());
    }

    #[test]
    fn section_without_instructor_yields_none() {
        let section = Section {
            id: "20".into(),
            ..Default::default()
        };
        assert!(instructor_for_section(&section).is_none());
    }
}
