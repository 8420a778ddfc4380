//! crates/course_capture_core/src/normalize/instructor.rs
//!
//! Normalizes the per-section instructor endpoint. The payload rarely says which
//! section it belongs to, so the section id is usually read out of the origin.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

use super::{lookup, text, Touched};
use crate::domain::{EntityKind, Instructor, Record};
use crate::store::EntityStore;

const WRAPPERS: &[&str] = &["instructor", "data", "result"];

fn section_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:sections?/|sectionid=)([A-Za-z0-9_-]+)")
            .expect("section id pattern is valid")
    })
}

/// Pulls a section id out of an origin such as `/sections/20/instructorinfo`
/// or `/instructorinfo?sectionId=20`.
pub fn section_id_from_origin(origin: &str) -> Option<String> {
    section_pattern()
        .captures(origin)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().to_string())
}

pub fn normalize(origin: &str, payload: &Value, store: &mut EntityStore) -> Touched {
    let mut touched = Touched::default();

    let body = WRAPPERS
        .iter()
        .filter_map(|wrapper| lookup(payload, wrapper))
        .find(|inner| inner.is_object())
        .unwrap_or(payload);

    let mut name = text(body, &["name", "fullName", "displayName"]);
    if name.is_empty() {
        name = [
            text(body, &["firstName", "first_name"]),
            text(body, &["lastName", "last_name"]),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    }

    let mut section_id = text(body, &["sectionId", "section"]);
    if section_id.is_empty() {
        section_id = section_id_from_origin(origin).unwrap_or_default();
    }

    let instructor = Instructor {
        id: text(body, &["id", "instructorId", "userId"]),
        name,
        email: text(body, &["email", "userName", "instructorUserName"]),
        section_id,
    };

    if instructor.name.is_empty() && instructor.email.is_empty() {
        debug!(origin, "Instructor payload had neither name nor email");
        return touched;
    }
    if instructor.natural_key().is_empty() {
        debug!(origin, "Instructor payload had no section or instructor id");
        return touched;
    }

    store.instructors.upsert_record(instructor);
    touched.mark(EntityKind::Instructor);
    touched
}
