//! crates/course_capture_core/src/router.rs
//!
//! Classifies an incoming (origin, payload) pair to the normalizer that handles it.
//!
//! Origins are matched against a fixed keyword table first; the first hit wins.
//! Payloads from endpoints the table does not know fall back to a shape check,
//! and anything still unrecognized is dropped without error.

use serde::Serialize;
use serde_json::Value;

use crate::normalize::lookup;

/// The normalizer a payload is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Profile,
    Coursework,
    Instructor,
    BookList,
    BookDetail,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Profile => "profile",
            Route::Coursework => "coursework",
            Route::Instructor => "instructor",
            Route::BookList => "book_list",
            Route::BookDetail => "book_detail",
        }
    }
}

/// Lowercase origin keywords, checked in order.
const ORIGIN_ROUTES: &[(&str, Route)] = &[
    ("studentassignments", Route::Coursework),
    ("instructorinfo", Route::Instructor),
    ("userprofile", Route::Profile),
    ("/users/me", Route::Profile),
    ("/me?", Route::Profile),
    ("whoami", Route::Profile),
    ("textbooks", Route::BookList),
    ("ebooks", Route::BookList),
    ("courseware/books", Route::BookList),
    ("productinfo", Route::BookDetail),
    ("isbn/", Route::BookDetail),
];

/// Keys whose presence marks a payload as describing the signed-in user.
const PROFILE_MARKERS: &[&str] = &[
    "userId",
    "user_id",
    "email",
    "firstName",
    "first_name",
    "givenName",
];

/// Wrappers a profile commonly sits inside.
pub(crate) const PROFILE_NESTING: &[&str] = &["user", "profile", "data", "result"];

const COURSEWORK_MARKERS: &[&str] = &["courses", "sections", "studentAssignments"];

pub fn classify(origin: &str, payload: &Value) -> Option<Route> {
    classify_origin(origin).or_else(|| classify_shape(payload))
}

pub fn classify_origin(origin: &str) -> Option<Route> {
    let origin = origin.to_ascii_lowercase();
    ORIGIN_ROUTES
        .iter()
        .find(|(keyword, _)| origin.contains(keyword))
        .map(|&(_, route)| route)
}

/// Guesses a route from the payload alone.
pub fn classify_shape(payload: &Value) -> Option<Route> {
    let has_any = |value: &Value, keys: &[&str]| keys.iter().any(|key| value.get(key).is_some());

    let looks_like_profile = has_any(payload, PROFILE_MARKERS)
        || PROFILE_NESTING
            .iter()
            .filter_map(|wrapper| lookup(payload, wrapper))
            .any(|inner| has_any(inner, PROFILE_MARKERS));
    if looks_like_profile {
        return Some(Route::Profile);
    }
    if has_any(payload, COURSEWORK_MARKERS) {
        return Some(Route::Coursework);
    }
    None
}
