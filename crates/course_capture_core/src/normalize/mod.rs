//! crates/course_capture_core/src/normalize/mod.rs
//!
//! Normalizers turn loosely-shaped payloads into canonical records and upsert them.
//! Each one reports which entity kinds it touched so the session can notify
//! subscribers; a payload with nothing usable touches nothing.

pub mod books;
pub mod coursework;
pub mod instructor;
pub mod profile;

use serde_json::Value;

use crate::domain::EntityKind;
use crate::router::Route;
use crate::store::EntityStore;

/// The entity kinds a normalizer upserted into, in first-touched order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Touched(Vec<EntityKind>);

impl Touched {
    pub fn mark(&mut self, kind: EntityKind) {
        if !self.0.contains(&kind) {
            self.0.push(kind);
        }
    }

    pub fn kinds(&self) -> &[EntityKind] {
        &self.0
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Runs the normalizer selected by the router.
pub fn apply(route: Route, origin: &str, payload: &Value, store: &mut EntityStore) -> Touched {
    match route {
        Route::Profile => profile::normalize(payload, store),
        Route::Coursework => coursework::normalize(payload, store),
        Route::Instructor => instructor::normalize(origin, payload, store),
        Route::BookList => books::normalize_list(payload, store),
        Route::BookDetail => books::normalize_detail(payload, store),
    }
}

//=========================================================================================
// Field Extraction
//=========================================================================================

/// Resolves `path` against `value`; dots step into nested objects (`discipline.name`).
pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, step| current.get(step))
}

/// Renders a scalar as text. Numbers are accepted because ids arrive as both.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The first non-empty scalar found under any of `keys`, or an empty string.
pub(crate) fn text(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| lookup(value, key).and_then(scalar_text))
        .next()
        .unwrap_or_default()
}

/// The first boolean-like value under any of `keys`. Accepts `"true"`/`"false"`.
pub(crate) fn flag(value: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter()
        .filter_map(|key| lookup(value, key))
        .find_map(|found| match found {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        })
}

pub(crate) fn number(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| lookup(value, key))
        .find_map(|found| match found {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

/// The array under `key`, or an empty slice when missing or not an array.
pub(crate) fn items<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_takes_first_non_empty_alias() {
        let value = json!({ "title": "  ", "name": "Biology", "id": 10 });
        assert_eq!(text(&value, &["title", "name"]), "Biology");
        assert_eq!(text(&value, &["id"]), "10");
        assert_eq!(text(&value, &["missing"]), "");
    }

    #[test]
    fn text_follows_dotted_paths() {
        let value = json!({ "discipline": { "id": 7, "name": "Life Sciences" } });
        assert_eq!(text(&value, &["discipline.name"]), "Life Sciences");
        assert_eq!(text(&value, &["discipline"]), "");
    }

    #[test]
    fn flag_and_number_accept_strings() {
        let value = json!({ "archived": "TRUE", "score": "87.5" });
        assert_eq!(flag(&value, &["archived"]), Some(true));
        assert_eq!(number(&value, &["score"]), Some(87.5));
        assert_eq!(flag(&value, &["score"]), None);
    }

    #[test]
    fn items_tolerates_non_arrays() {
        let value = json!({ "courses": { "id": 1 } });
        assert!(items(&value, "courses").is_empty());
        assert!(items(&Value::Null, "courses").is_empty());
    }
}
