//! crates/course_capture_core/src/normalize/books.rs
//!
//! Two book normalizers, one per endpoint family: the course-materials list and the
//! single-product detail. Both accept a lone object, a bare array, or an array
//! wrapped under a container key, and both dedup by isbn falling back to title.

use serde_json::Value;

use super::{lookup, scalar_text, text, Touched};
use crate::domain::{Book, EntityKind};
use crate::store::EntityStore;

/// Field aliases for one endpoint family.
struct BookShape {
    containers: &'static [&'static str],
    isbn: &'static [&'static str],
    title: &'static [&'static str],
    author: &'static [&'static str],
    edition: &'static [&'static str],
    cover_url: &'static [&'static str],
    section_id: &'static [&'static str],
}

const LIST_SHAPE: BookShape = BookShape {
    containers: &["books", "textbooks", "items", "data", "results"],
    isbn: &["isbn", "isbn13", "isbn10", "ISBN"],
    title: &["title", "name", "bookTitle"],
    author: &["author", "authors"],
    edition: &["edition", "editionNumber"],
    cover_url: &["coverUrl", "coverImageUrl", "thumbnail", "imageUrl"],
    section_id: &["sectionId", "section"],
};

const DETAIL_SHAPE: BookShape = BookShape {
    containers: &["product", "book", "products", "data"],
    isbn: &["productIsbn", "isbn13", "isbn", "ean"],
    title: &["productTitle", "title", "name"],
    author: &["authorName", "authors", "author", "contributors"],
    edition: &["edition", "editionNumber", "version"],
    cover_url: &["coverImage", "coverImageUrl", "image.url", "imageUrl"],
    section_id: &["sectionId"],
};

pub fn normalize_list(payload: &Value, store: &mut EntityStore) -> Touched {
    upsert_books(payload, &LIST_SHAPE, store)
}

pub fn normalize_detail(payload: &Value, store: &mut EntityStore) -> Touched {
    upsert_books(payload, &DETAIL_SHAPE, store)
}

fn upsert_books(payload: &Value, shape: &BookShape, store: &mut EntityStore) -> Touched {
    let mut touched = Touched::default();
    for raw in candidates(payload, shape) {
        let book = book_from(raw, shape);
        if book.title.is_empty() && book.isbn.is_empty() {
            continue;
        }
        if store.upsert_book(book).is_some() {
            touched.mark(EntityKind::Book);
        }
    }
    touched
}

/// The book-like objects inside a payload.
fn candidates<'a>(payload: &'a Value, shape: &BookShape) -> Vec<&'a Value> {
    if let Some(array) = payload.as_array() {
        return array.iter().filter(|item| item.is_object()).collect();
    }
    for container in shape.containers {
        match lookup(payload, container) {
            Some(Value::Array(array)) => {
                return array.iter().filter(|item| item.is_object()).collect()
            }
            Some(inner) if inner.is_object() => return vec![inner],
            _ => {}
        }
    }
    if payload.is_object() {
        vec![payload]
    } else {
        Vec::new()
    }
}

fn book_from(raw: &Value, shape: &BookShape) -> Book {
    Book {
        isbn: text(raw, shape.isbn).replace('-', ""),
        title: text(raw, shape.title),
        author: authors(raw, shape.author),
        edition: text(raw, shape.edition),
        cover_url: text(raw, shape.cover_url),
        section_id: text(raw, shape.section_id),
    }
}

/// Authors arrive as a string, a list of strings, or a list of `{name}` objects.
fn authors(raw: &Value, keys: &[&str]) -> String {
    for key in keys {
        match lookup(raw, key) {
            Some(Value::Array(list)) => {
                let names: Vec<String> = list
                    .iter()
                    .map(|entry| match entry {
                        Value::Object(_) => text(entry, &["name", "fullName"]),
                        other => scalar_text(other).unwrap_or_default(),
                    })
                    .filter(|name| !name.is_empty())
                    .collect();
                if !names.is_empty() {
                    return names.join(", ");
                }
            }
            Some(value) => {
                if let Some(single) = scalar_text(value) {
                    return single;
                }
            }
            None => {}
        }
    }
    String::new()
}
