//! crates/course_capture_core/src/store.rs
//!
//! The entity store: one keyed container per entity kind, with upsert-by-natural-key
//! and insertion-ordered reads. Books are the one kind with two candidate keys, so
//! they get their own upsert.

use crate::domain::{
    Assignment, Book, CaptureSnapshot, CaptureSummary, Course, EntityKind, EntitySnapshot,
    Instructor, Record, Section, UserProfile,
};
use std::collections::HashMap;

//=========================================================================================
// Keyed Collection
//=========================================================================================

/// An insertion-ordered map from natural key to record.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    /// Merges `patch` into the record stored under `key`, creating it if absent.
    pub fn upsert(&mut self, key: &str, patch: T) -> &T {
        match self.index.get(key).copied() {
            Some(position) => {
                let existing = &mut self.items[position];
                existing.merge(patch);
                existing
            }
            None => {
                let position = self.items.len();
                self.index.insert(key.to_string(), position);
                self.items.push(patch);
                &self.items[position]
            }
        }
    }

    /// Upserts under the patch's own natural key. Returns `None` when the patch has
    /// no usable key, in which case nothing is stored.
    pub fn upsert_record(&mut self, patch: T) -> Option<&T> {
        let key = patch.natural_key();
        if key.is_empty() {
            return None;
        }
        Some(self.upsert(&key, patch))
    }

    /// Makes `alias` resolve to the record stored under `key`. Returns false when
    /// `key` is unknown or `alias` already names a record.
    pub fn alias(&mut self, alias: &str, key: &str) -> bool {
        if alias.is_empty() || self.index.contains_key(alias) {
            return false;
        }
        let Some(&position) = self.index.get(key) else {
            return false;
        };
        self.index.insert(alias.to_string(), position);
        true
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&position| &self.items[position])
    }

    /// All records, in the order they were first inserted.
    pub fn all(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

//=========================================================================================
// Entity Store
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    profile: Option<UserProfile>,
    pub courses: Collection<Course>,
    pub sections: Collection<Section>,
    pub instructors: Collection<Instructor>,
    pub books: Collection<Book>,
    pub assignments: Collection<Assignment>,
    /// Attempt patches that arrived before their assignment, keyed by assignment id.
    deferred_attempts: HashMap<String, Vec<Assignment>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Merges into the session's singleton profile.
    pub fn upsert_profile(&mut self, patch: UserProfile) -> &UserProfile {
        if let Some(existing) = self.profile.as_mut() {
            existing.merge(patch);
        } else {
            self.profile = Some(patch);
        }
        self.profile.get_or_insert_with(UserProfile::default)
    }

    /// Upserts a book under its isbn or title, whichever already names it. A book
    /// first seen by title alone merges into the same record once its isbn shows up,
    /// and both keys resolve to it afterwards. A title match is ignored when the two
    /// isbns disagree (different editions).
    pub fn upsert_book(&mut self, book: Book) -> Option<&Book> {
        let isbn = book.isbn.clone();
        let title = book.title.clone();
        let by_isbn = !isbn.is_empty() && self.books.get(&isbn).is_some();
        let by_title = !title.is_empty()
            && self.books.get(&title).is_some_and(|known| {
                isbn.is_empty() || known.isbn.is_empty() || known.isbn == isbn
            });
        let key = if by_isbn {
            isbn.clone()
        } else if by_title {
            title.clone()
        } else {
            book.natural_key()
        };
        if key.is_empty() {
            return None;
        }

        self.books.upsert(&key, book);
        self.books.alias(&isbn, &key);
        self.books.alias(&title, &key);
        self.books.get(&key)
    }

    /// Holds an attempt patch until the assignment it points at is upserted.
    pub fn defer_attempt(&mut self, patch: Assignment) {
        self.deferred_attempts
            .entry(patch.id.clone())
            .or_default()
            .push(patch);
    }

    /// Removes and returns the patches waiting on `assignment_id`, oldest first.
    pub fn take_deferred_attempts(&mut self, assignment_id: &str) -> Vec<Assignment> {
        self.deferred_attempts
            .remove(assignment_id)
            .unwrap_or_default()
    }

    pub fn deferred_attempt_count(&self) -> usize {
        self.deferred_attempts.values().map(Vec::len).sum()
    }

    /// True while no container holds anything at all. Deferred attempts don't count.
    pub fn is_empty(&self) -> bool {
        self.profile.is_none()
            && self.courses.is_empty()
            && self.sections.is_empty()
            && self.instructors.is_empty()
            && self.books.is_empty()
            && self.assignments.is_empty()
    }

    pub fn summary(&self) -> CaptureSummary {
        CaptureSummary {
            course_count: self.courses.len(),
            section_count: self.sections.len(),
            assignment_count: self.assignments.len(),
            instructor_count: self.instructors.len(),
            book_count: self.books.len(),
        }
    }

    /// The current ordered contents of one kind.
    pub fn snapshot_of(&self, kind: EntityKind) -> EntitySnapshot {
        match kind {
            EntityKind::Profile => EntitySnapshot::Profile(self.profile.clone()),
            EntityKind::Course => EntitySnapshot::Courses(self.courses.all().to_vec()),
            EntityKind::Section => EntitySnapshot::Sections(self.sections.all().to_vec()),
            EntityKind::Instructor => {
                EntitySnapshot::Instructors(self.instructors.all().to_vec())
            }
            EntityKind::Book => EntitySnapshot::Books(self.books.all().to_vec()),
            EntityKind::Assignment => {
                EntitySnapshot::Assignments(self.assignments.all().to_vec())
            }
        }
    }

    pub fn to_snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            profile: self.profile.clone(),
            courses: self.courses.all().to_vec(),
            sections: self.sections.all().to_vec(),
            instructors: self.instructors.all().to_vec(),
            books: self.books.all().to_vec(),
            assignments: self.assignments.all().to_vec(),
        }
    }

    /// Replays a snapshot as an ordinary sequence of upserts.
    pub fn absorb(&mut self, snapshot: CaptureSnapshot) {
        if let Some(profile) = snapshot.profile {
            self.upsert_profile(profile);
        }
        for course in snapshot.courses {
            self.courses.upsert_record(course);
        }
        for section in snapshot.sections {
            self.sections.upsert_record(section);
        }
        for instructor in snapshot.instructors {
            self.instructors.upsert_record(instructor);
        }
        for book in snapshot.books {
            self.upsert_book(book);
        }
        for assignment in snapshot.assignments {
            self.assignments.upsert_record(assignment);
        }
    }
}
