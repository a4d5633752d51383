//! Shared catalog store: ID→format, format→ID, ID→location.
//!
//! The store is the only mutable state shared between parallel file tasks.
//! Every mutating operation runs inside one mutex section so two files can
//! never be handed the same fresh ID, and a conflict seen while processing
//! one file always observes the committed result of any file that finished
//! earlier.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::alloc::{self, AllocError, Strategy};
use crate::infra::transcript::Transcript;

/// Numeric trace identifier. 0 means unassigned; a negative value is a
/// transient "known but invalid here" marker and is never persisted.
pub type TraceId = i32;

/// Macro family name plus its literal format string. Field names match the
/// original catalog artifacts.
///
/// Equality is byte equality of both fields; the family name keeps its case,
/// so `TRICE` and `trice` are distinct for conflict detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceFormat {
    #[serde(rename = "Type")]
    pub type_name: String,
    #[serde(rename = "Strg")]
    pub format_string: String,
}

/// Where an ID was last seen in the source tree (base file name, 1-based line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLocation {
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "Line")]
    pub line: u32,
}

/// Outcome of [`CatalogStore::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// The effective ID for the statement.
    pub id: TraceId,
    /// True when a fresh ID was allocated (statement must be rewritten).
    pub fresh: bool,
}

#[derive(Default)]
struct Inner {
    id_to_format: HashMap<TraceId, TraceFormat>,
    format_to_id: HashMap<TraceFormat, TraceId>,
    id_to_location: HashMap<TraceId, TraceLocation>,
    catalogs_modified: bool,
}

pub struct CatalogStore {
    inner: Mutex<Inner>,
    id_min: TraceId,
    id_max: TraceId,
    strategy: Strategy,
}

impl CatalogStore {
    /// Builds the store from a loaded format catalog. The reverse index is
    /// derived here; the location catalog always starts empty because it is
    /// rebuilt from scratch on every run.
    pub fn new(
        formats: HashMap<TraceId, TraceFormat>,
        id_min: TraceId,
        id_max: TraceId,
        strategy: Strategy,
    ) -> Self {
        let format_to_id = formats
            .iter()
            .map(|(id, tf)| (tf.clone(), *id))
            .collect();
        CatalogStore {
            inner: Mutex::new(Inner {
                format_to_id,
                id_to_format: formats,
                id_to_location: HashMap::new(),
                catalogs_modified: false,
            }),
            id_min,
            id_max,
            strategy,
        }
    }

    /// Registers a scanned valid occurrence of (`id`, `format`) at `location`.
    ///
    /// If `id` already maps to a *different* format, the occurrence is
    /// reported and the negated ID is returned; the catalog keeps its entry.
    /// Otherwise the pair is inserted and the positive ID returned.
    pub fn observe(
        &self,
        id: TraceId,
        format: &TraceFormat,
        location: TraceLocation,
        transcript: &Transcript,
    ) -> TraceId {
        debug_assert!(id > 0);
        let mut g = self.inner.lock();

        if let Some(existing) = g.id_to_format.get(&id) {
            if existing != format {
                transcript.line(format_args!(
                    "ID {id} already used differently, ignoring it."
                ));
                return -id;
            }
        }
        g.id_to_location.insert(id, location);
        g.id_to_format.insert(id, format.clone());
        g.format_to_id.insert(format.clone(), id);
        id
    }

    /// Resolves the ID a statement should carry.
    ///
    /// Zero, negative, or conflicting IDs get a fresh allocation; a valid ID
    /// is kept as-is. The effective pair is (re-)inserted unconditionally so
    /// the catalogs self-heal after manual edits or a skipped refresh.
    pub fn resolve(&self, id: TraceId, format: &TraceFormat) -> Result<Resolved, AllocError> {
        let mut g = self.inner.lock();

        let mut id = id;
        if id > 0 {
            if let Some(existing) = g.id_to_format.get(&id) {
                if existing != format {
                    id = -id;
                }
            }
        }

        let fresh = id <= 0;
        if fresh {
            // Inserting below, still under the lock, reserves the ID before
            // any concurrent allocation can see it free.
            id = alloc::allocate(&g.id_to_format, self.id_min, self.id_max, self.strategy)?;
            g.catalogs_modified = true;
        }

        g.id_to_format.insert(id, format.clone());
        g.format_to_id.insert(format.clone(), id);
        Ok(Resolved { id, fresh })
    }

    /// True once any resolve call allocated a fresh ID.
    pub fn catalogs_modified(&self) -> bool {
        self.inner.lock().catalogs_modified
    }

    /// Number of entries in the format catalog.
    pub fn len(&self) -> usize {
        self.inner.lock().id_to_format.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the format catalog for persistence.
    pub fn formats(&self) -> HashMap<TraceId, TraceFormat> {
        self.inner.lock().id_to_format.clone()
    }

    /// Copy of the freshly rebuilt location catalog for persistence.
    pub fn locations(&self) -> HashMap<TraceId, TraceLocation> {
        self.inner.lock().id_to_location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(type_name: &str, s: &str) -> TraceFormat {
        TraceFormat {
            type_name: type_name.to_string(),
            format_string: s.to_string(),
        }
    }

    fn loc(line: u32) -> TraceLocation {
        TraceLocation {
            file: "file.c".to_string(),
            line,
        }
    }

    fn store(min: TraceId, max: TraceId) -> CatalogStore {
        CatalogStore::new(HashMap::new(), min, max, Strategy::Upward)
    }

    #[test]
    fn observe_registers_and_rejects_conflicts() {
        let (transcript, sink) = Transcript::memory(false);
        let s = store(1, 100);
        assert!(s.is_empty());

        assert_eq!(s.observe(7, &fmt("TRICE", "a"), loc(1), &transcript), 7);
        // Same pair again: silent, still registered once.
        assert_eq!(s.observe(7, &fmt("TRICE", "a"), loc(2), &transcript), 7);
        // Different format under the same ID: negated, catalog untouched.
        assert_eq!(s.observe(7, &fmt("TRICE", "b"), loc(3), &transcript), -7);

        assert!(!s.is_empty());
        assert_eq!(s.formats().get(&7), Some(&fmt("TRICE", "a")));
        let out = String::from_utf8(sink.lock().clone()).unwrap();
        assert!(out.contains("ID 7 already used differently"));
    }

    #[test]
    fn observe_distinguishes_type_name_case() {
        let (transcript, _sink) = Transcript::memory(false);
        let s = store(1, 100);
        assert_eq!(s.observe(9, &fmt("TRICE", "x"), loc(1), &transcript), 9);
        assert_eq!(s.observe(9, &fmt("trice", "x"), loc(2), &transcript), -9);
    }

    #[test]
    fn resolve_zero_allocates_fresh() {
        let s = store(1000, 2000);
        let r = s.resolve(0, &fmt("TRICE", "x")).unwrap();
        assert!(r.fresh);
        assert_eq!(r.id, 1000);
        assert!(s.catalogs_modified());
    }

    #[test]
    fn resolve_keeps_valid_and_self_heals() {
        let s = store(1000, 2000);
        // 1500 is unknown but non-zero: kept and inserted (self-heal).
        let r = s.resolve(1500, &fmt("TRICE", "x")).unwrap();
        assert_eq!(r, Resolved { id: 1500, fresh: false });
        assert_eq!(s.formats().get(&1500), Some(&fmt("TRICE", "x")));
        assert!(!s.catalogs_modified());
    }

    #[test]
    fn resolve_reallocates_on_conflict() {
        let s = store(1000, 2000);
        s.resolve(1000, &fmt("TRICE", "a")).unwrap();
        let r = s.resolve(1000, &fmt("TRICE", "b")).unwrap();
        assert!(r.fresh);
        assert_eq!(r.id, 1001);
        // Both entries survive.
        assert_eq!(s.formats().get(&1000), Some(&fmt("TRICE", "a")));
        assert_eq!(s.formats().get(&1001), Some(&fmt("TRICE", "b")));
    }

    #[test]
    fn resolve_negative_is_treated_like_zero() {
        let s = store(1000, 2000);
        let r = s.resolve(-42, &fmt("TRICE", "x")).unwrap();
        assert!(r.fresh);
        assert_eq!(r.id, 1000);
    }
}
