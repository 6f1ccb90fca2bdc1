//! # Storage Layer
//!
//! The remote document database is consumed through the [`DocumentStore`]
//! trait: opaque JSON documents addressed by `(collection, id)`, with
//! whole-document set, dotted-path partial update, and a collection scan.
//!
//! ## Implementations
//!
//! - [`fs::FileStore`]: production storage, one JSON file per document
//! - [`memory::InMemoryStore`]: in-memory storage for tests, with a
//!   write-failure knob so fallback paths can be exercised
//! - [`null::NullStore`]: the degraded-mode stand-in when the real store
//!   cannot be reached at startup (reads miss, writes are no-ops)
//!
//! Individual remote writes are costly, so callers do not write through the
//! trait directly: they enqueue into a [`batch::BatchQueue`], which commits
//! when full, after an idle delay, or on an explicit flush.

use crate::error::Result;
use serde_json::Value;
use std::collections::BTreeMap;

pub mod batch;
pub mod fs;
pub mod memory;
pub mod null;

/// Abstract interface to the remote document store.
///
/// Write failures surface as `CostwiseError::Persistence`; callers treat
/// them as best-effort and never roll back in-memory state.
pub trait DocumentStore {
    /// Fetch a document, or `None` if it does not exist.
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Create or overwrite a whole document.
    fn set_document(&mut self, collection: &str, id: &str, doc: Value) -> Result<()>;

    /// Merge `fields` into an existing document. Keys are dotted paths
    /// (`moduleData.brickwork`), so a single save touches only its own
    /// subtree and leaves sibling fields alone. Missing documents are
    /// created from the update alone.
    fn update_document(
        &mut self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, Value>,
    ) -> Result<()>;

    /// Scan a collection, returning every document.
    fn list_documents(&self, collection: &str) -> Result<Vec<Value>>;
}

/// Apply one dotted-path assignment to a JSON document in place.
/// Intermediate segments are created as objects; a non-object in the way is
/// replaced.
pub(crate) fn apply_field(doc: &mut Value, path: &str, value: Value) {
    if !doc.is_object() {
        *doc = Value::Object(serde_json::Map::new());
    }
    let mut node = doc;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let map = node.as_object_mut().expect("node coerced to object");
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        let child = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if !child.is_object() {
            *child = Value::Object(serde_json::Map::new());
        }
        node = child;
    }
}
