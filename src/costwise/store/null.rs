use super::DocumentStore;
use crate::error::Result;
use serde_json::Value;
use std::collections::BTreeMap;

/// Inert store for degraded mode: selected when the real store cannot be
/// reached at startup. Reads miss, writes succeed as no-ops, so the rest
/// of the system keeps running on the session backup and defaults.
#[derive(Default)]
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentStore for NullStore {
    fn get_document(&self, _collection: &str, _id: &str) -> Result<Option<Value>> {
        Ok(None)
    }

    fn set_document(&mut self, _collection: &str, _id: &str, _doc: Value) -> Result<()> {
        Ok(())
    }

    fn update_document(
        &mut self,
        _collection: &str,
        _id: &str,
        _fields: BTreeMap<String, Value>,
    ) -> Result<()> {
        Ok(())
    }

    fn list_documents(&self, _collection: &str) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}
