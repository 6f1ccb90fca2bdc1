use super::{apply_field, DocumentStore};
use crate::error::{CostwiseError, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// In-memory storage for testing and development.
/// Does NOT persist data.
#[derive(Default)]
pub struct InMemoryStore {
    docs: BTreeMap<(String, String), Value>,
    fail_writes: bool,
    fail_reads: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail, to exercise the best-effort persistence paths.
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Make every read fail, to exercise the load fallback chain.
    pub fn fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes {
            return Err(CostwiseError::Persistence("store unreachable".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads {
            return Err(CostwiseError::Persistence("store unreachable".into()));
        }
        Ok(())
    }
}

impl DocumentStore for InMemoryStore {
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.check_read()?;
        Ok(self
            .docs
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }

    fn set_document(&mut self, collection: &str, id: &str, doc: Value) -> Result<()> {
        self.check_write()?;
        self.docs
            .insert((collection.to_string(), id.to_string()), doc);
        Ok(())
    }

    fn update_document(
        &mut self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, Value>,
    ) -> Result<()> {
        self.check_write()?;
        let doc = self
            .docs
            .entry((collection.to_string(), id.to_string()))
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        for (path, value) in fields {
            apply_field(doc, &path, value);
        }
        Ok(())
    }

    fn list_documents(&self, collection: &str) -> Result<Vec<Value>> {
        self.check_read()?;
        Ok(self
            .docs
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::model::{ModuleDef, NOTES_ID};
    use serde_json::json;

    /// An `InMemoryStore` pre-seeded with documents for registry tests.
    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
            }
        }

        /// Seed the settings document with a small tree: notes, a
        /// `roofing` header with a `tiles` child, and a `paving` leaf.
        pub fn with_module_tree(mut self) -> Self {
            let modules: Vec<ModuleDef> = vec![
                ModuleDef {
                    requires_client: false,
                    ..ModuleDef::regular(NOTES_ID, "Notes", None)
                },
                ModuleDef::header("roofing", "Roofing"),
                ModuleDef::regular("tiles", "Tiles", Some("roofing")),
                ModuleDef::regular("paving", "Paving", None),
            ];
            self.store
                .set_document(
                    "settings",
                    "modules",
                    json!({
                        "modules": modules,
                        "lastModified": chrono::Utc::now(),
                        "version": chrono::Utc::now().timestamp_millis(),
                    }),
                )
                .unwrap();
            self
        }

        pub fn with_client(mut self, id: &str, name: &str) -> Self {
            self.store
                .set_document(
                    "clients",
                    id,
                    json!({
                        "id": id,
                        "name": name,
                        "address": "",
                        "moduleData": {},
                        "created": chrono::Utc::now(),
                        "lastModified": chrono::Utc::now(),
                    }),
                )
                .unwrap();
            self
        }
    }
}
