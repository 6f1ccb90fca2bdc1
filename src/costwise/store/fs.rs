use super::{apply_field, DocumentStore};
use crate::error::{CostwiseError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File-backed document store: `<root>/<collection>/<id>.json`, one
/// pretty-printed JSON document per file.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn doc_path(&self, collection: &str, id: &str) -> PathBuf {
        self.root.join(collection).join(format!("{}.json", id))
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(CostwiseError::Io)?;
        }
        Ok(())
    }

    fn write_doc(&self, collection: &str, id: &str, doc: &Value) -> Result<()> {
        self.ensure_dir(&self.root.join(collection))?;
        let content = serde_json::to_string_pretty(doc).map_err(CostwiseError::Serialization)?;
        fs::write(self.doc_path(collection, id), content).map_err(CostwiseError::Io)?;
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let path = self.doc_path(collection, id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(CostwiseError::Io)?;
        let doc = serde_json::from_str(&content).map_err(CostwiseError::Serialization)?;
        Ok(Some(doc))
    }

    fn set_document(&mut self, collection: &str, id: &str, doc: Value) -> Result<()> {
        self.write_doc(collection, id, &doc)
    }

    fn update_document(
        &mut self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, Value>,
    ) -> Result<()> {
        let mut doc = self
            .get_document(collection, id)?
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        for (path, value) in fields {
            apply_field(&mut doc, &path, value);
        }
        self.write_doc(collection, id, &doc)
    }

    fn list_documents(&self, collection: &str) -> Result<Vec<Value>> {
        let dir = self.root.join(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut docs = Vec::new();
        let mut entries: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(CostwiseError::Io)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();
        for path in entries {
            let content = fs::read_to_string(&path).map_err(CostwiseError::Io)?;
            match serde_json::from_str(&content) {
                Ok(doc) => docs.push(doc),
                // A single corrupt file should not take down the whole scan.
                Err(e) => log::warn!("skipping unreadable document {}: {}", path.display(), e),
            }
        }
        Ok(docs)
    }
}
