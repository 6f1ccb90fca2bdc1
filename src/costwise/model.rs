use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The reserved module present in every tree. Never deletable, always first.
pub const NOTES_ID: &str = "notes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Regular,
    Header,
}

/// A node in the cost-category tree.
///
/// The tree is kept as a flat list with `parent_id` links. `order` is a
/// dense 0-based rank among siblings sharing the same `parent_id`; it is
/// derived from list position and recomputed after every structural
/// mutation, never edited directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    #[serde(default, deserialize_with = "deserialize_parent_id")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub requires_client: bool,
    // -1 marks "missing in the stored document"; load() replaces it with
    // the entry's list index before recomputing dense ranks.
    #[serde(default = "missing_order")]
    pub order: i64,
}

fn missing_order() -> i64 {
    -1
}

/// Legacy documents encode an absent parent as the *string* "null" (or
/// "undefined"). Coerce those to a real None.
fn deserialize_parent_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(normalize_parent(raw))
}

pub fn normalize_parent(raw: Option<String>) -> Option<String> {
    match raw.as_deref() {
        None | Some("null") | Some("undefined") | Some("") => None,
        Some(_) => raw,
    }
}

impl ModuleDef {
    pub fn regular(id: &str, name: &str, parent_id: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: ModuleKind::Regular,
            parent_id: parent_id.map(str::to_string),
            requires_client: true,
            order: -1,
        }
    }

    pub fn header(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: ModuleKind::Header,
            parent_id: None,
            requires_client: false,
            order: -1,
        }
    }

    pub fn is_header(&self) -> bool {
        self.kind == ModuleKind::Header
    }

    pub fn is_notes(&self) -> bool {
        self.id == NOTES_ID
    }
}

/// Derive a stable id from a display name: lowercase, spaces to hyphens,
/// anything outside [a-z0-9-] dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_whitespace() {
            slug.push('-');
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
            slug.push(c);
        }
    }
    slug
}

/// Per-module payload stored on a client. The `data` shape is owned by the
/// module's own page; the core treats it as an opaque serializable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleData {
    pub data: Value,
    pub last_modified: DateTime<Utc>,
    pub version: i64,
}

impl ModuleData {
    pub fn new(data: Value) -> Self {
        let now = Utc::now();
        Self {
            data,
            last_modified: now,
            version: now.timestamp_millis(),
        }
    }
}

/// A project/customer. Exactly one client may be "current" per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub module_data: BTreeMap<String, ModuleData>,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Client {
    pub fn new(name: String, address: String) -> Self {
        let now = Utc::now();
        Self {
            id: format!("client-{}", now.timestamp_millis()),
            name,
            address,
            module_data: BTreeMap::new(),
            created: now,
            last_modified: now,
        }
    }
}
