//! The module-definition registry: sole owner of the canonical
//! cost-category tree.
//!
//! The tree is a flat list with `parent_id` links. List position is the
//! source of truth during a structural edit; [`ModuleRegistry::recalc_order`]
//! is the single step that folds position back into the stored `order`
//! field before anything is persisted.
//!
//! Persistence is optimistic-local: every mutation lands in memory first,
//! the session backup and the batched remote write are best-effort, and a
//! dead store never blocks or reverts an edit.

use crate::defaults;
use crate::error::{CostwiseError, Result};
use crate::model::{normalize_parent, slugify, ModuleDef, ModuleKind, NOTES_ID};
use crate::session::SessionSlots;
use crate::store::batch::BatchQueue;
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Instant;

pub const SETTINGS_COLLECTION: &str = "settings";
pub const MODULES_DOC_ID: &str = "modules";

/// Shape of the `settings/modules` document in the remote store.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModulesDoc {
    modules: Vec<ModuleDef>,
    last_modified: DateTime<Utc>,
    version: i64,
}

/// Where a dragged node lands relative to the drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    /// Immediately before the target, as its sibling.
    Top,
    /// Into the target header's child group, appended last.
    Middle,
    /// Immediately after the target, as its sibling.
    Bottom,
}

impl FromStr for DropPosition {
    type Err = CostwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "top" | "before" => Ok(DropPosition::Top),
            "middle" | "into" => Ok(DropPosition::Middle),
            "bottom" | "after" => Ok(DropPosition::Bottom),
            other => Err(CostwiseError::Validation(format!(
                "Unknown position '{}' (expected top, into or bottom)",
                other
            ))),
        }
    }
}

/// Input for [`ModuleRegistry::add`].
#[derive(Debug, Clone)]
pub struct NewModule {
    pub name: String,
    pub kind: ModuleKind,
    pub parent_id: Option<String>,
    pub requires_client: bool,
}

pub type RefreshHook = Box<dyn FnMut(&[ModuleDef])>;

pub struct ModuleRegistry<S: DocumentStore> {
    modules: Vec<ModuleDef>,
    queue: BatchQueue<S>,
    slots: SessionSlots,
    // Late-bound: views register after construction; absence is logged,
    // never fatal.
    on_sidebar_refresh: Option<RefreshHook>,
    on_dashboard_refresh: Option<RefreshHook>,
}

impl<S: DocumentStore> ModuleRegistry<S> {
    pub fn new(queue: BatchQueue<S>, slots: SessionSlots) -> Self {
        Self {
            modules: Vec::new(),
            queue,
            slots,
            on_sidebar_refresh: None,
            on_dashboard_refresh: None,
        }
    }

    pub fn on_sidebar_refresh(&mut self, hook: RefreshHook) {
        self.on_sidebar_refresh = Some(hook);
    }

    pub fn on_dashboard_refresh(&mut self, hook: RefreshHook) {
        self.on_dashboard_refresh = Some(hook);
    }

    /// Load the tree: remote store, then session backup, then the hardcoded
    /// defaults. Always resolves with a usable tree. If the defaults were
    /// the source, they are persisted back to the store best-effort.
    pub fn load(&mut self) -> Vec<ModuleDef> {
        let (list, from_defaults) = match self.fetch_from_store() {
            Some(list) => (list, false),
            None => match self.slots.load_module_backup() {
                Some(list) => {
                    log::info!("module tree loaded from session backup");
                    (list, false)
                }
                None => {
                    log::info!("module tree loaded from defaults");
                    (defaults::seed(), true)
                }
            },
        };
        self.modules = list;
        self.normalize();
        if from_defaults {
            self.persist();
        }
        self.modules.clone()
    }

    fn fetch_from_store(&self) -> Option<Vec<ModuleDef>> {
        match self
            .queue
            .store()
            .get_document(SETTINGS_COLLECTION, MODULES_DOC_ID)
        {
            Ok(Some(doc)) => match serde_json::from_value::<ModulesDoc>(doc) {
                Ok(parsed) if !parsed.modules.is_empty() => Some(parsed.modules),
                Ok(_) => None,
                Err(e) => {
                    log::warn!("settings/modules document unreadable: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("module store unreachable, falling back: {}", e);
                None
            }
        }
    }

    /// Defensive copy of the current tree.
    pub fn get(&self) -> Vec<ModuleDef> {
        self.modules.clone()
    }

    pub fn module(&self, id: &str) -> Option<ModuleDef> {
        self.modules.iter().find(|m| m.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Create a module. Fails closed on an empty name, an empty derived id,
    /// or a duplicate id; the tree is untouched on any error.
    pub fn add(&mut self, info: NewModule) -> Result<ModuleDef> {
        let name = info.name.trim().to_string();
        if name.is_empty() {
            return Err(CostwiseError::Validation(
                "Module name cannot be empty".into(),
            ));
        }
        let id = slugify(&name);
        if id.is_empty() {
            return Err(CostwiseError::Validation(format!(
                "Name '{}' does not produce a usable id",
                name
            )));
        }
        if self.modules.iter().any(|m| m.id == id) {
            return Err(CostwiseError::Validation(format!(
                "A module with id '{}' already exists",
                id
            )));
        }

        // Headers are pure grouping nodes and always live at the top level.
        let parent_id = if info.kind == ModuleKind::Header {
            None
        } else {
            normalize_parent(info.parent_id)
        };
        let order = self
            .modules
            .iter()
            .filter(|m| m.parent_id == parent_id)
            .map(|m| m.order)
            .max()
            .map_or(0, |max| max + 1);

        self.modules.push(ModuleDef {
            id: id.clone(),
            name,
            kind: info.kind,
            parent_id,
            requires_client: info.requires_client,
            order,
        });
        self.after_mutation();
        Ok(self
            .modules
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .expect("freshly added module present"))
    }

    /// Rename a module. Only the name is editable; structural changes go
    /// through [`move_module`](Self::move_module).
    pub fn edit(&mut self, id: &str, new_name: &str) -> Result<()> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(CostwiseError::Validation(
                "Module name cannot be empty".into(),
            ));
        }
        let module = self
            .modules
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| CostwiseError::NotFound(format!("module '{}'", id)))?;
        module.name = name.to_string();
        self.after_mutation();
        Ok(())
    }

    /// Delete a module and its whole descendant closure. Returns the number
    /// of removed nodes.
    pub fn delete(&mut self, id: &str) -> Result<usize> {
        if id == NOTES_ID {
            return Err(CostwiseError::Protected(
                "The Notes module cannot be deleted".into(),
            ));
        }
        if !self.modules.iter().any(|m| m.id == id) {
            return Err(CostwiseError::NotFound(format!("module '{}'", id)));
        }
        let doomed = self.descendant_closure(id);
        let before = self.modules.len();
        self.modules.retain(|m| !doomed.contains(&m.id));
        let removed = before - self.modules.len();
        self.after_mutation();
        Ok(removed)
    }

    /// Target plus everything transitively below it, breadth-first over the
    /// `parent_id` edges.
    fn descendant_closure(&self, id: &str) -> HashSet<String> {
        let mut closure: HashSet<String> = HashSet::new();
        closure.insert(id.to_string());
        let mut frontier = vec![id.to_string()];
        while let Some(parent) = frontier.pop() {
            for m in &self.modules {
                if m.parent_id.as_deref() == Some(parent.as_str()) && closure.insert(m.id.clone()) {
                    frontier.push(m.id.clone());
                }
            }
        }
        closure
    }

    /// Re-parent and/or reorder a module relative to a drop target.
    ///
    /// A `Middle` drop on a non-header target is downgraded to `Top` here
    /// rather than trusted to the view layer; the registry re-validates so
    /// an illegal request fails safe instead of nesting under a leaf.
    pub fn move_module(
        &mut self,
        dragged_id: &str,
        target_id: &str,
        position: DropPosition,
    ) -> Result<()> {
        if dragged_id == target_id {
            return Ok(());
        }
        let dragged_idx = self
            .index_of(dragged_id)
            .ok_or_else(|| CostwiseError::NotFound(format!("module '{}'", dragged_id)))?;
        let target_idx = self
            .index_of(target_id)
            .ok_or_else(|| CostwiseError::NotFound(format!("module '{}'", target_id)))?;

        let target_is_header = self.modules[target_idx].is_header();
        let position = if position == DropPosition::Middle && !target_is_header {
            log::debug!(
                "middle drop on non-header '{}' downgraded to top",
                target_id
            );
            DropPosition::Top
        } else {
            position
        };

        let (mut new_parent, mut insert_at) = match position {
            DropPosition::Middle => {
                // Append into the header's child group: right after its last
                // child, or right after the header itself when childless.
                let last_child = self
                    .modules
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.parent_id.as_deref() == Some(target_id))
                    .map(|(i, _)| i)
                    .max();
                (
                    Some(target_id.to_string()),
                    last_child.map_or(target_idx + 1, |i| i + 1),
                )
            }
            DropPosition::Top => (self.modules[target_idx].parent_id.clone(), target_idx),
            DropPosition::Bottom => (self.modules[target_idx].parent_id.clone(), target_idx + 1),
        };

        // Headers never nest; and nothing may end up below the dragged node
        // itself, which would cut a cycle into the parent chain.
        if self.modules[dragged_idx].is_header() {
            new_parent = None;
        } else if let Some(parent) = &new_parent {
            if self.descendant_closure(dragged_id).contains(parent) {
                log::warn!(
                    "move of '{}' under its own descendant '{}' forced to top level",
                    dragged_id,
                    parent
                );
                new_parent = None;
            }
        }

        let mut moved = self.modules.remove(dragged_idx);
        if dragged_idx < insert_at {
            insert_at -= 1;
        }
        moved.parent_id = new_parent;
        self.modules.insert(insert_at, moved);
        self.after_mutation();
        Ok(())
    }

    /// Fold flat-list position back into dense per-parent `order` ranks.
    /// Idempotent; runs after every structural mutation, before persisting.
    pub fn recalc_order(&mut self) {
        let mut counters: HashMap<Option<String>, i64> = HashMap::new();
        for m in &mut self.modules {
            let counter = counters.entry(m.parent_id.clone()).or_insert(0);
            m.order = *counter;
            *counter += 1;
        }
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.id == id)
    }

    fn after_mutation(&mut self) {
        self.recalc_order();
        self.sort_canonical();
        self.persist();
        self.notify();
    }

    fn sort_canonical(&mut self) {
        self.modules.sort_by(|a, b| {
            (a.id != NOTES_ID)
                .cmp(&(b.id != NOTES_ID))
                .then(a.order.cmp(&b.order))
                .then_with(|| a.name.cmp(&b.name))
        });
    }

    /// Bring a freshly loaded list up to the tree invariants: a single
    /// reserved notes node up front, string-"null" parents coerced, parents
    /// that no longer exist detached, missing orders defaulted to list
    /// position, dense ranks, canonical sort.
    fn normalize(&mut self) {
        let stored_notes = self.modules.iter().find(|m| m.is_notes()).cloned();
        self.modules.retain(|m| !m.is_notes());

        let mut notes = defaults::reserved_notes();
        if let Some(stored) = stored_notes {
            notes.name = stored.name;
            notes.requires_client = stored.requires_client;
        }
        self.modules.insert(0, notes);

        let ids: HashSet<String> = self.modules.iter().map(|m| m.id.clone()).collect();
        for (idx, m) in self.modules.iter_mut().enumerate() {
            m.parent_id = normalize_parent(m.parent_id.take());
            if m.is_header() {
                m.parent_id = None;
            } else if let Some(parent) = &m.parent_id {
                // Parent deleted in another session: reattach at top level
                // rather than dropping the subtree.
                if !ids.contains(parent) {
                    log::warn!("module '{}' had dangling parent '{}'", m.id, parent);
                    m.parent_id = None;
                }
            }
            if m.order < 0 {
                m.order = idx as i64;
            }
        }

        self.sort_canonical();
        self.recalc_order();
        self.sort_canonical();
    }

    /// Mirror to the session backup and enqueue the remote write. Both are
    /// best-effort; in-memory state stays authoritative either way.
    fn persist(&mut self) {
        if let Err(e) = self.slots.save_module_backup(&self.modules) {
            log::warn!("module backup write failed: {}", e);
        }
        let now = Utc::now();
        let doc = ModulesDoc {
            modules: self.modules.clone(),
            last_modified: now,
            version: now.timestamp_millis(),
        };
        match serde_json::to_value(&doc) {
            Ok(value) => {
                if let Err(e) =
                    self.queue
                        .enqueue_set(SETTINGS_COLLECTION, MODULES_DOC_ID, value)
                {
                    log::warn!("module save not committed: {}", e);
                }
            }
            Err(e) => log::warn!("module document serialization failed: {}", e),
        }
    }

    fn notify(&mut self) {
        let modules = &self.modules;
        match self.on_sidebar_refresh.as_mut() {
            Some(hook) => hook(modules),
            None => log::debug!("sidebar refresh hook not registered"),
        }
        match self.on_dashboard_refresh.as_mut() {
            Some(hook) => hook(modules),
            None => log::debug!("dashboard refresh hook not registered"),
        }
    }

    /// Drive the write batch's idle timer.
    pub fn tick(&mut self, now: Instant) {
        if let Err(e) = self.queue.tick(now) {
            log::warn!("batched module save failed: {}", e);
        }
    }

    /// Commit everything pending (flush-on-unload).
    pub fn flush(&mut self) -> Result<()> {
        self.queue.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::batch::BatchQueue;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn registry(store: InMemoryStore) -> ModuleRegistry<InMemoryStore> {
        ModuleRegistry::new(BatchQueue::new(store), SessionSlots::in_memory())
    }

    fn loaded_default_registry() -> ModuleRegistry<InMemoryStore> {
        let mut reg = registry(InMemoryStore::new());
        reg.load();
        reg
    }

    fn assert_dense_orders(modules: &[ModuleDef]) {
        let mut groups: HashMap<Option<String>, Vec<i64>> = HashMap::new();
        for m in modules {
            groups.entry(m.parent_id.clone()).or_default().push(m.order);
        }
        for (parent, mut orders) in groups {
            orders.sort_unstable();
            let expected: Vec<i64> = (0..orders.len() as i64).collect();
            assert_eq!(orders, expected, "orders not dense under {:?}", parent);
        }
    }

    #[test]
    fn empty_store_and_backup_load_the_default_tree() {
        let mut reg = registry(InMemoryStore::new());
        let tree = reg.load();

        assert_eq!(tree.len(), 11);
        assert_eq!(tree[0].id, NOTES_ID);
        assert!(reg.module("foundations").unwrap().is_header());
        assert!(reg.module("structure").unwrap().is_header());
        for (id, order) in [("earthworks", 0), ("concrete", 1), ("steel", 2)] {
            let m = reg.module(id).unwrap();
            assert_eq!(m.parent_id.as_deref(), Some("foundations"));
            assert_eq!(m.order, order);
        }
        assert_dense_orders(&tree);

        // Defaults were persisted back to the store.
        reg.flush().unwrap();
        let doc = reg
            .queue
            .store()
            .get_document(SETTINGS_COLLECTION, MODULES_DOC_ID)
            .unwrap();
        assert!(doc.is_some());
    }

    #[test]
    fn load_prefers_store_over_defaults() {
        let fixture = StoreFixture::new().with_module_tree();
        let mut reg = registry(fixture.store);
        let tree = reg.load();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree[0].id, NOTES_ID);
        assert!(reg.module("roofing").is_some());
        assert!(reg.module("foundations").is_none());
    }

    #[test]
    fn unreachable_store_falls_back_to_session_backup() {
        let mut slots = SessionSlots::in_memory();
        slots
            .save_module_backup(&[
                defaults::reserved_notes(),
                ModuleDef::regular("paving", "Paving", None),
            ])
            .unwrap();
        let mut store = InMemoryStore::new();
        store.fail_reads(true);

        let mut reg = ModuleRegistry::new(BatchQueue::new(store), slots);
        let tree = reg.load();
        assert_eq!(tree.len(), 2);
        assert!(reg.module("paving").is_some());
    }

    #[test]
    fn load_synthesizes_notes_and_forces_it_first() {
        let mut store = InMemoryStore::new();
        store
            .set_document(
                SETTINGS_COLLECTION,
                MODULES_DOC_ID,
                json!({
                    "modules": [
                        {"id": "paving", "name": "Paving", "type": "regular", "parentId": "null"}
                    ],
                    "lastModified": Utc::now(),
                    "version": 1,
                }),
            )
            .unwrap();
        let mut reg = registry(store);
        let tree = reg.load();
        assert_eq!(tree[0].id, NOTES_ID);
        assert_eq!(tree.len(), 2);
        assert_eq!(reg.module("paving").unwrap().parent_id, None);
    }

    #[test]
    fn load_merges_stored_notes_fields_over_reserved_defaults() {
        let mut store = InMemoryStore::new();
        store
            .set_document(
                SETTINGS_COLLECTION,
                MODULES_DOC_ID,
                json!({
                    "modules": [
                        {"id": "paving", "name": "Paving", "type": "regular"},
                        {"id": "notes", "name": "Site Notes", "type": "regular",
                         "requiresClient": true, "order": 7}
                    ],
                    "lastModified": Utc::now(),
                    "version": 1,
                }),
            )
            .unwrap();
        let mut reg = registry(store);
        let tree = reg.load();
        let notes = &tree[0];
        assert_eq!(notes.id, NOTES_ID);
        assert_eq!(notes.name, "Site Notes");
        assert!(notes.requires_client);
        assert_eq!(notes.order, 0);
    }

    #[test]
    fn load_detaches_dangling_parents() {
        let mut store = InMemoryStore::new();
        store
            .set_document(
                SETTINGS_COLLECTION,
                MODULES_DOC_ID,
                json!({
                    "modules": [
                        {"id": "tiles", "name": "Tiles", "type": "regular", "parentId": "gone"}
                    ],
                    "lastModified": Utc::now(),
                    "version": 1,
                }),
            )
            .unwrap();
        let mut reg = registry(store);
        reg.load();
        assert_eq!(reg.module("tiles").unwrap().parent_id, None);
    }

    #[test]
    fn add_appends_after_existing_siblings() {
        let mut reg = loaded_default_registry();
        let before = reg.len();
        let top_max = reg
            .get()
            .iter()
            .filter(|m| m.parent_id.is_none())
            .map(|m| m.order)
            .max()
            .unwrap();

        let created = reg
            .add(NewModule {
                name: "Paving".into(),
                kind: ModuleKind::Regular,
                parent_id: Some("null".into()),
                requires_client: true,
            })
            .unwrap();

        assert_eq!(created.id, "paving");
        assert_eq!(created.parent_id, None);
        assert_eq!(created.order, top_max + 1);
        assert_eq!(reg.len(), before + 1);
        assert_dense_orders(&reg.get());
    }

    #[test]
    fn add_under_header_orders_after_its_children() {
        let mut reg = loaded_default_registry();
        let created = reg
            .add(NewModule {
                name: "Piling".into(),
                kind: ModuleKind::Regular,
                parent_id: Some("foundations".into()),
                requires_client: true,
            })
            .unwrap();
        assert_eq!(created.parent_id.as_deref(), Some("foundations"));
        assert_eq!(created.order, 3);
    }

    #[test]
    fn duplicate_add_fails_closed() {
        let mut reg = loaded_default_registry();
        reg.add(NewModule {
            name: "Paving".into(),
            kind: ModuleKind::Regular,
            parent_id: None,
            requires_client: true,
        })
        .unwrap();
        let before = reg.get();
        let err = reg
            .add(NewModule {
                name: "Paving".into(),
                kind: ModuleKind::Regular,
                parent_id: None,
                requires_client: false,
            })
            .unwrap_err();
        assert!(matches!(err, CostwiseError::Validation(_)));
        assert_eq!(reg.get(), before);
    }

    #[test]
    fn add_rejects_empty_and_unslugable_names() {
        let mut reg = loaded_default_registry();
        let before = reg.get();
        assert!(matches!(
            reg.add(NewModule {
                name: "   ".into(),
                kind: ModuleKind::Regular,
                parent_id: None,
                requires_client: false,
            }),
            Err(CostwiseError::Validation(_))
        ));
        assert!(matches!(
            reg.add(NewModule {
                name: "!!!".into(),
                kind: ModuleKind::Regular,
                parent_id: None,
                requires_client: false,
            }),
            Err(CostwiseError::Validation(_))
        ));
        assert_eq!(reg.get(), before);
    }

    #[test]
    fn header_add_ignores_supplied_parent() {
        let mut reg = loaded_default_registry();
        let created = reg
            .add(NewModule {
                name: "Finishes".into(),
                kind: ModuleKind::Header,
                parent_id: Some("foundations".into()),
                requires_client: false,
            })
            .unwrap();
        assert_eq!(created.parent_id, None);
    }

    #[test]
    fn edit_renames_in_place() {
        let mut reg = loaded_default_registry();
        reg.edit("ceilings", "Ceilings & Bulkheads").unwrap();
        assert_eq!(reg.module("ceilings").unwrap().name, "Ceilings & Bulkheads");
        assert!(matches!(
            reg.edit("ceilings", "  "),
            Err(CostwiseError::Validation(_))
        ));
        assert!(matches!(
            reg.edit("nope", "X"),
            Err(CostwiseError::NotFound(_))
        ));
    }

    #[test]
    fn delete_removes_descendant_closure() {
        let mut reg = loaded_default_registry();
        let before = reg.len();
        let removed = reg.delete("foundations").unwrap();
        assert_eq!(removed, 4);
        assert_eq!(reg.len(), before - 4);
        for id in ["foundations", "earthworks", "concrete", "steel"] {
            assert!(reg.module(id).is_none(), "{} should be gone", id);
        }
        assert_dense_orders(&reg.get());
    }

    #[test]
    fn delete_notes_is_refused() {
        let mut reg = loaded_default_registry();
        let before = reg.get();
        assert!(matches!(
            reg.delete(NOTES_ID),
            Err(CostwiseError::Protected(_))
        ));
        assert_eq!(reg.get(), before);
    }

    #[test]
    fn delete_unknown_id_is_not_found() {
        let mut reg = loaded_default_registry();
        assert!(matches!(
            reg.delete("nope"),
            Err(CostwiseError::NotFound(_))
        ));
    }

    #[test]
    fn move_middle_appends_into_header_group() {
        let mut reg = loaded_default_registry();
        let before = reg.len();
        reg.move_module("earthworks", "structure", DropPosition::Middle)
            .unwrap();

        let earthworks = reg.module("earthworks").unwrap();
        assert_eq!(earthworks.parent_id.as_deref(), Some("structure"));
        // Appended after brickwork (order 0).
        assert_eq!(earthworks.order, 1);
        // The old group compacts.
        assert_eq!(reg.module("concrete").unwrap().order, 0);
        assert_eq!(reg.module("steel").unwrap().order, 1);
        assert_eq!(reg.len(), before);
        assert_dense_orders(&reg.get());
    }

    #[test]
    fn move_middle_into_empty_header() {
        let mut reg = loaded_default_registry();
        reg.add(NewModule {
            name: "Finishes".into(),
            kind: ModuleKind::Header,
            parent_id: None,
            requires_client: false,
        })
        .unwrap();
        reg.move_module("ceilings", "finishes", DropPosition::Middle)
            .unwrap();
        let ceilings = reg.module("ceilings").unwrap();
        assert_eq!(ceilings.parent_id.as_deref(), Some("finishes"));
        assert_eq!(ceilings.order, 0);
    }

    #[test]
    fn move_top_lands_before_target_as_sibling() {
        let mut reg = loaded_default_registry();
        reg.move_module("steel", "earthworks", DropPosition::Top)
            .unwrap();
        assert_eq!(reg.module("steel").unwrap().order, 0);
        assert_eq!(reg.module("earthworks").unwrap().order, 1);
        assert_eq!(reg.module("concrete").unwrap().order, 2);
        assert_dense_orders(&reg.get());
    }

    #[test]
    fn move_bottom_lands_after_target_as_sibling() {
        let mut reg = loaded_default_registry();
        reg.move_module("earthworks", "concrete", DropPosition::Bottom)
            .unwrap();
        assert_eq!(reg.module("concrete").unwrap().order, 0);
        assert_eq!(reg.module("earthworks").unwrap().order, 1);
        assert_eq!(reg.module("steel").unwrap().order, 2);
    }

    #[test]
    fn move_top_can_reparent_between_groups() {
        let mut reg = loaded_default_registry();
        reg.move_module("brickwork", "concrete", DropPosition::Top)
            .unwrap();
        let brickwork = reg.module("brickwork").unwrap();
        assert_eq!(brickwork.parent_id.as_deref(), Some("foundations"));
        assert_eq!(brickwork.order, 1);
        assert_eq!(reg.module("concrete").unwrap().order, 2);
        // Structure lost its only child.
        assert!(!reg.get().iter().any(|m| m.parent_id.as_deref() == Some("structure")));
    }

    #[test]
    fn move_middle_on_non_header_downgrades_to_top() {
        let mut reg = loaded_default_registry();
        reg.move_module("ceilings", "demolish", DropPosition::Middle)
            .unwrap();
        let ceilings = reg.module("ceilings").unwrap();
        // Sibling of the target, not its child.
        assert_eq!(ceilings.parent_id, None);
        assert!(ceilings.order < reg.module("demolish").unwrap().order);
    }

    #[test]
    fn move_of_header_keeps_it_top_level_and_acyclic() {
        let mut reg = loaded_default_registry();
        let before = reg.len();
        // Dropping a header onto its own child must not nest it.
        reg.move_module("foundations", "concrete", DropPosition::Top)
            .unwrap();
        let foundations = reg.module("foundations").unwrap();
        assert_eq!(foundations.parent_id, None);
        assert_eq!(reg.len(), before);

        // Every parent chain still terminates at the top level.
        let tree = reg.get();
        for m in &tree {
            let mut hops = 0;
            let mut cursor = m.parent_id.clone();
            while let Some(parent) = cursor {
                hops += 1;
                assert!(hops <= tree.len(), "cycle through '{}'", m.id);
                cursor = tree
                    .iter()
                    .find(|p| p.id == parent)
                    .and_then(|p| p.parent_id.clone());
            }
        }
    }

    #[test]
    fn move_with_unknown_ids_is_not_found() {
        let mut reg = loaded_default_registry();
        assert!(matches!(
            reg.move_module("nope", "steel", DropPosition::Top),
            Err(CostwiseError::NotFound(_))
        ));
        assert!(matches!(
            reg.move_module("steel", "nope", DropPosition::Top),
            Err(CostwiseError::NotFound(_))
        ));
    }

    #[test]
    fn recalc_order_is_idempotent() {
        let mut reg = loaded_default_registry();
        reg.recalc_order();
        let once = reg.get();
        reg.recalc_order();
        assert_eq!(reg.get(), once);
    }

    #[test]
    fn persistence_failure_does_not_roll_back_a_mutation() {
        let fixture = StoreFixture::new().with_module_tree();
        let mut store = fixture.store;
        store.fail_writes(true);
        // Capacity 1 so every persist tries to commit immediately.
        let queue = BatchQueue::with_limits(store, 1, std::time::Duration::ZERO);
        let mut reg = ModuleRegistry::new(queue, SessionSlots::in_memory());
        reg.load();

        let created = reg.add(NewModule {
            name: "Paving".into(),
            kind: ModuleKind::Regular,
            parent_id: None,
            requires_client: true,
        });
        assert!(created.is_ok());
        assert!(reg.module("paving").is_some());
    }

    #[test]
    fn refresh_hooks_fire_after_mutations() {
        let count = Rc::new(RefCell::new(0));
        let mut reg = loaded_default_registry();
        let sidebar_count = Rc::clone(&count);
        reg.on_sidebar_refresh(Box::new(move |_| {
            *sidebar_count.borrow_mut() += 1;
        }));
        reg.add(NewModule {
            name: "Paving".into(),
            kind: ModuleKind::Regular,
            parent_id: None,
            requires_client: false,
        })
        .unwrap();
        reg.delete("paving").unwrap();
        assert_eq!(*count.borrow(), 2);
    }
}
