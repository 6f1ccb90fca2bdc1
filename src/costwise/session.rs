//! Session-scoped backup slots.
//!
//! Small key-value slots that survive page-to-page navigation within one
//! session: the current client mirror, the simplified module-tree backup,
//! and the one-shot navigation marker. They are the middle tier of the
//! load fallback chain (store, then backup, then defaults) and the reason
//! a dead remote store never blanks the UI.

use crate::error::{CostwiseError, Result};
use crate::model::{Client, ModuleDef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const CURRENT_CLIENT_KEY: &str = "currentClient";
const MODULE_ORDER_KEY: &str = "moduleOrder";
const NAVIGATION_STATE_KEY: &str = "navigationState";

/// One-shot navigation markers: written by one page, consumed exactly once
/// by the next page's access guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavState {
    FromDashboard,
    ManualLogout,
    InvalidAccess,
    ReturningToDashboard,
    RedirectedToDashboard,
}

enum SlotBackend {
    Memory(HashMap<String, String>),
    Dir(PathBuf),
}

/// Session-scoped key-value slots.
///
/// Production sessions are directory-backed (one file per slot under the
/// store root); tests use the in-memory backend. A corrupt slot is treated
/// as absent and cleared on read.
pub struct SessionSlots {
    backend: SlotBackend,
}

impl SessionSlots {
    pub fn in_memory() -> Self {
        Self {
            backend: SlotBackend::Memory(HashMap::new()),
        }
    }

    pub fn in_dir(dir: PathBuf) -> Self {
        Self {
            backend: SlotBackend::Dir(dir),
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match &self.backend {
            SlotBackend::Memory(map) => map.get(key).cloned(),
            SlotBackend::Dir(dir) => fs::read_to_string(dir.join(format!("{}.json", key))).ok(),
        }
    }

    fn write(&mut self, key: &str, value: String) -> Result<()> {
        match &mut self.backend {
            SlotBackend::Memory(map) => {
                map.insert(key.to_string(), value);
                Ok(())
            }
            SlotBackend::Dir(dir) => {
                if !dir.exists() {
                    fs::create_dir_all(&*dir).map_err(CostwiseError::Io)?;
                }
                fs::write(dir.join(format!("{}.json", key)), value).map_err(CostwiseError::Io)?;
                Ok(())
            }
        }
    }

    fn clear(&mut self, key: &str) {
        match &mut self.backend {
            SlotBackend::Memory(map) => {
                map.remove(key);
            }
            SlotBackend::Dir(dir) => {
                let _ = fs::remove_file(dir.join(format!("{}.json", key)));
            }
        }
    }

    // --- currentClient ---

    pub fn save_current_client(&mut self, client: &Client) -> Result<()> {
        let json = serde_json::to_string(client).map_err(CostwiseError::Serialization)?;
        self.write(CURRENT_CLIENT_KEY, json)
    }

    /// Rehydrate the current client. A slot that fails to parse is cleared
    /// and treated as absent.
    pub fn load_current_client(&mut self) -> Option<Client> {
        let raw = self.read(CURRENT_CLIENT_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(client) => Some(client),
            Err(e) => {
                log::warn!("corrupt currentClient slot, clearing: {}", e);
                self.clear(CURRENT_CLIENT_KEY);
                None
            }
        }
    }

    pub fn clear_current_client(&mut self) {
        self.clear(CURRENT_CLIENT_KEY);
    }

    // --- moduleOrder ---

    /// Mirror the module tree as the last-resort load source. The stored
    /// shape is the plain definition tuple (id, name, type, parentId,
    /// order, requiresClient) and nothing else.
    pub fn save_module_backup(&mut self, modules: &[ModuleDef]) -> Result<()> {
        let json = serde_json::to_string(modules).map_err(CostwiseError::Serialization)?;
        self.write(MODULE_ORDER_KEY, json)
    }

    pub fn load_module_backup(&mut self) -> Option<Vec<ModuleDef>> {
        let raw = self.read(MODULE_ORDER_KEY)?;
        match serde_json::from_str::<Vec<ModuleDef>>(&raw) {
            Ok(modules) if !modules.is_empty() => Some(modules),
            Ok(_) => None,
            Err(e) => {
                log::warn!("corrupt moduleOrder slot, clearing: {}", e);
                self.clear(MODULE_ORDER_KEY);
                None
            }
        }
    }

    // --- navigationState ---

    pub fn set_navigation_state(&mut self, state: NavState) -> Result<()> {
        let json = serde_json::to_string(&state).map_err(CostwiseError::Serialization)?;
        self.write(NAVIGATION_STATE_KEY, json)
    }

    /// Read and clear the marker in one step (consume-once semantics).
    pub fn take_navigation_state(&mut self) -> Option<NavState> {
        let raw = self.read(NAVIGATION_STATE_KEY)?;
        self.clear(NAVIGATION_STATE_KEY);
        serde_json::from_str(&raw).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModuleKind;

    #[test]
    fn current_client_survives_a_new_slots_instance_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let client = Client::new("Acme".into(), "1 Main Rd".into());
        {
            let mut slots = SessionSlots::in_dir(dir.path().to_path_buf());
            slots.save_current_client(&client).unwrap();
        }
        // Fresh instance over the same dir, as after a page navigation.
        let mut slots = SessionSlots::in_dir(dir.path().to_path_buf());
        let loaded = slots.load_current_client().unwrap();
        assert_eq!(loaded.id, client.id);
        assert_eq!(loaded.name, "Acme");
    }

    #[test]
    fn corrupt_client_slot_is_cleared() {
        let mut slots = SessionSlots::in_memory();
        slots
            .write(CURRENT_CLIENT_KEY, "{not json".to_string())
            .unwrap();
        assert!(slots.load_current_client().is_none());
        // Slot was cleared, not left corrupt.
        assert!(slots.read(CURRENT_CLIENT_KEY).is_none());
    }

    #[test]
    fn module_backup_round_trips_definition_tuples() {
        let mut slots = SessionSlots::in_memory();
        let modules = vec![
            ModuleDef {
                order: 0,
                requires_client: false,
                ..ModuleDef::regular("notes", "Notes", None)
            },
            ModuleDef {
                order: 1,
                ..ModuleDef::header("roofing", "Roofing")
            },
            ModuleDef {
                order: 0,
                ..ModuleDef::regular("tiles", "Tiles", Some("roofing"))
            },
        ];
        slots.save_module_backup(&modules).unwrap();
        let restored = slots.load_module_backup().unwrap();
        assert_eq!(restored, modules);
        assert_eq!(restored[1].kind, ModuleKind::Header);
    }

    #[test]
    fn empty_module_backup_counts_as_absent() {
        let mut slots = SessionSlots::in_memory();
        slots.save_module_backup(&[]).unwrap();
        assert!(slots.load_module_backup().is_none());
    }

    #[test]
    fn navigation_state_is_consumed_once() {
        let mut slots = SessionSlots::in_memory();
        slots.set_navigation_state(NavState::ManualLogout).unwrap();
        assert_eq!(slots.take_navigation_state(), Some(NavState::ManualLogout));
        assert_eq!(slots.take_navigation_state(), None);
    }
}
