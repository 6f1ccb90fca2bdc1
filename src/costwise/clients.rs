//! The client registry: the list of known clients and the single "current
//! client" session object.
//!
//! The current client is mirrored into a session slot so it survives a full
//! page navigation. Per-module saves go out as dotted-path partial updates
//! (`moduleData.<id>`) so one module's save never clobbers a sibling's data
//! in the remote document; a periodic auto-save re-persists the whole
//! client as a durability backstop.

use crate::error::{CostwiseError, Result};
use crate::model::{Client, ModuleData};
use crate::session::SessionSlots;
use crate::store::batch::BatchQueue;
use crate::store::DocumentStore;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub const CLIENTS_COLLECTION: &str = "clients";

/// Default interval for the full-client auto-save backstop.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Periodic auto-save state. Driven by an explicit `tick`, one instance per
/// registry; there is no ambient global timer.
struct AutosaveTimer {
    interval: Duration,
    last_run: Instant,
}

impl AutosaveTimer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: Instant::now(),
        }
    }

    fn due(&self, now: Instant) -> bool {
        now.duration_since(self.last_run) >= self.interval
    }

    fn reset(&mut self, now: Instant) {
        self.last_run = now;
    }
}

pub type ClientChangeHook = Box<dyn FnMut(Option<&Client>)>;

pub struct ClientRegistry<S: DocumentStore> {
    queue: BatchQueue<S>,
    slots: SessionSlots,
    current: Option<Client>,
    autosave_interval: Duration,
    // Running only while a client is current.
    autosave: Option<AutosaveTimer>,
    on_change: Option<ClientChangeHook>,
}

impl<S: DocumentStore> ClientRegistry<S> {
    pub fn new(queue: BatchQueue<S>, slots: SessionSlots) -> Self {
        Self::with_autosave_interval(queue, slots, DEFAULT_AUTOSAVE_INTERVAL)
    }

    pub fn with_autosave_interval(
        queue: BatchQueue<S>,
        slots: SessionSlots,
        autosave_interval: Duration,
    ) -> Self {
        Self {
            queue,
            slots,
            current: None,
            autosave_interval,
            autosave: None,
            on_change: None,
        }
    }

    /// Register the single change-notification callback. This is the seam
    /// the dashboard uses to know "redraw now".
    pub fn on_change(&mut self, hook: ClientChangeHook) {
        self.on_change = Some(hook);
    }

    /// The current client, rehydrating from the session slot when the
    /// in-memory reference is gone (fresh page).
    pub fn current(&mut self) -> Option<Client> {
        if self.current.is_none() {
            if let Some(client) = self.slots.load_current_client() {
                self.autosave = Some(AutosaveTimer::new(self.autosave_interval));
                self.current = Some(client);
            }
        }
        self.current.clone()
    }

    /// Make a client current (or clear with `None`). The client is mirrored
    /// to the session slot; if that write fails the set is treated as
    /// failed and current becomes `None`. The change callback always fires
    /// with the resulting value.
    pub fn set_current(&mut self, client: Option<Client>) {
        match client {
            Some(client) => match self.slots.save_current_client(&client) {
                Ok(()) => {
                    self.autosave = Some(AutosaveTimer::new(self.autosave_interval));
                    self.current = Some(client);
                }
                Err(e) => {
                    log::warn!("current client could not be mirrored, clearing: {}", e);
                    self.slots.clear_current_client();
                    self.autosave = None;
                    self.current = None;
                }
            },
            None => {
                self.slots.clear_current_client();
                self.autosave = None;
                self.current = None;
            }
        }
        let current = self.current.clone();
        match self.on_change.as_mut() {
            Some(hook) => hook(current.as_ref()),
            None => log::debug!("client change hook not registered"),
        }
    }

    /// Merge a module's payload into the current client and save it. The
    /// remote write is scoped to `moduleData.<module_id>` so concurrent
    /// saves of sibling modules do not clobber each other.
    pub fn save_module_data(&mut self, module_id: &str, data: Value) -> Result<()> {
        let mut client = self
            .current
            .clone()
            .or_else(|| self.slots.load_current_client())
            .ok_or_else(|| CostwiseError::Validation("No client selected".into()))?;

        let entry = ModuleData::new(data);
        client.module_data.insert(module_id.to_string(), entry.clone());
        client.last_modified = Utc::now();
        let client_id = client.id.clone();

        // Re-mirror the whole client locally, then the scoped remote write.
        self.set_current(Some(client));

        let mut fields = BTreeMap::new();
        fields.insert(
            format!("moduleData.{}", module_id),
            serde_json::to_value(&entry).map_err(CostwiseError::Serialization)?,
        );
        fields.insert(
            "lastModified".to_string(),
            serde_json::to_value(Utc::now()).map_err(CostwiseError::Serialization)?,
        );
        if let Err(e) = self
            .queue
            .enqueue_update(CLIENTS_COLLECTION, &client_id, fields)
        {
            // Best-effort: the in-memory merge and session mirror stand.
            log::warn!("module data save not committed: {}", e);
        }
        Ok(())
    }

    /// Persist a whole client document (create or update).
    pub fn save_client(&mut self, client: &Client) -> Result<()> {
        let doc = serde_json::to_value(client).map_err(CostwiseError::Serialization)?;
        self.queue.enqueue_set(CLIENTS_COLLECTION, &client.id, doc)
    }

    /// Scan the clients collection. Unreadable documents are skipped.
    pub fn load_clients(&self) -> Result<Vec<Client>> {
        let docs = self.queue.store().list_documents(CLIENTS_COLLECTION)?;
        let mut clients = Vec::new();
        for doc in docs {
            match serde_json::from_value::<Client>(doc) {
                Ok(client) => clients.push(client),
                Err(e) => log::warn!("skipping unreadable client document: {}", e),
            }
        }
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    pub fn find_client(&self, id: &str) -> Result<Option<Client>> {
        match self.queue.store().get_document(CLIENTS_COLLECTION, id)? {
            Some(doc) => Ok(serde_json::from_value(doc).ok()),
            None => Ok(None),
        }
    }

    /// Drive the auto-save backstop and the write batch's idle timer.
    /// `form_focused` skips the full-client save mid-edit; purely a UX
    /// heuristic, not a correctness guarantee.
    pub fn tick(&mut self, now: Instant, form_focused: bool) {
        let save_due = matches!(&self.autosave, Some(t) if t.due(now));
        if save_due && !form_focused {
            if let Some(client) = self.current.clone() {
                log::info!("auto-saving client '{}'", client.id);
                if let Err(e) = self.save_client(&client) {
                    log::warn!("client auto-save failed: {}", e);
                }
            }
            if let Some(timer) = self.autosave.as_mut() {
                timer.reset(now);
            }
        }
        if let Err(e) = self.queue.tick(now) {
            log::warn!("batched client save failed: {}", e);
        }
    }

    /// Commit everything pending (flush-on-unload).
    pub fn flush(&mut self) -> Result<()> {
        self.queue.flush()
    }
}
