use super::DocumentStore;
use crate::error::{CostwiseError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Auto-commit when this many ops are pending. The provider's hard limit is
/// 500 per batch; stay safely under it.
pub const DEFAULT_CAPACITY: usize = 400;

/// Idle delay before a pending batch commits on its own.
pub const DEFAULT_IDLE: Duration = Duration::from_secs(5);

/// One buffered mutation against the remote store.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Set {
        collection: String,
        id: String,
        doc: Value,
    },
    Update {
        collection: String,
        id: String,
        fields: BTreeMap<String, Value>,
    },
}

/// Write-batching wrapper around a [`DocumentStore`].
///
/// Each logical save enqueues one op. The batch commits when it reaches
/// capacity, when [`tick`](Self::tick) observes that the idle deadline has
/// passed, or on an explicit [`flush`](Self::flush) (flush-on-unload). The
/// deadline resets on every enqueue, so a burst of edits commits once.
///
/// The deadline is per-instance state advanced by an explicit `tick(now)`;
/// there is no shared ambient timer, so registries under test each get
/// their own.
///
/// Commit failures propagate to the caller but never un-enqueue anything:
/// the in-memory state the ops mirrored stays authoritative, and the local
/// backup layer is expected to reconcile eventually.
pub struct BatchQueue<S: DocumentStore> {
    store: S,
    pending: Vec<BatchOp>,
    capacity: usize,
    idle: Duration,
    deadline: Option<Instant>,
}

impl<S: DocumentStore> BatchQueue<S> {
    pub fn new(store: S) -> Self {
        Self::with_limits(store, DEFAULT_CAPACITY, DEFAULT_IDLE)
    }

    pub fn with_limits(store: S, capacity: usize, idle: Duration) -> Self {
        Self {
            store,
            pending: Vec::new(),
            capacity: capacity.max(1),
            idle,
            deadline: None,
        }
    }

    /// Read-through access to the wrapped store. Reads are never batched.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn enqueue_set(&mut self, collection: &str, id: &str, doc: Value) -> Result<()> {
        self.enqueue(BatchOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            doc,
        })
    }

    pub fn enqueue_update(
        &mut self,
        collection: &str,
        id: &str,
        fields: BTreeMap<String, Value>,
    ) -> Result<()> {
        self.enqueue(BatchOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        })
    }

    fn enqueue(&mut self, op: BatchOp) -> Result<()> {
        self.pending.push(op);
        if self.pending.len() >= self.capacity {
            return self.commit();
        }
        self.deadline = Some(Instant::now() + self.idle);
        Ok(())
    }

    /// True when the idle deadline has passed with ops still pending.
    pub fn due(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(d) if now >= d) && !self.pending.is_empty()
    }

    /// Commit if the idle deadline has passed. Returns whether a commit ran.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        if !self.due(now) {
            return Ok(false);
        }
        self.commit()?;
        Ok(true)
    }

    /// Commit everything pending right now.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.commit()
    }

    fn commit(&mut self) -> Result<()> {
        let ops = std::mem::take(&mut self.pending);
        self.deadline = None;
        let mut first_err: Option<CostwiseError> = None;
        for op in ops {
            let outcome = match op {
                BatchOp::Set { collection, id, doc } => {
                    self.store.set_document(&collection, &id, doc)
                }
                BatchOp::Update {
                    collection,
                    id,
                    fields,
                } => self.store.update_document(&collection, &id, fields),
            };
            if let Err(e) = outcome {
                log::warn!("batched write failed: {}", e);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
