//! # Costwise Architecture
//!
//! Costwise is a **UI-agnostic cost-estimation library**: a hierarchical
//! tree of cost-category "modules", per-client cost data, and a document
//! store behind it all. The CLI is just one client of the library.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Registries (registry.rs, clients.rs)                       │
//! │  - Sole owners of canonical state: the module tree and the  │
//! │    current client                                           │
//! │  - Every mutation: in-memory first, then best-effort        │
//! │    session backup + batched remote write, then refresh      │
//! │    hooks back out to the views                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  View models (sidebar.rs, dashboard.rs)                     │
//! │  - Pure consumers: rows/tiles computed from registry        │
//! │    snapshots, never mutate canonical state                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (store/, session.rs)                               │
//! │  - DocumentStore trait: FileStore (production),             │
//! │    InMemoryStore (testing), NullStore (degraded mode)       │
//! │  - BatchQueue: debounced, capacity-bounded write batching   │
//! │  - SessionSlots: the backup tier of the load fallback chain │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: Optimistic Local, Best-Effort Remote
//!
//! In-memory registry state is authoritative for rendering. Remote writes
//! are batched mirrors that may fail without rolling anything back; the
//! session backup covers the gap, and `load()` falls back through
//! store → backup → defaults so the tree is always usable.
//!
//! ## Module Overview
//!
//! - [`registry`]: the module-definition tree and its operations
//! - [`clients`]: client list, current-client session, module-data saves
//! - [`sidebar`]: collapsible/searchable/drag-aware tree view-model
//! - [`dashboard`]: cost tiles and totals
//! - [`store`]: document-store abstraction, batching, backends
//! - [`session`]: session-scoped backup slots
//! - [`model`]: core data types (`ModuleDef`, `Client`)
//! - [`defaults`]: the seed tree
//! - [`config`]: tunables stored next to the data
//! - [`error`]: error types
//! - `cli`: argument parsing and printing for the binary (not part of the
//!   lib API)

pub mod clients;
pub mod config;
pub mod dashboard;
pub mod defaults;
pub mod error;
pub mod model;
pub mod registry;
pub mod session;
pub mod sidebar;
pub mod store;
