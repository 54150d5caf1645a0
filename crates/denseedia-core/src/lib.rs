//! # denseedia-core
//!
//! The versioned attribute store behind DenseEdia - THE STORE.
//!
//! A personal knowledge base of **nodes**, each holding named, typed,
//! history-tracked **elements**, connected by labeled **links**.
//!
//! ## Layers (leaves first)
//!
//! - `value`: value kinds, classification, payload encoding
//! - `ledger`: per-element version history with one current version
//! - `element`: named attributes of a node
//! - `node`: nodes and their cascading delete
//! - `link`: the link graph
//! - `query`: aggregations, stats and snapshots
//! - `store`: the operation façade over a storage backend
//!
//! ## Architectural Constraints
//!
//! - All value-level validation happens before the first write
//! - Every operation is one backend transaction (all-or-nothing)
//! - Has NO async, NO network dependencies

// =============================================================================
// MODULES
// =============================================================================

pub mod element;
pub mod ledger;
pub mod link;
pub mod node;
pub mod primitives;
pub mod query;
pub mod storage;
pub mod store;
pub mod types;
pub mod value;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use element::{ElementSummary, ElementView, HistoryMode};
pub use node::{DeletedNode, NodeDetails};
pub use query::Snapshot;
pub use storage::{MemoryTables, RedbStore, StoreStats, TableRead, TableWrite};
pub use store::{StorageBackend, Store};
pub use types::{
    DenseError, Element, ElementId, ElementPatch, Link, LinkId, LinkPatch, NewLink, NewNode, Node,
    NodeId, NodePatch, ObjectKind, Timestamp, Version, VersionId,
};
pub use value::{Value, ValueKind, classify};
