//! # Store Module
//!
//! The operation contract consumed by the front ends.
//!
//! ## Storage Backends
//!
//! A `Store` runs on one of two backends:
//! - `InMemory`: `MemoryTables` (fast, volatile)
//! - `Persistent`: `RedbStore` (disk-backed, ACID)
//!
//! Every mutating operation runs in a single backend write transaction
//! and every read in a single read snapshot, so callers never observe a
//! half-applied cascade or a ledger with two current versions.

use crate::element::{self, ElementSummary, ElementView, HistoryMode};
use crate::ledger;
use crate::link;
use crate::node::{self, DeletedNode, NodeDetails};
use crate::query::{self, Snapshot};
use crate::storage::{MemoryTables, RedbStore, StoreStats, TableRead, TableWrite};
use crate::types::{
    DenseError, Element, ElementId, ElementPatch, Link, LinkId, LinkPatch, NewLink, NewNode, Node,
    NodeId, NodePatch, ObjectKind, Version, VersionId,
};
use crate::value::Value;
use std::path::Path;

/// Storage backend for a Store.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory tables (fast, volatile).
    InMemory(MemoryTables),
    /// Disk-backed tables using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryTables::new())
    }
}

/// The DenseEdia store.
#[derive(Debug, Default)]
pub struct Store {
    backend: StorageBackend,
}

impl Store {
    /// Create an empty store with in-memory storage.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open or create a persistent store at `path`.
    pub fn open_redb(path: impl AsRef<Path>) -> Result<Self, DenseError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Database file of a persistent store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            StorageBackend::InMemory(_) => None,
            StorageBackend::Persistent(db) => Some(db.path()),
        }
    }

    /// Run `f` against a consistent view of the tables.
    pub fn read<R>(
        &self,
        f: impl FnOnce(&dyn TableRead) -> Result<R, DenseError>,
    ) -> Result<R, DenseError> {
        match &self.backend {
            StorageBackend::InMemory(tables) => f(tables),
            StorageBackend::Persistent(db) => db.read(f),
        }
    }

    /// Run `f` as one atomic write. On `Err` neither backend keeps any of
    /// the changes `f` made.
    pub fn write<R>(
        &mut self,
        f: impl FnOnce(&mut dyn TableWrite) -> Result<R, DenseError>,
    ) -> Result<R, DenseError> {
        match &mut self.backend {
            StorageBackend::InMemory(tables) => {
                let mut staged = tables.clone();
                let out = f(&mut staged)?;
                *tables = staged;
                Ok(out)
            }
            StorageBackend::Persistent(db) => db.write(f),
        }
    }

    // =========================================================================
    // NODES
    // =========================================================================

    pub fn create_node(&mut self, new: &NewNode) -> Result<Node, DenseError> {
        self.write(|tx| node::create(tx, new))
    }

    pub fn get_node(&self, id: NodeId) -> Result<Node, DenseError> {
        self.read(|tx| node::get(tx, id))
    }

    pub fn list_nodes(&self) -> Result<Vec<Node>, DenseError> {
        self.read(|tx| node::list(tx))
    }

    pub fn modify_node(&mut self, id: NodeId, patch: &NodePatch) -> Result<Node, DenseError> {
        self.write(|tx| node::modify(tx, id, patch))
    }

    /// Delete a node and everything it owns, atomically.
    pub fn delete_node(&mut self, id: NodeId) -> Result<DeletedNode, DenseError> {
        self.write(|tx| node::delete(tx, id))
    }

    pub fn elements_of(
        &self,
        node: NodeId,
        mode: HistoryMode,
    ) -> Result<Vec<ElementView>, DenseError> {
        self.read(|tx| node::elements_of(tx, node, mode))
    }

    pub fn summaries(&self, node: NodeId) -> Result<Vec<ElementSummary>, DenseError> {
        self.read(|tx| node::summaries(tx, node))
    }

    pub fn details(&self, node: NodeId) -> Result<NodeDetails, DenseError> {
        self.read(|tx| node::details(tx, node))
    }

    // =========================================================================
    // ELEMENTS
    // =========================================================================

    pub fn create_element(
        &mut self,
        node: NodeId,
        name: &str,
        value: &Value,
    ) -> Result<(Element, Version), DenseError> {
        self.write(|tx| element::create(tx, node, name, value))
    }

    pub fn element_by_name(
        &self,
        node: NodeId,
        name: &str,
    ) -> Result<Option<Element>, DenseError> {
        self.read(|tx| {
            node::get(tx, node)?;
            element::by_name(tx, node, name)
        })
    }

    pub fn get_element(&self, id: ElementId, mode: HistoryMode) -> Result<ElementView, DenseError> {
        self.read(|tx| {
            let e = element::get(tx, id)?;
            element::view(tx, e, mode)
        })
    }

    pub fn modify_element(
        &mut self,
        id: ElementId,
        patch: &ElementPatch,
    ) -> Result<Element, DenseError> {
        self.write(|tx| element::modify(tx, id, patch))
    }

    pub fn delete_element(&mut self, id: ElementId) -> Result<ElementView, DenseError> {
        self.write(|tx| element::delete(tx, id))
    }

    /// Find-or-create `name` on `node` and record `value` as its current version.
    pub fn set_value(
        &mut self,
        node: NodeId,
        name: &str,
        value: &Value,
        allow_type_change: bool,
    ) -> Result<Version, DenseError> {
        self.write(|tx| element::set_value(tx, node, name, value, allow_type_change))
    }

    pub fn append_version(
        &mut self,
        element: ElementId,
        value: &Value,
        allow_type_change: bool,
    ) -> Result<Version, DenseError> {
        self.write(|tx| element::append_version(tx, element, value, allow_type_change))
    }

    // =========================================================================
    // VERSIONS
    // =========================================================================

    pub fn history(&self, element: ElementId) -> Result<Vec<Version>, DenseError> {
        self.read(|tx| {
            element::get(tx, element)?;
            ledger::history(tx, element)
        })
    }

    pub fn current_version(&self, element: ElementId) -> Result<Option<Version>, DenseError> {
        self.read(|tx| {
            element::get(tx, element)?;
            ledger::current(tx, element)
        })
    }

    pub fn get_version(&self, id: VersionId) -> Result<Version, DenseError> {
        self.read(|tx| {
            tx.version(id)?
                .ok_or_else(|| DenseError::not_found(ObjectKind::Version, id.0))
        })
    }

    /// Delete one version, promoting the newest remaining one if needed.
    pub fn delete_version(&mut self, id: VersionId) -> Result<Version, DenseError> {
        self.write(|tx| {
            let version = tx
                .version(id)?
                .ok_or_else(|| DenseError::not_found(ObjectKind::Version, id.0))?;
            ledger::remove(tx, &version)?;
            Ok(version)
        })
    }

    // =========================================================================
    // LINKS
    // =========================================================================

    pub fn create_link(&mut self, new: &NewLink) -> Result<Link, DenseError> {
        self.write(|tx| link::create(tx, new))
    }

    pub fn get_link(&self, id: LinkId) -> Result<Link, DenseError> {
        self.read(|tx| link::get(tx, id))
    }

    pub fn list_links(&self) -> Result<Vec<Link>, DenseError> {
        self.read(|tx| link::list(tx))
    }

    pub fn links_of(&self, node: NodeId) -> Result<Vec<Link>, DenseError> {
        self.read(|tx| link::links_of(tx, node))
    }

    pub fn modify_link(&mut self, id: LinkId, patch: &LinkPatch) -> Result<Link, DenseError> {
        self.write(|tx| link::modify(tx, id, patch))
    }

    pub fn delete_link(&mut self, id: LinkId) -> Result<Link, DenseError> {
        self.write(|tx| link::delete(tx, id))
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn most_used_element_names(
        &self,
        kind: &str,
        limit: usize,
    ) -> Result<Vec<(String, usize)>, DenseError> {
        self.read(|tx| query::most_used_element_names(tx, kind, limit))
    }

    pub fn stats(&self) -> Result<StoreStats, DenseError> {
        self.read(|tx| query::stats(tx))
    }

    pub fn snapshot(&self) -> Result<Snapshot, DenseError> {
        self.read(|tx| query::snapshot(tx))
    }
}

// =============================================================================
// TESTS
// =============================================================================
