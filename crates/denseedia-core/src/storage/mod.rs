//! # Storage Backends
//!
//! The persistence primitives the store is built on, and their two
//! implementations:
//! - `MemoryTables`: BTreeMap tables, volatile
//! - `RedbStore`: redb-backed tables, ACID and persistent
//!
//! Operations never talk to a backend directly. They receive a
//! `&dyn TableRead` for reads or a `&mut dyn TableWrite` scoped to one
//! write transaction, and must perform all fallible validation before
//! their first mutation.

mod memory;
mod redb_store;

pub use memory::MemoryTables;
pub use redb_store::RedbStore;

use crate::types::{
    DenseError, Element, ElementId, Link, LinkId, Node, NodeId, ObjectKind, Version, VersionId,
};
use serde::{Deserialize, Serialize};

/// Row counts of every entity table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub nodes: usize,
    pub elements: usize,
    pub versions: usize,
    pub links: usize,
}

/// Read access to the entity tables.
///
/// Every `*_of` enumeration returns rows in ascending id order, which is
/// also creation order.
pub trait TableRead {
    /// Point lookup of a node.
    fn node(&self, id: NodeId) -> Result<Option<Node>, DenseError>;

    /// All nodes.
    fn nodes(&self) -> Result<Vec<Node>, DenseError>;

    /// Point lookup of an element.
    fn element(&self, id: ElementId) -> Result<Option<Element>, DenseError>;

    /// All elements.
    fn elements(&self) -> Result<Vec<Element>, DenseError>;

    /// Elements owned by `node`.
    fn elements_of(&self, node: NodeId) -> Result<Vec<Element>, DenseError>;

    /// Point lookup of a version.
    fn version(&self, id: VersionId) -> Result<Option<Version>, DenseError>;

    /// All versions.
    fn versions(&self) -> Result<Vec<Version>, DenseError>;

    /// The ledger of `element`.
    fn versions_of(&self, element: ElementId) -> Result<Vec<Version>, DenseError>;

    /// Point lookup of a link.
    fn link(&self, id: LinkId) -> Result<Option<Link>, DenseError>;

    /// All links.
    fn links(&self) -> Result<Vec<Link>, DenseError>;

    /// Links where `node` is either endpoint, each listed once.
    fn links_of(&self, node: NodeId) -> Result<Vec<Link>, DenseError>;

    /// Row counts.
    fn stats(&self) -> Result<StoreStats, DenseError>;
}

/// Write access within one transaction.
///
/// `put_*` inserts or overwrites a row and maintains the parent indexes;
/// `remove_*` deletes the row and its index entries but never cascades.
pub trait TableWrite: TableRead {
    /// Hand out the next id for `kind`. Ids are never reused.
    fn allocate_id(&mut self, kind: ObjectKind) -> Result<u64, DenseError>;

    fn put_node(&mut self, node: &Node) -> Result<(), DenseError>;
    fn remove_node(&mut self, id: NodeId) -> Result<(), DenseError>;

    fn put_element(&mut self, element: &Element) -> Result<(), DenseError>;
    fn remove_element(&mut self, element: &Element) -> Result<(), DenseError>;

    fn put_version(&mut self, version: &Version) -> Result<(), DenseError>;
    fn remove_version(&mut self, version: &Version) -> Result<(), DenseError>;

    fn put_link(&mut self, link: &Link) -> Result<(), DenseError>;
    fn remove_link(&mut self, link: &Link) -> Result<(), DenseError>;
}
