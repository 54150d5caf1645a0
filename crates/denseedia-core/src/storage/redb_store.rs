//! # redb-backed Storage
//!
//! A disk-backed store using the redb embedded database, providing:
//! - ACID transactions (one redb write transaction per store operation)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Entities are stored as postcard bytes keyed by id. Parent/child
//! relations live in `(parent, child) -> ()` index tables so that
//! per-parent enumeration is a single range scan.

use super::{StoreStats, TableRead, TableWrite};
use crate::primitives::FIRST_ID;
use crate::types::{
    DenseError, Element, ElementId, Link, LinkId, Node, NodeId, ObjectKind, Version, VersionId,
};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Table for nodes: NodeId(u64) -> serialized Node bytes
const NODES: TableDefinition<u64, &[u8]> = TableDefinition::new("nodes");

/// Table for elements: ElementId(u64) -> serialized Element bytes
const ELEMENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("elements");

/// Table for versions: VersionId(u64) -> serialized Version bytes
const VERSIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("versions");

/// Table for links: LinkId(u64) -> serialized Link bytes
const LINKS: TableDefinition<u64, &[u8]> = TableDefinition::new("links");

/// Index: (node_id, element_id) -> ()
const NODE_ELEMENTS: TableDefinition<(u64, u64), ()> = TableDefinition::new("node_elements");

/// Index: (element_id, version_id) -> ()
const ELEMENT_VERSIONS: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("element_versions");

/// Index: (endpoint_node_id, link_id) -> ()
const NODE_LINKS: TableDefinition<(u64, u64), ()> = TableDefinition::new("node_links");

/// Table for metadata: key string -> value u64 (id counters)
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

fn io_err(e: impl ToString) -> DenseError {
    DenseError::IoError(e.to_string())
}

fn counter_key(kind: ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Node => "next_node_id",
        ObjectKind::Element => "next_element_id",
        ObjectKind::Version => "next_version_id",
        ObjectKind::Link => "next_link_id",
    }
}

// =============================================================================
// ROW CODEC
// =============================================================================

fn encode<T: Serialize>(row: &T) -> Result<Vec<u8>, DenseError> {
    postcard::to_allocvec(row).map_err(|e| DenseError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DenseError> {
    postcard::from_bytes(bytes).map_err(|e| DenseError::SerializationError(e.to_string()))
}

fn get_row<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> Result<Option<T>, DenseError> {
    match table.get(id).map_err(io_err)? {
        Some(data) => Ok(Some(decode(data.value())?)),
        None => Ok(None),
    }
}

fn all_rows<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
) -> Result<Vec<T>, DenseError> {
    let mut rows = Vec::new();
    for entry in table.iter().map_err(io_err)? {
        let (_, value) = entry.map_err(io_err)?;
        rows.push(decode(value.value())?);
    }
    Ok(rows)
}

/// Children of `parent` through an index table, in ascending child id.
fn indexed_rows<T: DeserializeOwned>(
    index: &impl ReadableTable<(u64, u64), ()>,
    rows: &impl ReadableTable<u64, &'static [u8]>,
    parent: u64,
) -> Result<Vec<T>, DenseError> {
    let mut out = Vec::new();
    for entry in index
        .range((parent, 0u64)..=(parent, u64::MAX))
        .map_err(io_err)?
    {
        let (key, _) = entry.map_err(io_err)?;
        let (_, child) = key.value();
        match get_row(rows, child)? {
            Some(row) => out.push(row),
            None => {
                return Err(DenseError::CorruptedStore(format!(
                    "index entry ({}, {}) has no row",
                    parent, child
                )));
            }
        }
    }
    Ok(out)
}

fn table_len(table: &impl ReadableTableMetadata) -> Result<usize, DenseError> {
    let len = table.len().map_err(io_err)?;
    usize::try_from(len).map_err(|e| DenseError::CorruptedStore(e.to_string()))
}

// =============================================================================
// DATABASE HANDLE
// =============================================================================

/// A disk-backed store using redb.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DenseError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(io_err)?;

        // Initialize tables so read transactions never see a missing table
        let write_txn = db.begin_write().map_err(io_err)?;
        {
            write_txn.open_table(NODES).map_err(io_err)?;
            write_txn.open_table(ELEMENTS).map_err(io_err)?;
            write_txn.open_table(VERSIONS).map_err(io_err)?;
            write_txn.open_table(LINKS).map_err(io_err)?;
            write_txn.open_table(NODE_ELEMENTS).map_err(io_err)?;
            write_txn.open_table(ELEMENT_VERSIONS).map_err(io_err)?;
            write_txn.open_table(NODE_LINKS).map_err(io_err)?;
            write_txn.open_table(METADATA).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        tracing::debug!(path = %path.display(), "opened redb store");
        Ok(Self { db, path })
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against a consistent read snapshot.
    pub fn read<R>(
        &self,
        f: impl FnOnce(&dyn TableRead) -> Result<R, DenseError>,
    ) -> Result<R, DenseError> {
        let txn = self.db.begin_read().map_err(io_err)?;
        f(&RedbReader { txn: &txn })
    }

    /// Run `f` inside one write transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and is aborted
    /// otherwise, so a failed operation leaves no partial writes.
    pub fn write<R>(
        &self,
        f: impl FnOnce(&mut dyn TableWrite) -> Result<R, DenseError>,
    ) -> Result<R, DenseError> {
        let txn = self.db.begin_write().map_err(io_err)?;
        let result = f(&mut RedbWriter { txn: &txn });
        match result {
            Ok(value) => {
                txn.commit().map_err(io_err)?;
                Ok(value)
            }
            Err(e) => {
                txn.abort().map_err(io_err)?;
                Err(e)
            }
        }
    }
}

// =============================================================================
// TRANSACTION VIEWS
// =============================================================================

struct RedbReader<'a> {
    txn: &'a ReadTransaction,
}

struct RedbWriter<'a> {
    txn: &'a WriteTransaction,
}

/// Both transaction kinds expose `open_table` with readable tables,
/// so the read side is shared textually.
macro_rules! impl_table_read {
    ($view:ident) => {
        impl TableRead for $view<'_> {
            fn node(&self, id: NodeId) -> Result<Option<Node>, DenseError> {
                let table = self.txn.open_table(NODES).map_err(io_err)?;
                get_row(&table, id.0)
            }

            fn nodes(&self) -> Result<Vec<Node>, DenseError> {
                let table = self.txn.open_table(NODES).map_err(io_err)?;
                all_rows(&table)
            }

            fn element(&self, id: ElementId) -> Result<Option<Element>, DenseError> {
                let table = self.txn.open_table(ELEMENTS).map_err(io_err)?;
                get_row(&table, id.0)
            }

            fn elements(&self) -> Result<Vec<Element>, DenseError> {
                let table = self.txn.open_table(ELEMENTS).map_err(io_err)?;
                all_rows(&table)
            }

            fn elements_of(&self, node: NodeId) -> Result<Vec<Element>, DenseError> {
                let index = self.txn.open_table(NODE_ELEMENTS).map_err(io_err)?;
                let rows = self.txn.open_table(ELEMENTS).map_err(io_err)?;
                indexed_rows(&index, &rows, node.0)
            }

            fn version(&self, id: VersionId) -> Result<Option<Version>, DenseError> {
                let table = self.txn.open_table(VERSIONS).map_err(io_err)?;
                get_row(&table, id.0)
            }

            fn versions(&self) -> Result<Vec<Version>, DenseError> {
                let table = self.txn.open_table(VERSIONS).map_err(io_err)?;
                all_rows(&table)
            }

            fn versions_of(&self, element: ElementId) -> Result<Vec<Version>, DenseError> {
                let index = self.txn.open_table(ELEMENT_VERSIONS).map_err(io_err)?;
                let rows = self.txn.open_table(VERSIONS).map_err(io_err)?;
                indexed_rows(&index, &rows, element.0)
            }

            fn link(&self, id: LinkId) -> Result<Option<Link>, DenseError> {
                let table = self.txn.open_table(LINKS).map_err(io_err)?;
                get_row(&table, id.0)
            }

            fn links(&self) -> Result<Vec<Link>, DenseError> {
                let table = self.txn.open_table(LINKS).map_err(io_err)?;
                all_rows(&table)
            }

            fn links_of(&self, node: NodeId) -> Result<Vec<Link>, DenseError> {
                let index = self.txn.open_table(NODE_LINKS).map_err(io_err)?;
                let rows = self.txn.open_table(LINKS).map_err(io_err)?;
                indexed_rows(&index, &rows, node.0)
            }

            fn stats(&self) -> Result<StoreStats, DenseError> {
                Ok(StoreStats {
                    nodes: table_len(&self.txn.open_table(NODES).map_err(io_err)?)?,
                    elements: table_len(&self.txn.open_table(ELEMENTS).map_err(io_err)?)?,
                    versions: table_len(&self.txn.open_table(VERSIONS).map_err(io_err)?)?,
                    links: table_len(&self.txn.open_table(LINKS).map_err(io_err)?)?,
                })
            }
        }
    };
}

impl_table_read!(RedbReader);
impl_table_read!(RedbWriter);

impl RedbWriter<'_> {
    fn put_row<T: Serialize>(
        &self,
        def: TableDefinition<'static, u64, &'static [u8]>,
        id: u64,
        row: &T,
    ) -> Result<(), DenseError> {
        let bytes = encode(row)?;
        let mut table = self.txn.open_table(def).map_err(io_err)?;
        table.insert(id, bytes.as_slice()).map_err(io_err)?;
        Ok(())
    }

    fn remove_row(
        &self,
        def: TableDefinition<'static, u64, &'static [u8]>,
        id: u64,
    ) -> Result<(), DenseError> {
        let mut table = self.txn.open_table(def).map_err(io_err)?;
        table.remove(id).map_err(io_err)?;
        Ok(())
    }

    fn index(
        &self,
        def: TableDefinition<'static, (u64, u64), ()>,
        key: (u64, u64),
        present: bool,
    ) -> Result<(), DenseError> {
        let mut table = self.txn.open_table(def).map_err(io_err)?;
        if present {
            table.insert(key, ()).map_err(io_err)?;
        } else {
            table.remove(key).map_err(io_err)?;
        }
        Ok(())
    }
}

impl TableWrite for RedbWriter<'_> {
    fn allocate_id(&mut self, kind: ObjectKind) -> Result<u64, DenseError> {
        let mut meta = self.txn.open_table(METADATA).map_err(io_err)?;
        let key = counter_key(kind);
        let id = meta
            .get(key)
            .map_err(io_err)?
            .map(|v| v.value())
            .unwrap_or(FIRST_ID);
        meta.insert(key, id.saturating_add(1)).map_err(io_err)?;
        Ok(id)
    }

    fn put_node(&mut self, node: &Node) -> Result<(), DenseError> {
        self.put_row(NODES, node.id.0, node)
    }

    fn remove_node(&mut self, id: NodeId) -> Result<(), DenseError> {
        self.remove_row(NODES, id.0)
    }

    fn put_element(&mut self, element: &Element) -> Result<(), DenseError> {
        self.put_row(ELEMENTS, element.id.0, element)?;
        self.index(NODE_ELEMENTS, (element.node.0, element.id.0), true)
    }

    fn remove_element(&mut self, element: &Element) -> Result<(), DenseError> {
        self.remove_row(ELEMENTS, element.id.0)?;
        self.index(NODE_ELEMENTS, (element.node.0, element.id.0), false)
    }

    fn put_version(&mut self, version: &Version) -> Result<(), DenseError> {
        self.put_row(VERSIONS, version.id.0, version)?;
        self.index(ELEMENT_VERSIONS, (version.element.0, version.id.0), true)
    }

    fn remove_version(&mut self, version: &Version) -> Result<(), DenseError> {
        self.remove_row(VERSIONS, version.id.0)?;
        self.index(ELEMENT_VERSIONS, (version.element.0, version.id.0), false)
    }

    fn put_link(&mut self, link: &Link) -> Result<(), DenseError> {
        self.put_row(LINKS, link.id.0, link)?;
        self.index(NODE_LINKS, (link.from.0, link.id.0), true)?;
        self.index(NODE_LINKS, (link.to.0, link.id.0), true)
    }

    fn remove_link(&mut self, link: &Link) -> Result<(), DenseError> {
        self.remove_row(LINKS, link.id.0)?;
        self.index(NODE_LINKS, (link.from.0, link.id.0), false)?;
        self.index(NODE_LINKS, (link.to.0, link.id.0), false)
    }
}
