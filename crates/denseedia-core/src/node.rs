//! # Node Store
//!
//! Top-level items of the knowledge base. A node owns its elements (and
//! through them their ledgers); deleting it removes everything it owns
//! plus every link touching it.

use crate::element::{self, ElementSummary, ElementView, HistoryMode};
use crate::primitives::{MAX_LABEL_LENGTH, MAX_TITLE_LENGTH};
use crate::storage::{TableRead, TableWrite};
use crate::types::{DenseError, Link, NewNode, Node, NodeId, NodePatch, ObjectKind, Timestamp};
use serde::Serialize;

/// A node with the current values of its elements and its links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDetails {
    pub node: Node,
    pub elements: Vec<ElementSummary>,
    pub links: Vec<Link>,
}

/// Everything removed by [`delete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedNode {
    pub node: Node,
    pub elements: Vec<ElementView>,
    pub links: Vec<Link>,
}

fn validate_title(title: &str) -> Result<(), DenseError> {
    if title.trim().is_empty() {
        return Err(DenseError::InvalidInput("title must not be empty".to_string()));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(DenseError::InvalidInput(format!(
            "title exceeds {} bytes",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

fn validate_kind(kind: &str) -> Result<(), DenseError> {
    if kind.len() > MAX_LABEL_LENGTH {
        return Err(DenseError::InvalidInput(format!(
            "kind exceeds {} bytes",
            MAX_LABEL_LENGTH
        )));
    }
    Ok(())
}

/// Create a node.
pub fn create<T: TableWrite + ?Sized>(tables: &mut T, new: &NewNode) -> Result<Node, DenseError> {
    validate_title(&new.title)?;
    validate_kind(&new.kind)?;

    let node = Node {
        id: NodeId(tables.allocate_id(ObjectKind::Node)?),
        title: new.title.clone(),
        kind: new.kind.clone(),
        created_at: Timestamp::now(),
    };
    tables.put_node(&node)?;
    tracing::debug!(node = %node.id, kind = %node.kind, "created node");
    Ok(node)
}

/// Fetch a node by id.
pub fn get<T: TableRead + ?Sized>(tables: &T, id: NodeId) -> Result<Node, DenseError> {
    tables
        .node(id)?
        .ok_or_else(|| DenseError::not_found(ObjectKind::Node, id.0))
}

/// All nodes in id order.
pub fn list<T: TableRead + ?Sized>(tables: &T) -> Result<Vec<Node>, DenseError> {
    tables.nodes()
}

/// Apply the supplied fields of `patch`.
pub fn modify<T: TableWrite + ?Sized>(
    tables: &mut T,
    id: NodeId,
    patch: &NodePatch,
) -> Result<Node, DenseError> {
    let mut node = get(tables, id)?;
    if let Some(title) = &patch.title {
        validate_title(title)?;
        node.title = title.clone();
    }
    if let Some(kind) = &patch.kind {
        validate_kind(kind)?;
        node.kind = kind.clone();
    }
    tables.put_node(&node)?;
    Ok(node)
}

/// Delete a node with its elements, their versions and its links.
///
/// Everything is collected before the first removal; the caller's
/// transaction makes the cascade all-or-nothing.
pub fn delete<T: TableWrite + ?Sized>(
    tables: &mut T,
    id: NodeId,
) -> Result<DeletedNode, DenseError> {
    let node = get(tables, id)?;
    let elements = elements_of(tables, id, HistoryMode::All)?;
    let links = tables.links_of(id)?;

    for view in &elements {
        element::purge(tables, &view.element, &view.versions)?;
    }
    for link in &links {
        tables.remove_link(link)?;
    }
    tables.remove_node(id)?;

    tracing::info!(
        node = %id,
        elements = elements.len(),
        links = links.len(),
        "deleted node"
    );
    Ok(DeletedNode {
        node,
        elements,
        links,
    })
}

/// Elements of `node` in creation order, with the ledger part picked by `mode`.
pub fn elements_of<T: TableRead + ?Sized>(
    tables: &T,
    node: NodeId,
    mode: HistoryMode,
) -> Result<Vec<ElementView>, DenseError> {
    get(tables, node)?;
    tables
        .elements_of(node)?
        .into_iter()
        .map(|e| element::view(tables, e, mode))
        .collect()
}

/// Current value of every element of `node` that has one.
pub fn summaries<T: TableRead + ?Sized>(
    tables: &T,
    node: NodeId,
) -> Result<Vec<ElementSummary>, DenseError> {
    get(tables, node)?;
    let mut out = Vec::new();
    for e in tables.elements_of(node)? {
        if let Some(summary) = element::summarize(tables, &e)? {
            out.push(summary);
        }
    }
    Ok(out)
}

/// Node, element summaries and links in one read.
pub fn details<T: TableRead + ?Sized>(tables: &T, id: NodeId) -> Result<NodeDetails, DenseError> {
    let node = get(tables, id)?;
    Ok(NodeDetails {
        elements: summaries(tables, id)?,
        links: tables.links_of(id)?,
        node,
    })
}

// =============================================================================
// TESTS
// =============================================================================
