//! # Link Graph
//!
//! Labeled, optionally directed edges between nodes. Links hold no
//! element data; they are removed with either endpoint.

use crate::primitives::MAX_LABEL_LENGTH;
use crate::storage::{TableRead, TableWrite};
use crate::types::{DenseError, Link, LinkId, LinkPatch, NewLink, NodeId, ObjectKind};

fn validate_label(label: Option<&str>) -> Result<(), DenseError> {
    match label {
        Some(l) if l.len() > MAX_LABEL_LENGTH => Err(DenseError::InvalidInput(format!(
            "label exceeds {} bytes",
            MAX_LABEL_LENGTH
        ))),
        _ => Ok(()),
    }
}

fn require_node<T: TableRead + ?Sized>(tables: &T, id: NodeId) -> Result<(), DenseError> {
    if tables.node(id)?.is_none() {
        return Err(DenseError::not_found(ObjectKind::Node, id.0));
    }
    Ok(())
}

/// Create a link. Both endpoints are checked before anything is written.
pub fn create<T: TableWrite + ?Sized>(tables: &mut T, new: &NewLink) -> Result<Link, DenseError> {
    validate_label(new.label.as_deref())?;
    require_node(tables, new.from)?;
    require_node(tables, new.to)?;

    let link = Link {
        id: LinkId(tables.allocate_id(ObjectKind::Link)?),
        from: new.from,
        to: new.to,
        directed: new.directed,
        label: new.label.clone(),
    };
    tables.put_link(&link)?;
    tracing::debug!(link = %link.id, from = %link.from, to = %link.to, "created link");
    Ok(link)
}

pub fn get<T: TableRead + ?Sized>(tables: &T, id: LinkId) -> Result<Link, DenseError> {
    tables
        .link(id)?
        .ok_or_else(|| DenseError::not_found(ObjectKind::Link, id.0))
}

pub fn list<T: TableRead + ?Sized>(tables: &T) -> Result<Vec<Link>, DenseError> {
    tables.links()
}

/// Links with `node` at either end, ascending id; a self-link appears once.
pub fn links_of<T: TableRead + ?Sized>(tables: &T, node: NodeId) -> Result<Vec<Link>, DenseError> {
    require_node(tables, node)?;
    tables.links_of(node)
}

/// Apply the supplied fields of `patch`. `Some(None)` clears the label.
pub fn modify<T: TableWrite + ?Sized>(
    tables: &mut T,
    id: LinkId,
    patch: &LinkPatch,
) -> Result<Link, DenseError> {
    let mut link = get(tables, id)?;
    if let Some(label) = &patch.label {
        validate_label(label.as_deref())?;
        link.label = label.clone();
    }
    if let Some(directed) = patch.directed {
        link.directed = directed;
    }
    tables.put_link(&link)?;
    Ok(link)
}

/// Delete a link, returning it.
pub fn delete<T: TableWrite + ?Sized>(tables: &mut T, id: LinkId) -> Result<Link, DenseError> {
    let link = get(tables, id)?;
    tables.remove_link(&link)?;
    Ok(link)
}

// =============================================================================
// TESTS
// =============================================================================
