//! # In-Memory Tables
//!
//! Volatile backend made of ordered maps, one per entity kind, plus
//! ordered pair sets for the parent indexes.
//!
//! Uses `BTreeMap`/`BTreeSet` exclusively for deterministic ordering.

use super::{StoreStats, TableRead, TableWrite};
use crate::primitives::FIRST_ID;
use crate::types::{
    DenseError, Element, ElementId, Link, LinkId, Node, NodeId, ObjectKind, Version, VersionId,
};
use std::collections::{BTreeMap, BTreeSet};

/// Per-table id counters.
#[derive(Debug, Clone)]
struct Counters {
    node: u64,
    element: u64,
    version: u64,
    link: u64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            node: FIRST_ID,
            element: FIRST_ID,
            version: FIRST_ID,
            link: FIRST_ID,
        }
    }
}

/// The in-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    nodes: BTreeMap<NodeId, Node>,
    elements: BTreeMap<ElementId, Element>,
    versions: BTreeMap<VersionId, Version>,
    links: BTreeMap<LinkId, Link>,

    /// node -> owned elements
    node_elements: BTreeSet<(NodeId, ElementId)>,
    /// element -> ledger
    element_versions: BTreeSet<(ElementId, VersionId)>,
    /// endpoint -> incident links
    node_links: BTreeSet<(NodeId, LinkId)>,

    counters: Counters,
}

impl MemoryTables {
    /// Create empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableRead for MemoryTables {
    fn node(&self, id: NodeId) -> Result<Option<Node>, DenseError> {
        Ok(self.nodes.get(&id).cloned())
    }

    fn nodes(&self) -> Result<Vec<Node>, DenseError> {
        Ok(self.nodes.values().cloned().collect())
    }

    fn element(&self, id: ElementId) -> Result<Option<Element>, DenseError> {
        Ok(self.elements.get(&id).cloned())
    }

    fn elements(&self) -> Result<Vec<Element>, DenseError> {
        Ok(self.elements.values().cloned().collect())
    }

    fn elements_of(&self, node: NodeId) -> Result<Vec<Element>, DenseError> {
        Ok(self
            .node_elements
            .range((node, ElementId(0))..=(node, ElementId(u64::MAX)))
            .filter_map(|(_, id)| self.elements.get(id).cloned())
            .collect())
    }

    fn version(&self, id: VersionId) -> Result<Option<Version>, DenseError> {
        Ok(self.versions.get(&id).cloned())
    }

    fn versions(&self) -> Result<Vec<Version>, DenseError> {
        Ok(self.versions.values().cloned().collect())
    }

    fn versions_of(&self, element: ElementId) -> Result<Vec<Version>, DenseError> {
        Ok(self
            .element_versions
            .range((element, VersionId(0))..=(element, VersionId(u64::MAX)))
            .filter_map(|(_, id)| self.versions.get(id).cloned())
            .collect())
    }

    fn link(&self, id: LinkId) -> Result<Option<Link>, DenseError> {
        Ok(self.links.get(&id).cloned())
    }

    fn links(&self) -> Result<Vec<Link>, DenseError> {
        Ok(self.links.values().cloned().collect())
    }

    fn links_of(&self, node: NodeId) -> Result<Vec<Link>, DenseError> {
        Ok(self
            .node_links
            .range((node, LinkId(0))..=(node, LinkId(u64::MAX)))
            .filter_map(|(_, id)| self.links.get(id).cloned())
            .collect())
    }

    fn stats(&self) -> Result<StoreStats, DenseError> {
        Ok(StoreStats {
            nodes: self.nodes.len(),
            elements: self.elements.len(),
            versions: self.versions.len(),
            links: self.links.len(),
        })
    }
}

impl TableWrite for MemoryTables {
    fn allocate_id(&mut self, kind: ObjectKind) -> Result<u64, DenseError> {
        let counter = match kind {
            ObjectKind::Node => &mut self.counters.node,
            ObjectKind::Element => &mut self.counters.element,
            ObjectKind::Version => &mut self.counters.version,
            ObjectKind::Link => &mut self.counters.link,
        };
        let id = *counter;
        *counter = counter.saturating_add(1);
        Ok(id)
    }

    fn put_node(&mut self, node: &Node) -> Result<(), DenseError> {
        self.nodes.insert(node.id, node.clone());
        Ok(())
    }

    fn remove_node(&mut self, id: NodeId) -> Result<(), DenseError> {
        self.nodes.remove(&id);
        Ok(())
    }

    fn put_element(&mut self, element: &Element) -> Result<(), DenseError> {
        self.node_elements.insert((element.node, element.id));
        self.elements.insert(element.id, element.clone());
        Ok(())
    }

    fn remove_element(&mut self, element: &Element) -> Result<(), DenseError> {
        self.node_elements.remove(&(element.node, element.id));
        self.elements.remove(&element.id);
        Ok(())
    }

    fn put_version(&mut self, version: &Version) -> Result<(), DenseError> {
        self.element_versions
            .insert((version.element, version.id));
        self.versions.insert(version.id, version.clone());
        Ok(())
    }

    fn remove_version(&mut self, version: &Version) -> Result<(), DenseError> {
        self.element_versions
            .remove(&(version.element, version.id));
        self.versions.remove(&version.id);
        Ok(())
    }

    fn put_link(&mut self, link: &Link) -> Result<(), DenseError> {
        self.node_links.insert((link.from, link.id));
        self.node_links.insert((link.to, link.id));
        self.links.insert(link.id, link.clone());
        Ok(())
    }

    fn remove_link(&mut self, link: &Link) -> Result<(), DenseError> {
        self.node_links.remove(&(link.from, link.id));
        self.node_links.remove(&(link.to, link.id));
        self.links.remove(&link.id);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
