//! # Query Module
//!
//! Read-only aggregations across the whole store:
//! - `most_used_element_names`: element-name frequency per node kind
//! - `stats`: table row counts
//! - `snapshot`: a full dump of every table, for export

use crate::primitives::MAX_MOST_USED_LIMIT;
use crate::storage::{StoreStats, TableRead};
use crate::types::{DenseError, Element, Link, Node, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every row of every table, in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub elements: Vec<Element>,
    pub versions: Vec<Version>,
    pub links: Vec<Link>,
}

/// The `limit` most frequent element names over nodes of `kind`.
///
/// Every element counts, including the same name on different nodes.
/// Sorted by descending count; ties keep first-encountered order (nodes
/// by id, then elements by id).
pub fn most_used_element_names<T: TableRead + ?Sized>(
    tables: &T,
    kind: &str,
    limit: usize,
) -> Result<Vec<(String, usize)>, DenseError> {
    if limit == 0 {
        return Err(DenseError::InvalidInput(
            "limit must be at least 1".to_string(),
        ));
    }
    let limit = limit.min(MAX_MOST_USED_LIMIT);

    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut position: BTreeMap<String, usize> = BTreeMap::new();

    for node in tables.nodes()?.into_iter().filter(|n| n.kind == kind) {
        for element in tables.elements_of(node.id)? {
            match position.get(&element.name) {
                Some(&i) => counts[i].1 = counts[i].1.saturating_add(1),
                None => {
                    position.insert(element.name.clone(), counts.len());
                    counts.push((element.name, 1));
                }
            }
        }
    }

    // stable: equal counts stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    Ok(counts)
}

/// Row counts of every table.
pub fn stats<T: TableRead + ?Sized>(tables: &T) -> Result<StoreStats, DenseError> {
    tables.stats()
}

/// Dump every table.
pub fn snapshot<T: TableRead + ?Sized>(tables: &T) -> Result<Snapshot, DenseError> {
    Ok(Snapshot {
        nodes: tables.nodes()?,
        elements: tables.elements()?,
        versions: tables.versions()?,
        links: tables.links()?,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element;
    use crate::node;
    use crate::storage::MemoryTables;
    use crate::types::NewNode;
    use crate::value::Value;

    fn add(tables: &mut MemoryTables, kind: &str, names: &[&str]) {
        let n = node::create(tables, &NewNode::new("item", kind)).expect("create");
        for name in names {
            element::create(tables, n.id, name, &Value::None).expect("element");
        }
    }

    #[test]
    fn counts_per_kind() {
        let mut tables = MemoryTables::new();
        add(&mut tables, "book", &["title", "author"]);
        add(&mut tables, "book", &["title"]);
        add(&mut tables, "movie", &["title"]);

        let top = most_used_element_names(&tables, "book", 2).expect("query");
        assert_eq!(
            top,
            vec![("title".to_string(), 2), ("author".to_string(), 1)]
        );
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let mut tables = MemoryTables::new();
        add(&mut tables, "book", &["year", "author", "isbn"]);
        add(&mut tables, "book", &["isbn"]);

        let top = most_used_element_names(&tables, "book", 10).expect("query");
        let names: Vec<&str> = top.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["isbn", "year", "author"]);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let tables = MemoryTables::new();
        assert!(matches!(
            most_used_element_names(&tables, "book", 0),
            Err(DenseError::InvalidInput(_))
        ));
    }

    #[test]
    fn unknown_kind_is_empty() {
        let mut tables = MemoryTables::new();
        add(&mut tables, "book", &["title"]);
        assert!(most_used_element_names(&tables, "album", 5)
            .expect("query")
            .is_empty());
    }

    #[test]
    fn snapshot_and_stats_agree() {
        let mut tables = MemoryTables::new();
        add(&mut tables, "book", &["title", "author"]);

        let snap = snapshot(&tables).expect("snapshot");
        let counts = stats(&tables).expect("stats");
        assert_eq!(snap.nodes.len(), counts.nodes);
        assert_eq!(snap.elements.len(), counts.elements);
        assert_eq!(snap.versions.len(), counts.versions);
        assert_eq!(snap.links.len(), counts.links);
    }
}
