//! # Attribute Store
//!
//! Named, versioned attributes of a node. An element name is unique
//! within its node (exact, case-sensitive match); the values live in the
//! element's version ledger.

use crate::ledger::{self, Entry};
use crate::primitives::MAX_ELEMENT_NAME_LENGTH;
use crate::storage::{TableRead, TableWrite};
use crate::types::{
    DenseError, Element, ElementId, ElementPatch, NodeId, ObjectKind, Timestamp, Version,
};
use crate::value::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// READ SHAPES
// =============================================================================

/// How much of each ledger to include when reading elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    /// Elements only.
    None,
    /// Elements with their current version.
    #[default]
    #[serde(alias = "single")]
    Current,
    /// Elements with their full history.
    All,
}

impl FromStr for HistoryMode {
    type Err = DenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "current" | "single" => Ok(Self::Current),
            "all" => Ok(Self::All),
            other => Err(DenseError::InvalidInput(format!(
                "unknown history mode '{}' (expected none, current or all)",
                other
            ))),
        }
    }
}

impl fmt::Display for HistoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Current => "current",
            Self::All => "all",
        })
    }
}

/// An element together with the selected part of its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementView {
    pub element: Element,
    pub versions: Vec<Version>,
}

/// The current value of an element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementSummary {
    pub element: ElementId,
    pub name: String,
    pub kind: ValueKind,
    pub value: Value,
}

// =============================================================================
// VALIDATION
// =============================================================================

fn validate_name(name: &str) -> Result<(), DenseError> {
    if name.trim().is_empty() {
        return Err(DenseError::InvalidInput(
            "element name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_ELEMENT_NAME_LENGTH {
        return Err(DenseError::InvalidInput(format!(
            "element name exceeds {} bytes",
            MAX_ELEMENT_NAME_LENGTH
        )));
    }
    Ok(())
}

fn require_node<T: TableRead + ?Sized>(tables: &T, node: NodeId) -> Result<(), DenseError> {
    match tables.node(node)? {
        Some(_) => Ok(()),
        None => Err(DenseError::not_found(ObjectKind::Node, node.0)),
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Fetch an element by id.
pub fn get<T: TableRead + ?Sized>(tables: &T, id: ElementId) -> Result<Element, DenseError> {
    tables
        .element(id)?
        .ok_or_else(|| DenseError::not_found(ObjectKind::Element, id.0))
}

/// The element of `node` named exactly `name`.
pub fn by_name<T: TableRead + ?Sized>(
    tables: &T,
    node: NodeId,
    name: &str,
) -> Result<Option<Element>, DenseError> {
    Ok(tables
        .elements_of(node)?
        .into_iter()
        .find(|e| e.name == name))
}

/// Attach the ledger part selected by `mode` to `element`.
pub fn view<T: TableRead + ?Sized>(
    tables: &T,
    element: Element,
    mode: HistoryMode,
) -> Result<ElementView, DenseError> {
    let versions = match mode {
        HistoryMode::None => Vec::new(),
        HistoryMode::Current => ledger::current(tables, element.id)?.into_iter().collect(),
        HistoryMode::All => ledger::history(tables, element.id)?,
    };
    Ok(ElementView { element, versions })
}

/// Create a new element on `node` with `value` as its first version.
pub fn create<T: TableWrite + ?Sized>(
    tables: &mut T,
    node: NodeId,
    name: &str,
    value: &Value,
) -> Result<(Element, Version), DenseError> {
    validate_name(name)?;
    require_node(tables, node)?;
    if by_name(tables, node, name)?.is_some() {
        return Err(DenseError::DuplicateElementName(name.to_string()));
    }
    let entry = Entry::encode(value)?;

    let element = insert(tables, node, name)?;
    let version = ledger::append_entry(tables, element.id, entry)?;
    Ok((element, version))
}

fn insert<T: TableWrite + ?Sized>(
    tables: &mut T,
    node: NodeId,
    name: &str,
) -> Result<Element, DenseError> {
    let element = Element {
        id: ElementId(tables.allocate_id(ObjectKind::Element)?),
        node,
        name: name.to_string(),
        created_at: Timestamp::now(),
        todo: false,
    };
    tables.put_element(&element)?;
    tracing::debug!(node = %node, element = %element.id, name, "created element");
    Ok(element)
}

/// Record `value` under `name` on `node`, creating the element if needed.
///
/// An existing element only accepts a value of its current kind unless
/// `allow_type_change` is set.
pub fn set_value<T: TableWrite + ?Sized>(
    tables: &mut T,
    node: NodeId,
    name: &str,
    value: &Value,
    allow_type_change: bool,
) -> Result<Version, DenseError> {
    require_node(tables, node)?;
    let entry = Entry::encode(value)?;

    match by_name(tables, node, name)? {
        Some(element) => {
            let current = ledger::current(tables, element.id)?;
            ledger::check_kind(current.map(|v| v.kind), entry.kind(), allow_type_change)?;
            ledger::append_entry(tables, element.id, entry)
        }
        None => {
            validate_name(name)?;
            let element = insert(tables, node, name)?;
            ledger::append_entry(tables, element.id, entry)
        }
    }
}

/// Append `value` to an element addressed by id.
pub fn append_version<T: TableWrite + ?Sized>(
    tables: &mut T,
    id: ElementId,
    value: &Value,
    allow_type_change: bool,
) -> Result<Version, DenseError> {
    let element = get(tables, id)?;
    let entry = Entry::encode(value)?;
    let current = ledger::current(tables, element.id)?;
    ledger::check_kind(current.map(|v| v.kind), entry.kind(), allow_type_change)?;
    ledger::append_entry(tables, element.id, entry)
}

/// Apply the supplied fields of `patch`.
///
/// A rename must not collide with another element of the same node.
pub fn modify<T: TableWrite + ?Sized>(
    tables: &mut T,
    id: ElementId,
    patch: &ElementPatch,
) -> Result<Element, DenseError> {
    let mut element = get(tables, id)?;

    if let Some(name) = &patch.name {
        validate_name(name)?;
        if *name != element.name {
            if by_name(tables, element.node, name)?.is_some() {
                return Err(DenseError::DuplicateElementName(name.clone()));
            }
            element.name = name.clone();
        }
    }
    if let Some(todo) = patch.todo {
        element.todo = todo;
    }

    tables.put_element(&element)?;
    Ok(element)
}

/// Delete an element and its whole ledger.
///
/// Returns what was removed.
pub fn delete<T: TableWrite + ?Sized>(
    tables: &mut T,
    id: ElementId,
) -> Result<ElementView, DenseError> {
    let element = get(tables, id)?;
    let versions = ledger::history(tables, id)?;
    purge(tables, &element, &versions)?;
    tracing::debug!(element = %id, versions = versions.len(), "deleted element");
    Ok(ElementView { element, versions })
}

pub(crate) fn purge<T: TableWrite + ?Sized>(
    tables: &mut T,
    element: &Element,
    versions: &[Version],
) -> Result<(), DenseError> {
    for version in versions {
        tables.remove_version(version)?;
    }
    tables.remove_element(element)
}

/// Current value of `element`, or `None` while its ledger is empty.
pub fn summarize<T: TableRead + ?Sized>(
    tables: &T,
    element: &Element,
) -> Result<Option<ElementSummary>, DenseError> {
    let Some(version) = ledger::current(tables, element.id)? else {
        return Ok(None);
    };
    Ok(Some(ElementSummary {
        element: element.id,
        name: element.name.clone(),
        kind: version.kind,
        value: version.value()?,
    }))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTables;
    use crate::types::Node;

    fn with_node() -> (MemoryTables, NodeId) {
        let mut tables = MemoryTables::new();
        let id = NodeId(tables.allocate_id(ObjectKind::Node).expect("id"));
        tables
            .put_node(&Node {
                id,
                title: "Dune".to_string(),
                kind: "book".to_string(),
                created_at: Timestamp::now(),
            })
            .expect("put");
        (tables, id)
    }

    #[test]
    fn create_requires_the_node() {
        let mut tables = MemoryTables::new();
        let err = create(&mut tables, NodeId(7), "author", &Value::None).expect_err("no node");
        assert!(matches!(
            err,
            DenseError::ObjectNotFound {
                kind: ObjectKind::Node,
                id: 7
            }
        ));
    }

    #[test]
    fn names_are_unique_and_case_sensitive() {
        let (mut tables, node) = with_node();
        create(&mut tables, node, "author", &Value::None).expect("create");

        let err = create(&mut tables, node, "author", &Value::Int(1)).expect_err("duplicate");
        assert!(matches!(err, DenseError::DuplicateElementName(ref n) if n == "author"));

        create(&mut tables, node, "Author", &Value::None).expect("different case");
        assert_eq!(tables.elements_of(node).expect("elements").len(), 2);
    }

    #[test]
    fn empty_name_is_rejected() {
        let (mut tables, node) = with_node();
        assert!(matches!(
            create(&mut tables, node, "  ", &Value::None),
            Err(DenseError::InvalidInput(_))
        ));
    }

    #[test]
    fn set_value_finds_or_creates() {
        let (mut tables, node) = with_node();
        let first = set_value(&mut tables, node, "year", &Value::Int(1965), false).expect("set");
        let second = set_value(&mut tables, node, "year", &Value::Int(1966), false).expect("set");

        assert_eq!(first.element, second.element);
        assert_eq!(tables.elements_of(node).expect("elements").len(), 1);
        assert_eq!(ledger::history(&tables, first.element).expect("history").len(), 2);
    }

    #[test]
    fn set_value_refuses_kind_change_without_override() {
        let (mut tables, node) = with_node();
        set_value(&mut tables, node, "year", &Value::Int(1965), false).expect("set");

        let err = set_value(
            &mut tables,
            node,
            "year",
            &Value::String("1965".to_string()),
            false,
        )
        .expect_err("kind change");
        assert!(matches!(
            err,
            DenseError::ValueTypeChange {
                old: ValueKind::Int,
                new: ValueKind::String
            }
        ));

        let v = set_value(
            &mut tables,
            node,
            "year",
            &Value::String("1965".to_string()),
            true,
        )
        .expect("override");
        let history = ledger::history(&tables, v.element).expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, ValueKind::Int, "past versions keep their kind");
    }

    #[test]
    fn rename_rechecks_uniqueness() {
        let (mut tables, node) = with_node();
        let (a, _) = create(&mut tables, node, "a", &Value::None).expect("create");
        create(&mut tables, node, "b", &Value::None).expect("create");

        let patch = ElementPatch {
            name: Some("b".to_string()),
            todo: None,
        };
        assert!(matches!(
            modify(&mut tables, a.id, &patch),
            Err(DenseError::DuplicateElementName(_))
        ));

        let patch = ElementPatch {
            name: Some("c".to_string()),
            todo: Some(true),
        };
        let renamed = modify(&mut tables, a.id, &patch).expect("rename");
        assert_eq!(renamed.name, "c");
        assert!(renamed.todo);
        assert!(by_name(&tables, node, "c").expect("lookup").is_some());
    }

    #[test]
    fn delete_cascades_to_versions() {
        let (mut tables, node) = with_node();
        let (element, _) = create(&mut tables, node, "a", &Value::Int(1)).expect("create");
        append_version(&mut tables, element.id, &Value::Int(2), false).expect("append");

        let removed = delete(&mut tables, element.id).expect("delete");
        assert_eq!(removed.versions.len(), 2);
        assert_eq!(tables.stats().expect("stats").versions, 0);
        assert!(matches!(
            get(&tables, element.id),
            Err(DenseError::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn view_honours_history_mode() {
        let (mut tables, node) = with_node();
        let (element, _) = create(&mut tables, node, "a", &Value::Int(1)).expect("create");
        append_version(&mut tables, element.id, &Value::Int(2), false).expect("append");

        let none = view(&tables, element.clone(), HistoryMode::None).expect("view");
        let current = view(&tables, element.clone(), HistoryMode::Current).expect("view");
        let all = view(&tables, element, HistoryMode::All).expect("view");

        assert!(none.versions.is_empty());
        assert_eq!(current.versions.len(), 1);
        assert_eq!(current.versions[0].value().expect("value"), Value::Int(2));
        assert_eq!(all.versions.len(), 2);
    }

    #[test]
    fn summarize_skips_empty_ledger() {
        let (mut tables, node) = with_node();
        let (element, version) = create(&mut tables, node, "a", &Value::Bool(true)).expect("create");

        let summary = summarize(&tables, &element).expect("summary").expect("present");
        assert_eq!(summary.value, Value::Bool(true));

        ledger::remove(&mut tables, &version).expect("remove");
        assert!(summarize(&tables, &element).expect("summary").is_none());
    }

    #[test]
    fn history_mode_parsing() {
        assert_eq!("single".parse::<HistoryMode>().expect("alias"), HistoryMode::Current);
        assert_eq!("ALL".parse::<HistoryMode>().expect("all"), HistoryMode::All);
        assert!("latest".parse::<HistoryMode>().is_err());
    }
}
