//! # Core Type Definitions
//!
//! This module contains the entity types of the DenseEdia store:
//! - Identifiers (`NodeId`, `ElementId`, `VersionId`, `LinkId`)
//! - Second-precision timestamps (`Timestamp`)
//! - Stored entities (`Node`, `Element`, `Version`, `Link`)
//! - Partial-update payloads (`NodePatch`, `ElementPatch`, `LinkPatch`)
//! - Error types (`DenseError`)
//!
//! ## Identity Guarantees
//!
//! - Identifiers are assigned by the backend from per-table counters
//! - Counters start at 1 and are never rewound, so ids are never reused
//! - All identifiers implement `Ord` for deterministic `BTreeMap` ordering

use crate::value::{Value, ValueKind};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a node (an "edium").
    NodeId
);
define_id!(
    /// Identifier of an element, the named attribute of a node.
    ElementId
);
define_id!(
    /// Identifier of one recorded value of an element.
    VersionId
);
define_id!(
    /// Identifier of a link between two nodes.
    LinkId
);

/// The entity kinds, used to name what an id refers to in errors
/// and to pick an id counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Node,
    Element,
    Version,
    Link,
}

impl ObjectKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Element => "element",
            Self::Version => "version",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TIMESTAMP
// =============================================================================

/// Wall-clock instant with whole-second precision.
///
/// Serializes as an ISO-8601 string (`YYYY-MM-DDTHH:MM:SS`) in every
/// encoding, so redb records and JSON bodies agree on the representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    const FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S";

    /// The current local time, sub-seconds dropped.
    #[must_use]
    pub fn now() -> Self {
        Self::from_naive(Local::now().naive_local())
    }

    /// Wrap a date-time, truncating it to whole seconds.
    #[must_use]
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self(dt.trunc_subsecs(0))
    }

    /// The wrapped date-time.
    #[must_use]
    pub const fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = DenseError;

    /// Accepts `YYYY-MM-DDTHH:MM:SS[.fff]`, the same with a space separator,
    /// RFC 3339 with an offset (kept as wall-clock time) and a bare date.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(dt) = s.parse::<NaiveDateTime>() {
            return Ok(Self::from_naive(dt));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
            return Ok(Self::from_naive(dt));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::from_naive(dt.naive_local()));
        }
        if let Some(dt) = s
            .parse::<NaiveDate>()
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(Self::from_naive(dt));
        }
        Err(DenseError::InvalidInput(format!(
            "'{}' is not an ISO-8601 date-time",
            s
        )))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A node: the top-level named item of the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    /// User-defined category ("book", "movie", ...). Empty when unset.
    pub kind: String,
    pub created_at: Timestamp,
}

/// A named, versioned attribute of exactly one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub node: NodeId,
    pub name: String,
    pub created_at: Timestamp,
    /// Advisory flag set by the user.
    pub todo: bool,
}

/// One recorded value of an element.
///
/// `kind` and `payload` never change after the version is written;
/// only `current` moves when a newer version is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub element: ElementId,
    pub kind: ValueKind,
    /// Canonical JSON text of the value.
    pub payload: String,
    pub created_at: Timestamp,
    pub current: bool,
}

impl Version {
    /// Decode the stored payload back into a typed value.
    pub fn value(&self) -> Result<Value, DenseError> {
        let json: serde_json::Value = serde_json::from_str(&self.payload)
            .map_err(|e| DenseError::SerializationError(e.to_string()))?;
        Value::from_payload(self.kind, &json)
    }
}

/// A labeled edge between two nodes.
///
/// When `directed` is false the endpoints are unordered for display,
/// but `from`/`to` keep the order they were created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub from: NodeId,
    pub to: NodeId,
    pub directed: bool,
    pub label: Option<String>,
}

impl Link {
    /// Whether `node` is one of the endpoints.
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }
}

// =============================================================================
// CREATION & PATCH PAYLOADS
// =============================================================================

/// Fields for a new node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
    pub title: String,
    #[serde(default)]
    pub kind: String,
}

impl NewNode {
    pub fn new(title: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: kind.into(),
        }
    }
}

/// Partial update of a node; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePatch {
    pub title: Option<String>,
    pub kind: Option<String>,
}

/// Partial update of an element; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementPatch {
    pub name: Option<String>,
    pub todo: Option<bool>,
}

/// Fields for a new link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLink {
    pub from: NodeId,
    pub to: NodeId,
    pub directed: bool,
    pub label: Option<String>,
}

/// Partial update of a link.
///
/// `label` is nullable: `Some(None)` clears it, `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPatch {
    pub directed: Option<bool>,
    pub label: Option<Option<String>>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the DenseEdia store.
///
/// Every variant above `CorruptedStore` is a value-level failure: when
/// one is returned the store has not been mutated.
#[derive(Debug, Error)]
pub enum DenseError {
    /// A referenced node, element, version or link does not exist.
    #[error("{kind} {id} not found")]
    ObjectNotFound { kind: ObjectKind, id: u64 },

    /// The node has no element with this name.
    #[error("Node {node} has no element named '{name}'")]
    ElementNameNotFound { node: u64, name: String },

    /// The node already has an element with this exact name.
    #[error("An element named '{0}' already exists on this node")]
    DuplicateElementName(String),

    /// The write would change the element's value kind without an override.
    #[error("Changing type is not allowed ({old} -> {new})")]
    ValueTypeChange { old: ValueKind, new: ValueKind },

    /// The input value has no supported kind.
    #[error("Type not supported: {0}")]
    UnsupportedType(String),

    /// The input was rejected by validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored invariant was found broken.
    #[error("Corrupted store: {0}")]
    CorruptedStore(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage engine error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl DenseError {
    pub(crate) fn not_found(kind: ObjectKind, id: u64) -> Self {
        Self::ObjectNotFound { kind, id }
    }
}

// =============================================================================
// TESTS
// =============================================================================
