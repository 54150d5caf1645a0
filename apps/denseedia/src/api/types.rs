//! # API Request/Response Types
//!
//! JSON shapes of the HTTP API.
//!
//! Typed values travel as `{"value_type": "<tag>", "value_json": <json>}`.
//! A request may send a bare `"value": <json>` instead and let the server
//! classify it.

use denseedia_core::{
    DeletedNode, DenseError, Element, ElementPatch, ElementSummary, ElementView, HistoryMode, Link,
    LinkPatch, NewLink, Node, NodeId, NodePatch, StoreStats, Timestamp, Value, ValueKind, Version,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a present field, null included, as `Some(..)`.
///
/// Paired with `#[serde(default)]` this tells a missing field (`None`)
/// apart from an explicit null (`Some(None)`).
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn not_null<T>(field: &str, value: Option<Option<T>>) -> Result<Option<T>, DenseError> {
    match value {
        Some(None) => Err(DenseError::InvalidInput(format!(
            "'{}' must not be null",
            field
        ))),
        other => Ok(other.flatten()),
    }
}

const fn default_true() -> bool {
    true
}

// =============================================================================
// HEALTH & STATUS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Store status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub persistent: bool,
    pub nodes: usize,
    pub elements: usize,
    pub versions: usize,
    pub links: usize,
}

impl StatusResponse {
    pub fn new(persistent: bool, stats: StoreStats) -> Self {
        Self {
            persistent,
            nodes: stats.nodes,
            elements: stats.elements,
            versions: stats.versions,
            links: stats.links,
        }
    }
}

/// Error body shared by every failing route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable tag, e.g. `not_found`.
    pub code: String,
}

// =============================================================================
// TYPED VALUES
// =============================================================================

/// A value supplied by a client, typed or bare.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueInput {
    /// Kind tag (`none`, `bool`, `int`, `float`, `str`, `datetime`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_json: Option<serde_json::Value>,
    /// Untyped value, classified server-side.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Option<serde_json::Value>>,
    /// Accept a kind different from the element's current one.
    #[serde(default)]
    pub allow_type_change: bool,
}

impl ValueInput {
    /// A typed input.
    pub fn typed(kind: ValueKind, json: serde_json::Value) -> Self {
        Self {
            value_type: Some(kind.tag().to_string()),
            value_json: Some(json),
            ..Self::default()
        }
    }

    /// Resolve to a typed value.
    ///
    /// With `value_type` the payload must match the kind (a missing
    /// `value_json` reads as null). Otherwise `value`, or a lone
    /// `value_json`, is classified.
    pub fn to_value(&self) -> Result<Value, DenseError> {
        match (&self.value_type, &self.value) {
            (Some(tag), None) => {
                let kind: ValueKind = tag.parse()?;
                let json = self
                    .value_json
                    .clone()
                    .unwrap_or(serde_json::Value::Null);
                Value::from_payload(kind, &json)
            }
            (Some(_), Some(_)) => Err(DenseError::InvalidInput(
                "send either value_type/value_json or value, not both".to_string(),
            )),
            (None, Some(bare)) => {
                Value::from_untyped(bare.as_ref().unwrap_or(&serde_json::Value::Null))
            }
            (None, None) => match &self.value_json {
                Some(json) => Value::from_untyped(json),
                None => Err(DenseError::InvalidInput(
                    "a value is required (value_type + value_json, or value)".to_string(),
                )),
            },
        }
    }
}

/// One version as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionJson {
    pub id: u64,
    pub element: u64,
    pub value_type: ValueKind,
    pub value_json: serde_json::Value,
    pub created_at: Timestamp,
    pub current: bool,
}

impl TryFrom<&Version> for VersionJson {
    type Error = DenseError;

    fn try_from(version: &Version) -> Result<Self, Self::Error> {
        let value_json = serde_json::from_str(&version.payload)
            .map_err(|e| DenseError::SerializationError(e.to_string()))?;
        Ok(Self {
            id: version.id.0,
            element: version.element.0,
            value_type: version.kind,
            value_json,
            created_at: version.created_at,
            current: version.current,
        })
    }
}

pub(crate) fn versions_json(versions: &[Version]) -> Result<Vec<VersionJson>, DenseError> {
    versions.iter().map(VersionJson::try_from).collect()
}

// =============================================================================
// ELEMENTS
// =============================================================================

/// An element with the requested part of its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementJson {
    pub id: u64,
    pub node: u64,
    pub name: String,
    pub created_at: Timestamp,
    pub todo: bool,
    pub versions: Vec<VersionJson>,
}

impl ElementJson {
    pub fn new(element: &Element, versions: &[Version]) -> Result<Self, DenseError> {
        Ok(Self {
            id: element.id.0,
            node: element.node.0,
            name: element.name.clone(),
            created_at: element.created_at,
            todo: element.todo,
            versions: versions_json(versions)?,
        })
    }
}

impl TryFrom<&ElementView> for ElementJson {
    type Error = DenseError;

    fn try_from(view: &ElementView) -> Result<Self, Self::Error> {
        Self::new(&view.element, &view.versions)
    }
}

/// Current value of one element, for node summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryJson {
    pub element: u64,
    pub name: String,
    pub value_type: ValueKind,
    pub value_json: serde_json::Value,
}

impl TryFrom<&ElementSummary> for SummaryJson {
    type Error = DenseError;

    fn try_from(summary: &ElementSummary) -> Result<Self, Self::Error> {
        Ok(Self {
            element: summary.element.0,
            name: summary.name.clone(),
            value_type: summary.kind,
            value_json: summary.value.to_payload()?,
        })
    }
}

/// Body of `POST /nodes/{id}/elements`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateElementRequest {
    pub name: String,
    #[serde(flatten)]
    pub value: ValueInput,
}

/// Body of `PATCH /elements/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementPatchRequest {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub todo: Option<Option<bool>>,
}

impl ElementPatchRequest {
    pub fn into_patch(self) -> Result<ElementPatch, DenseError> {
        Ok(ElementPatch {
            name: not_null("name", self.name)?,
            todo: not_null("todo", self.todo)?,
        })
    }
}

/// Query string of element reads: `?versions=none|current|all`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VersionsQuery {
    #[serde(default)]
    pub versions: HistoryMode,
}

// =============================================================================
// NODES
// =============================================================================

/// Body of `PATCH /nodes/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodePatchRequest {
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub kind: Option<Option<String>>,
}

impl NodePatchRequest {
    pub fn into_patch(self) -> Result<NodePatch, DenseError> {
        Ok(NodePatch {
            title: not_null("title", self.title)?,
            kind: not_null("kind", self.kind)?,
        })
    }
}

/// Response of `DELETE /nodes/{id}`: everything that was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedNodeResponse {
    pub node: Node,
    pub elements: Vec<ElementJson>,
    pub links: Vec<Link>,
}

impl TryFrom<&DeletedNode> for DeletedNodeResponse {
    type Error = DenseError;

    fn try_from(deleted: &DeletedNode) -> Result<Self, Self::Error> {
        Ok(Self {
            node: deleted.node.clone(),
            elements: deleted
                .elements
                .iter()
                .map(ElementJson::try_from)
                .collect::<Result<_, _>>()?,
            links: deleted.links.clone(),
        })
    }
}

// =============================================================================
// LINKS
// =============================================================================

/// Body of `POST /links`. Links are directed unless told otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLinkRequest {
    pub from: u64,
    pub to: u64,
    #[serde(default = "default_true")]
    pub directed: bool,
    #[serde(default)]
    pub label: Option<String>,
}

impl From<CreateLinkRequest> for NewLink {
    fn from(req: CreateLinkRequest) -> Self {
        Self {
            from: NodeId(req.from),
            to: NodeId(req.to),
            directed: req.directed,
            label: req.label,
        }
    }
}

/// Body of `PATCH /links/{id}`. `"label": null` clears the label.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkPatchRequest {
    #[serde(default, deserialize_with = "present")]
    pub directed: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present")]
    pub label: Option<Option<String>>,
}

impl LinkPatchRequest {
    pub fn into_patch(self) -> Result<LinkPatch, DenseError> {
        Ok(LinkPatch {
            directed: not_null("directed", self.directed)?,
            label: self.label,
        })
    }
}

// =============================================================================
// AGGREGATION
// =============================================================================

/// Query string of `GET /kinds/{kind}/most-used`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MostUsedQuery {
    #[serde(default = "MostUsedQuery::default_limit")]
    pub limit: usize,
}

impl MostUsedQuery {
    const fn default_limit() -> usize {
        10
    }
}

/// One element name and how many nodes of the kind use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCount {
    pub name: String,
    pub count: usize,
}

/// Response of `GET /kinds/{kind}/most-used`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MostUsedResponse {
    pub kind: String,
    pub names: Vec<NameCount>,
}

impl MostUsedResponse {
    pub fn new(kind: String, counts: Vec<(String, usize)>) -> Self {
        Self {
            kind,
            names: counts
                .into_iter()
                .map(|(name, count)| NameCount { name, count })
                .collect(),
        }
    }
}
