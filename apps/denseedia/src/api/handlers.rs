//! # API Endpoint Handlers
//!
//! Each handler takes the store lock, runs one store operation and
//! shapes the result. Reads share the lock; writes hold it exclusively.

use super::{
    AppState,
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    types::{
        CreateElementRequest, CreateLinkRequest, DeletedNodeResponse, ElementJson,
        ElementPatchRequest, HealthResponse, LinkPatchRequest, MostUsedQuery, MostUsedResponse,
        NodePatchRequest, StatusResponse, SummaryJson, ValueInput, VersionJson, VersionsQuery,
        versions_json,
    },
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use denseedia_core::{
    ElementId, Link, LinkId, NewLink, NewNode, Node, NodeId, Snapshot, VersionId,
};

type ApiResult<T> = Result<Json<T>, ApiError>;
type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

// =============================================================================
// SERVICE
// =============================================================================

/// Liveness check.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Table row counts.
pub async fn status_handler(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    let store = state.store.read().await;
    let stats = store.stats()?;
    Ok(Json(StatusResponse::new(store.is_persistent(), stats)))
}

/// Full dump of every table.
pub async fn export_handler(State(state): State<AppState>) -> ApiResult<Snapshot> {
    let store = state.store.read().await;
    Ok(Json(store.snapshot()?))
}

// =============================================================================
// NODES
// =============================================================================

pub async fn list_nodes_handler(State(state): State<AppState>) -> ApiResult<Vec<Node>> {
    let store = state.store.read().await;
    Ok(Json(store.list_nodes()?))
}

pub async fn create_node_handler(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewNode>,
) -> Created<Node> {
    let mut store = state.store.write().await;
    let node = store.create_node(&new)?;
    Ok((StatusCode::CREATED, Json(node)))
}

pub async fn get_node_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Node> {
    let store = state.store.read().await;
    Ok(Json(store.get_node(NodeId(id))?))
}

pub async fn modify_node_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<NodePatchRequest>,
) -> ApiResult<Node> {
    let patch = request.into_patch()?;
    let mut store = state.store.write().await;
    Ok(Json(store.modify_node(NodeId(id), &patch)?))
}

/// Delete a node with its elements, versions and links.
pub async fn delete_node_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<DeletedNodeResponse> {
    let mut store = state.store.write().await;
    let deleted = store.delete_node(NodeId(id))?;
    Ok(Json(DeletedNodeResponse::try_from(&deleted)?))
}

pub async fn node_elements_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiQuery(query): ApiQuery<VersionsQuery>,
) -> ApiResult<Vec<ElementJson>> {
    let store = state.store.read().await;
    let views = store.elements_of(NodeId(id), query.versions)?;
    let elements = views
        .iter()
        .map(ElementJson::try_from)
        .collect::<Result<_, _>>()?;
    Ok(Json(elements))
}

/// Create an element with its first version.
pub async fn create_element_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<CreateElementRequest>,
) -> Created<ElementJson> {
    let value = request.value.to_value()?;
    let mut store = state.store.write().await;
    let (element, version) = store.create_element(NodeId(id), &request.name, &value)?;
    let body = ElementJson::new(&element, std::slice::from_ref(&version))?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// Find-or-create the element and make `value` its current version.
pub async fn set_value_handler(
    State(state): State<AppState>,
    ApiPath((id, name)): ApiPath<(u64, String)>,
    ApiJson(input): ApiJson<ValueInput>,
) -> ApiResult<VersionJson> {
    let value = input.to_value()?;
    let mut store = state.store.write().await;
    let version = store.set_value(NodeId(id), &name, &value, input.allow_type_change)?;
    Ok(Json(VersionJson::try_from(&version)?))
}

pub async fn node_summary_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Vec<SummaryJson>> {
    let store = state.store.read().await;
    let summaries = store.summaries(NodeId(id))?;
    let body = summaries
        .iter()
        .map(SummaryJson::try_from)
        .collect::<Result<_, _>>()?;
    Ok(Json(body))
}

pub async fn node_links_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Vec<Link>> {
    let store = state.store.read().await;
    Ok(Json(store.links_of(NodeId(id))?))
}

// =============================================================================
// ELEMENTS
// =============================================================================

pub async fn get_element_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiQuery(query): ApiQuery<VersionsQuery>,
) -> ApiResult<ElementJson> {
    let store = state.store.read().await;
    let view = store.get_element(ElementId(id), query.versions)?;
    Ok(Json(ElementJson::try_from(&view)?))
}

pub async fn modify_element_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<ElementPatchRequest>,
) -> ApiResult<ElementJson> {
    let patch = request.into_patch()?;
    let mut store = state.store.write().await;
    let element = store.modify_element(ElementId(id), &patch)?;
    Ok(Json(ElementJson::new(&element, &[])?))
}

/// Delete an element; the response carries its full history.
pub async fn delete_element_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<ElementJson> {
    let mut store = state.store.write().await;
    let view = store.delete_element(ElementId(id))?;
    Ok(Json(ElementJson::try_from(&view)?))
}

// =============================================================================
// VERSIONS
// =============================================================================

pub async fn history_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Vec<VersionJson>> {
    let store = state.store.read().await;
    let history = store.history(ElementId(id))?;
    Ok(Json(versions_json(&history)?))
}

pub async fn append_version_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(input): ApiJson<ValueInput>,
) -> Created<VersionJson> {
    let value = input.to_value()?;
    let mut store = state.store.write().await;
    let version = store.append_version(ElementId(id), &value, input.allow_type_change)?;
    Ok((StatusCode::CREATED, Json(VersionJson::try_from(&version)?)))
}

pub async fn get_version_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<VersionJson> {
    let store = state.store.read().await;
    let version = store.get_version(VersionId(id))?;
    Ok(Json(VersionJson::try_from(&version)?))
}

/// Delete one version; the newest remaining one becomes current.
pub async fn delete_version_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<VersionJson> {
    let mut store = state.store.write().await;
    let version = store.delete_version(VersionId(id))?;
    Ok(Json(VersionJson::try_from(&version)?))
}

// =============================================================================
// LINKS
// =============================================================================

pub async fn list_links_handler(State(state): State<AppState>) -> ApiResult<Vec<Link>> {
    let store = state.store.read().await;
    Ok(Json(store.list_links()?))
}

pub async fn create_link_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateLinkRequest>,
) -> Created<Link> {
    let new = NewLink::from(request);
    let mut store = state.store.write().await;
    let link = store.create_link(&new)?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn get_link_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Link> {
    let store = state.store.read().await;
    Ok(Json(store.get_link(LinkId(id))?))
}

pub async fn modify_link_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<LinkPatchRequest>,
) -> ApiResult<Link> {
    let patch = request.into_patch()?;
    let mut store = state.store.write().await;
    Ok(Json(store.modify_link(LinkId(id), &patch)?))
}

pub async fn delete_link_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Link> {
    let mut store = state.store.write().await;
    Ok(Json(store.delete_link(LinkId(id))?))
}

// =============================================================================
// AGGREGATION
// =============================================================================

pub async fn most_used_handler(
    State(state): State<AppState>,
    ApiPath(kind): ApiPath<String>,
    ApiQuery(query): ApiQuery<MostUsedQuery>,
) -> ApiResult<MostUsedResponse> {
    let store = state.store.read().await;
    let counts = store.most_used_element_names(&kind, query.limit)?;
    Ok(Json(MostUsedResponse::new(kind, counts)))
}
