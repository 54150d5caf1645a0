//! Integration tests for the DenseEdia HTTP API.
//!
//! Uses axum-test to drive the router without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use denseedia::api::{
    AppState, DeletedNodeResponse, ElementJson, ErrorResponse, HealthResponse, MostUsedResponse,
    StatusResponse, SummaryJson, VersionJson, create_router,
};
use denseedia::config::ServerConfig;
use denseedia_core::{Link, Node, Snapshot, Store, ValueKind};
use serde_json::json;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Settings with rate limiting off so tests never race the bucket.
fn open_config() -> ServerConfig {
    ServerConfig {
        rate_limit: 0,
        ..ServerConfig::default()
    }
}

/// Create a test server over a fresh in-memory store.
fn create_test_server() -> TestServer {
    let router = create_router(AppState::new(Store::in_memory()), &open_config());
    TestServer::new(router).unwrap()
}

async fn create_node(server: &TestServer, title: &str, kind: &str) -> Node {
    let response = server
        .post("/nodes")
        .json(&json!({ "title": title, "kind": kind }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

async fn set_value(
    server: &TestServer,
    node: u64,
    name: &str,
    body: serde_json::Value,
) -> axum_test::TestResponse {
    server
        .put(&format!("/nodes/{}/elements/{}", node, name))
        .json(&body)
        .await
}

fn assert_error(response: &axum_test::TestResponse, status: u16, code: &str) {
    assert_eq!(response.status_code().as_u16(), status);
    let body: ErrorResponse = response.json();
    assert_eq!(body.code, code);
}

// =============================================================================
// SERVICE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_counts_rows() {
    let server = create_test_server();
    let dune = create_node(&server, "Dune", "book").await;
    set_value(&server, dune.id.0, "rating", json!({ "value": 5 }))
        .await
        .assert_status_ok();

    let status: StatusResponse = server.get("/status").await.json();
    assert!(!status.persistent);
    assert_eq!(
        (status.nodes, status.elements, status.versions, status.links),
        (1, 1, 1, 0)
    );
}

#[tokio::test]
async fn test_export_snapshot() {
    let server = create_test_server();
    create_node(&server, "Dune", "book").await;

    let response = server.get("/export").await;
    response.assert_status_ok();
    let snapshot: Snapshot = response.json();
    assert_eq!(snapshot.nodes.len(), 1);
    assert_eq!(snapshot.nodes[0].title, "Dune");
}

// =============================================================================
// NODE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_node_crud() {
    let server = create_test_server();
    let node = create_node(&server, "Dune", "book").await;
    assert_eq!(node.id.0, 1);

    let fetched: Node = server.get("/nodes/1").await.json();
    assert_eq!(fetched, node);

    let response = server
        .patch("/nodes/1")
        .json(&json!({ "title": "Dune Messiah" }))
        .await;
    response.assert_status_ok();
    let modified: Node = response.json();
    assert_eq!(modified.title, "Dune Messiah");
    assert_eq!(modified.kind, "book");

    let listed: Vec<Node> = server.get("/nodes").await.json();
    assert_eq!(listed, vec![modified]);
}

#[tokio::test]
async fn test_node_patch_rejects_null_title() {
    let server = create_test_server();
    create_node(&server, "Dune", "book").await;

    let response = server.patch("/nodes/1").json(&json!({ "title": null })).await;
    assert_error(&response, 400, "invalid_input");
}

#[tokio::test]
async fn test_create_node_empty_title() {
    let server = create_test_server();

    let response = server.post("/nodes").json(&json!({ "title": "" })).await;
    assert_error(&response, 400, "invalid_input");
}

#[tokio::test]
async fn test_missing_node_is_404() {
    let server = create_test_server();

    let response = server.get("/nodes/42").await;
    assert_error(&response, 404, "not_found");
    let body: ErrorResponse = response.json();
    assert!(body.error.contains("42"));
}

#[tokio::test]
async fn test_delete_node_cascades() {
    let server = create_test_server();
    let a = create_node(&server, "a", "book").await;
    let b = create_node(&server, "b", "book").await;
    set_value(&server, a.id.0, "x", json!({ "value": 1 })).await;
    set_value(&server, a.id.0, "x", json!({ "value": 2 })).await;
    server
        .post("/links")
        .json(&json!({ "from": b.id.0, "to": a.id.0 }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.delete(&format!("/nodes/{}", a.id.0)).await;
    response.assert_status_ok();
    let deleted: DeletedNodeResponse = response.json();
    assert_eq!(deleted.node.id, a.id);
    assert_eq!(deleted.elements.len(), 1);
    assert_eq!(deleted.elements[0].versions.len(), 2);
    assert_eq!(deleted.links.len(), 1);

    server
        .get(&format!("/nodes/{}", a.id.0))
        .await
        .assert_status_not_found();
    let links: Vec<Link> = server
        .get(&format!("/nodes/{}/links", b.id.0))
        .await
        .json();
    assert!(links.is_empty());
}

// =============================================================================
// ELEMENT & VERSION ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_typed_value_round_trip() {
    let server = create_test_server();
    let dune = create_node(&server, "Dune", "book").await;

    let response = set_value(
        &server,
        dune.id.0,
        "published",
        json!({ "value_type": "datetime", "value_json": "1965-08-01T00:00:00" }),
    )
    .await;
    response.assert_status_ok();
    let version: VersionJson = response.json();
    assert_eq!(version.value_type, ValueKind::DateTime);
    assert_eq!(version.value_json, json!("1965-08-01T00:00:00"));
    assert!(version.current);
}

#[tokio::test]
async fn test_bare_value_is_classified() {
    let server = create_test_server();
    let dune = create_node(&server, "Dune", "book").await;

    let cases = [
        ("a", json!(null), ValueKind::None),
        ("b", json!(true), ValueKind::Bool),
        ("c", json!(7), ValueKind::Int),
        ("d", json!(0.5), ValueKind::Float),
        ("e", json!("2020-01-01"), ValueKind::String),
    ];
    for (name, value, kind) in cases {
        let response = set_value(&server, dune.id.0, name, json!({ "value": value })).await;
        response.assert_status_ok();
        let version: VersionJson = response.json();
        assert_eq!(version.value_type, kind, "element {}", name);
    }
}

#[tokio::test]
async fn test_unsupported_value_is_400() {
    let server = create_test_server();
    let dune = create_node(&server, "Dune", "book").await;

    let response = set_value(&server, dune.id.0, "tags", json!({ "value": [1, 2] })).await;
    assert_error(&response, 400, "unsupported_type");

    let response = set_value(
        &server,
        dune.id.0,
        "year",
        json!({ "value_type": "int", "value_json": "1965" }),
    )
    .await;
    assert_error(&response, 400, "invalid_input");
}

#[tokio::test]
async fn test_type_change_needs_override() {
    let server = create_test_server();
    let dune = create_node(&server, "Dune", "book").await;
    set_value(&server, dune.id.0, "rating", json!({ "value": 5 }))
        .await
        .assert_status_ok();

    let response = set_value(&server, dune.id.0, "rating", json!({ "value": 4.5 })).await;
    assert_error(&response, 428, "value_type_change");
    let body: ErrorResponse = response.json();
    assert!(body.error.contains("allow_type_change"));

    let response = set_value(
        &server,
        dune.id.0,
        "rating",
        json!({ "value": 4.5, "allow_type_change": true }),
    )
    .await;
    response.assert_status_ok();
    let version: VersionJson = response.json();
    assert_eq!(version.id, 2);
    assert_eq!(version.value_type, ValueKind::Float);

    let history: Vec<VersionJson> = server.get("/elements/1/versions").await.json();
    let flags: Vec<bool> = history.iter().map(|v| v.current).collect();
    assert_eq!(flags, vec![false, true]);
    assert_eq!(history[0].value_type, ValueKind::Int);
}

#[tokio::test]
async fn test_create_element_conflict() {
    let server = create_test_server();
    let dune = create_node(&server, "Dune", "book").await;
    let path = format!("/nodes/{}/elements", dune.id.0);

    let response = server
        .post(&path)
        .json(&json!({ "name": "author", "value": "Herbert" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let element: ElementJson = response.json();
    assert_eq!(element.versions.len(), 1);
    assert_eq!(element.versions[0].value_json, json!("Herbert"));

    let response = server
        .post(&path)
        .json(&json!({ "name": "author", "value": "Frank" }))
        .await;
    assert_error(&response, 409, "duplicate_element_name");
}

#[tokio::test]
async fn test_elements_history_modes() {
    let server = create_test_server();
    let dune = create_node(&server, "Dune", "book").await;
    for year in [1965, 1966] {
        set_value(&server, dune.id.0, "year", json!({ "value": year })).await;
    }
    let path = format!("/nodes/{}/elements", dune.id.0);

    let all: Vec<ElementJson> = server
        .get(&path)
        .add_query_param("versions", "all")
        .await
        .json();
    assert_eq!(all[0].versions.len(), 2);

    let current: Vec<ElementJson> = server.get(&path).await.json();
    assert_eq!(current[0].versions.len(), 1);
    assert_eq!(current[0].versions[0].value_json, json!(1966));

    let none: Vec<ElementJson> = server
        .get(&path)
        .add_query_param("versions", "none")
        .await
        .json();
    assert!(none[0].versions.is_empty());

    let single: ElementJson = server
        .get("/elements/1")
        .add_query_param("versions", "single")
        .await
        .json();
    assert_eq!(single.versions.len(), 1);
}

#[tokio::test]
async fn test_summary_lists_current_values() {
    let server = create_test_server();
    let dune = create_node(&server, "Dune", "book").await;
    set_value(&server, dune.id.0, "rating", json!({ "value": 5 })).await;
    set_value(&server, dune.id.0, "seen", json!({ "value": false })).await;

    let summary: Vec<SummaryJson> = server
        .get(&format!("/nodes/{}/summary", dune.id.0))
        .await
        .json();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].name, "rating");
    assert_eq!(summary[0].value_json, json!(5));
    assert_eq!(summary[1].value_type, ValueKind::Bool);
}

#[tokio::test]
async fn test_rename_and_append_version() {
    let server = create_test_server();
    let dune = create_node(&server, "Dune", "book").await;
    set_value(&server, dune.id.0, "autor", json!({ "value": "Herbert" })).await;

    let response = server
        .patch("/elements/1")
        .json(&json!({ "name": "author", "todo": true }))
        .await;
    response.assert_status_ok();
    let element: ElementJson = response.json();
    assert_eq!(element.name, "author");
    assert!(element.todo);

    let response = server
        .post("/elements/1/versions")
        .json(&json!({ "value_type": "str", "value_json": "Frank Herbert" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let version: VersionJson = response.json();
    assert_eq!(version.id, 2);
    assert!(version.current);
}

#[tokio::test]
async fn test_delete_current_version_promotes() {
    let server = create_test_server();
    let dune = create_node(&server, "Dune", "book").await;
    set_value(&server, dune.id.0, "x", json!({ "value": 1 })).await;
    set_value(&server, dune.id.0, "x", json!({ "value": 2 })).await;

    let deleted: VersionJson = server.delete("/versions/2").await.json();
    assert!(deleted.current);

    let v1: VersionJson = server.get("/versions/1").await.json();
    assert!(v1.current);
    server.get("/versions/2").await.assert_status_not_found();
}

#[tokio::test]
async fn test_delete_element() {
    let server = create_test_server();
    let dune = create_node(&server, "Dune", "book").await;
    set_value(&server, dune.id.0, "x", json!({ "value": 1 })).await;

    let deleted: ElementJson = server.delete("/elements/1").await.json();
    assert_eq!(deleted.name, "x");
    assert_eq!(deleted.versions.len(), 1);
    server.get("/elements/1").await.assert_status_not_found();
    server.get("/versions/1").await.assert_status_not_found();
}

// =============================================================================
// LINK ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_link_crud() {
    let server = create_test_server();
    let a = create_node(&server, "a", "").await;
    let b = create_node(&server, "b", "").await;

    let response = server
        .post("/links")
        .json(&json!({ "from": a.id.0, "to": b.id.0, "label": "sequel" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let link: Link = response.json();
    assert!(link.directed);
    assert_eq!(link.label.as_deref(), Some("sequel"));

    let response = server
        .patch("/links/1")
        .json(&json!({ "label": null, "directed": false }))
        .await;
    response.assert_status_ok();
    let link: Link = response.json();
    assert!(link.label.is_none());
    assert!(!link.directed);

    let listed: Vec<Link> = server.get("/links").await.json();
    assert_eq!(listed.len(), 1);

    server.delete("/links/1").await.assert_status_ok();
    server.get("/links/1").await.assert_status_not_found();
}

#[tokio::test]
async fn test_dangling_link_is_404() {
    let server = create_test_server();
    let a = create_node(&server, "a", "").await;

    let response = server
        .post("/links")
        .json(&json!({ "from": a.id.0, "to": 99 }))
        .await;
    assert_error(&response, 404, "not_found");
}

// =============================================================================
// AGGREGATION ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_most_used() {
    let server = create_test_server();
    let first = create_node(&server, "first", "book").await;
    let second = create_node(&server, "second", "book").await;
    for (node, name) in [(first.id.0, "title"), (first.id.0, "author"), (second.id.0, "title")] {
        set_value(&server, node, name, json!({ "value": null })).await;
    }

    let response = server
        .get("/kinds/book/most-used")
        .add_query_param("limit", 1)
        .await;
    response.assert_status_ok();
    let body: MostUsedResponse = response.json();
    assert_eq!(body.kind, "book");
    assert_eq!(body.names.len(), 1);
    assert_eq!(body.names[0].name, "title");
    assert_eq!(body.names[0].count, 2);

    let response = server
        .get("/kinds/book/most-used")
        .add_query_param("limit", 0)
        .await;
    assert_error(&response, 400, "invalid_input");
}

// =============================================================================
// ERROR HANDLING TESTS
// =============================================================================

#[tokio::test]
async fn test_404_on_unknown_endpoint() {
    let server = create_test_server();

    server.get("/unknown").await.assert_status_not_found();
}

#[tokio::test]
async fn test_method_not_allowed() {
    let server = create_test_server();

    // /health is GET only
    let response = server.post("/health").await;
    assert_eq!(response.status_code().as_u16(), 405);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let server = create_test_server();

    let response = server
        .post("/nodes")
        .text("not valid json")
        .content_type("application/json")
        .await;

    assert_error(&response, 400, "invalid_request");
}

#[tokio::test]
async fn test_missing_body_field_is_json_error() {
    let server = create_test_server();

    let response = server.post("/nodes").json(&json!({ "kind": "book" })).await;

    assert_error(&response, 422, "invalid_request");
}

#[tokio::test]
async fn test_malformed_path_id_is_json_error() {
    let server = create_test_server();

    let response = server.get("/nodes/abc").await;

    assert_error(&response, 400, "invalid_request");
}

#[tokio::test]
async fn test_malformed_query_is_json_error() {
    let server = create_test_server();
    let node = create_node(&server, "Dune", "book").await;

    let response = server
        .get(&format!("/nodes/{}/elements", node.id.0))
        .add_query_param("versions", "sometimes")
        .await;
    assert_error(&response, 400, "invalid_request");

    let response = server
        .get("/kinds/book/most-used")
        .add_query_param("limit", "many")
        .await;
    assert_error(&response, 400, "invalid_request");
}

// =============================================================================
// MIDDLEWARE TESTS
// =============================================================================

fn create_auth_test_server(api_key: &str) -> TestServer {
    let config = ServerConfig {
        api_key: Some(api_key.to_string()),
        ..open_config()
    };
    let router = create_router(AppState::new(Store::in_memory()), &config);
    TestServer::new(router).unwrap()
}

fn bearer(key: &str) -> HeaderValue {
    format!("Bearer {}", key).parse().unwrap()
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let server = create_auth_test_server("test-secret-key-12345");

    let response = server
        .get("/status")
        .add_header(header::AUTHORIZATION, bearer("test-secret-key-12345"))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server
        .get("/nodes")
        .add_header(header::AUTHORIZATION, bearer("wrong-key"))
        .await;

    assert_error(&response, 401, "unauthorized");
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let server = create_auth_test_server("required-key");

    let response = server.get("/status").await;

    assert_error(&response, 401, "unauthorized");
}

#[tokio::test]
async fn test_auth_raw_token_rejected() {
    let server = create_auth_test_server("raw-key");

    let response = server
        .get("/status")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("raw-key"))
        .await;

    assert_eq!(response.status_code().as_u16(), 401);
}

#[tokio::test]
async fn test_auth_health_endpoint_bypasses_auth() {
    let server = create_auth_test_server("secret-key-for-bypass-test");

    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let config = ServerConfig {
        rate_limit: 1,
        ..ServerConfig::default()
    };
    let server = TestServer::new(create_router(AppState::new(Store::in_memory()), &config)).unwrap();

    server.get("/health").await.assert_status_ok();
    let response = server.get("/health").await;
    assert_error(&response, 429, "rate_limited");
}
