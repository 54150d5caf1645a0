//! # DenseEdia HTTP API
//!
//! REST front end over the store, built on axum.
//!
//! ## Endpoints
//!
//! - `GET /health`, `GET /status`, `GET /export`
//! - `GET|POST /nodes`, `GET|PATCH|DELETE /nodes/{id}`
//! - `GET|POST /nodes/{id}/elements`, `PUT /nodes/{id}/elements/{name}`
//! - `GET /nodes/{id}/summary`, `GET /nodes/{id}/links`
//! - `GET|PATCH|DELETE /elements/{id}`, `GET|POST /elements/{id}/versions`
//! - `GET|DELETE /versions/{id}`
//! - `GET|POST /links`, `GET|PATCH|DELETE /links/{id}`
//! - `GET /kinds/{kind}/most-used`
//!
//! ## Security
//!
//! Settings come from [`ServerConfig`]: allowed CORS origins (localhost
//! only by default), a global rate limit and an optional bearer key.

mod auth;
mod error;
mod extract;
mod handlers;
mod middleware;
mod types;

pub use auth::keys_match;
pub use error::ApiError;
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    CreateElementRequest, CreateLinkRequest, DeletedNodeResponse, ElementJson,
    ElementPatchRequest, ErrorResponse, HealthResponse, LinkPatchRequest, MostUsedQuery,
    MostUsedResponse, NameCount, NodePatchRequest, StatusResponse, SummaryJson, ValueInput,
    VersionJson, VersionsQuery,
};

use crate::config::ServerConfig;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, put},
};
use denseedia_core::{DenseError, Store};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body (2 MiB).
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }
}

// =============================================================================
// CORS
// =============================================================================

const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

const LOCALHOST_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:8080",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8080",
];

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// `["*"]` allows any origin, an empty list allows localhost only.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: allowing ALL origins; do not expose this server publicly");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(hv) => Some(hv),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "CORS: ignoring invalid origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        tracing::info!("CORS: localhost origins only");
        let localhost = LOCALHOST_ORIGINS
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        return restricted_cors(localhost);
    }
    tracing::info!(count = parsed.len(), "CORS: allowing configured origins");
    restricted_cors(parsed)
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the router with every route and the middleware stack.
///
/// Layers, outermost first: tracing, CORS, body limit, rate limit,
/// authentication.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/export", get(handlers::export_handler))
        .route(
            "/nodes",
            get(handlers::list_nodes_handler).post(handlers::create_node_handler),
        )
        .route(
            "/nodes/{id}",
            get(handlers::get_node_handler)
                .patch(handlers::modify_node_handler)
                .delete(handlers::delete_node_handler),
        )
        .route(
            "/nodes/{id}/elements",
            get(handlers::node_elements_handler).post(handlers::create_element_handler),
        )
        .route(
            "/nodes/{id}/elements/{name}",
            put(handlers::set_value_handler),
        )
        .route("/nodes/{id}/summary", get(handlers::node_summary_handler))
        .route("/nodes/{id}/links", get(handlers::node_links_handler))
        .route(
            "/elements/{id}",
            get(handlers::get_element_handler)
                .patch(handlers::modify_element_handler)
                .delete(handlers::delete_element_handler),
        )
        .route(
            "/elements/{id}/versions",
            get(handlers::history_handler).post(handlers::append_version_handler),
        )
        .route(
            "/versions/{id}",
            get(handlers::get_version_handler).delete(handlers::delete_version_handler),
        )
        .route(
            "/links",
            get(handlers::list_links_handler).post(handlers::create_link_handler),
        )
        .route(
            "/links/{id}",
            get(handlers::get_link_handler)
                .patch(handlers::modify_link_handler)
                .delete(handlers::delete_link_handler),
        )
        .route("/kinds/{kind}/most-used", get(handlers::most_used_handler));

    match config.api_key.as_deref() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                Arc::<str>::from(key),
                auth::api_key_auth_middleware,
            ));
        }
        None => tracing::warn!(
            "API key authentication DISABLED; set DENSEEDIA_API_KEY to require a bearer key"
        ),
    }

    match create_rate_limiter(config.rate_limit) {
        Some(limiter) => {
            tracing::info!(rps = config.rate_limit, "rate limiting enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("rate limiting disabled"),
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&config.cors_origins))
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve `store` on `config.host:config.port` until Ctrl+C.
pub async fn run_server(store: Store, config: &ServerConfig) -> Result<(), DenseError> {
    let router = create_router(AppState::new(store), config);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DenseError::IoError(format!("Bind {} failed: {}", addr, e)))?;

    tracing::info!(%addr, "DenseEdia HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DenseError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
