use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};
use http::Method;
use token_authz_sdk::TokenAuthzClient;

use crate::api::rest::handlers;
use crate::index::RecordIndex;

/// Static description of a REST operation, consumed by the middleware stack.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub method: Method,
    pub path: &'static str,
    /// `None` accepts any request content type.
    pub allowed_request_content_types: Option<&'static [&'static str]>,
}

/// Every data-plane operation the gateway serves.
#[must_use]
pub fn route_specs() -> Vec<RouteSpec> {
    vec![
        RouteSpec {
            method: Method::POST,
            path: "/search",
            allowed_request_content_types: None,
        },
        RouteSpec {
            method: Method::POST,
            path: "/latest",
            allowed_request_content_types: None,
        },
        RouteSpec {
            method: Method::POST,
            path: "/publish",
            allowed_request_content_types: Some(&["application/json"]),
        },
        RouteSpec {
            method: Method::GET,
            path: "/download",
            allowed_request_content_types: None,
        },
    ]
}

/// Register the data-plane routes and their shared state.
pub fn register_routes(
    router: Router,
    authz: Arc<dyn TokenAuthzClient>,
    index: Arc<dyn RecordIndex>,
) -> Router {
    let api = Router::new()
        .route("/search", post(handlers::search))
        .route("/latest", post(handlers::latest))
        .route("/publish", post(handlers::publish))
        .route("/download", get(handlers::download))
        .layer(Extension(authz))
        .layer(Extension(index));

    tracing::debug!(routes = route_specs().len(), "data-plane routes registered");
    router.merge(api)
}
