//! API Gateway module definition
//!
//! Owns the HTTP server: data-plane routes, static views of provider and
//! consumer storage, and the shared middleware stack.

use std::borrow::Cow;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::{Router, extract::DefaultBodyLimit, middleware::from_fn, routing::get};
use token_authz_sdk::TokenAuthzClient;
use tokio_util::sync::CancellationToken;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
};

use crate::api::rest::{handlers::CONSUMER_PREFIX, routes};
use crate::config::ApiGatewayConfig;
use crate::index::RecordIndex;
use crate::middleware;
use crate::problem::Problem;
use crate::web;

/// URL prefix for the provider's public tree.
pub const PUBLIC_PREFIX: &str = "/provider/public";

/// Filesystem roots behind the static endpoints.
#[derive(Debug, Clone)]
pub struct StaticRoots {
    /// Served under `/consumer`
    pub consumer: PathBuf,
    /// Served under `/provider/public`
    pub public: PathBuf,
}

/// HTTP front door of the exchange.
pub struct ApiGateway {
    config: ApiGatewayConfig,
    authz: Arc<dyn TokenAuthzClient>,
    index: Arc<dyn RecordIndex>,
    static_roots: Option<StaticRoots>,
}

impl ApiGateway {
    #[must_use]
    pub fn new(
        config: ApiGatewayConfig,
        authz: Arc<dyn TokenAuthzClient>,
        index: Arc<dyn RecordIndex>,
    ) -> Self {
        Self {
            config,
            authz,
            index,
            static_roots: None,
        }
    }

    /// Serve consumer views and the public tree as static files.
    ///
    /// Ignored when `serve_static` is off in the configuration.
    #[must_use]
    pub fn with_static_roots(mut self, consumer: PathBuf, public: PathBuf) -> Self {
        self.static_roots = Some(StaticRoots { consumer, public });
        self
    }

    #[must_use]
    pub fn config(&self) -> &ApiGatewayConfig {
        &self.config
    }

    /// Apply all middleware layers to a router (request ID, tracing, timeout, body limit, CORS, MIME validation)
    fn apply_middleware_stack(&self, mut router: Router) -> Router {
        // `Router::layer` wraps what is already there: the last layer added is
        // the outermost and runs first.
        //
        // Request execution order (outermost -> innermost):
        // SetRequestId -> PropagateRequestId -> Trace -> push_req_id_to_extensions
        // -> Timeout -> BodyLimit -> CORS -> MIME validation -> Router
        let config = &self.config;

        // 6) MIME type validation
        let mime_map = middleware::mime_validation::build_mime_validation_map(&routes::route_specs());
        router = router.layer(from_fn(
            move |req: axum::extract::Request, next: axum::middleware::Next| {
                let map = mime_map.clone();
                middleware::mime_validation::mime_validation_middleware(map, req, next)
            },
        ));

        // 5) CORS (outer to MIME validation so OPTIONS preflight short-circuits)
        if config.cors_enabled {
            router = router.layer(crate::cors::build_cors_layer(config));
        }

        // 4) Body limit
        router = router.layer(RequestBodyLimitLayer::new(config.defaults.body_limit_bytes));
        router = router.layer(DefaultBodyLimit::max(config.defaults.body_limit_bytes));

        // 3) Timeout
        router = router.layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            config.defaults.request_timeout,
        ));

        // 2) Record request_id into span + extensions (inner to Trace, which creates the span)
        router = router.layer(from_fn(middleware::request_id::push_req_id_to_extensions));

        // 1) Trace
        router = router.layer({
            use tower_http::trace::TraceLayer;
            use tracing::field::Empty;

            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                    let hdr = middleware::request_id::header();
                    let rid = req
                        .headers()
                        .get(&hdr)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("n/a");

                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        uri = %redact_consumer_path(req.uri().path()),
                        version = ?req.version(),
                        module = "api_gateway",
                        request_id = %rid,
                        status = Empty,
                        latency_ms = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<axum::body::Body>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("status", res.status().as_u16());
                        span.record("latency_ms", latency.as_millis());
                    },
                )
        });

        // 0) Request ID handling: generate when missing, then echo on the response.
        let x_request_id = middleware::request_id::header();
        router = router.layer(PropagateRequestIdLayer::new(x_request_id.clone()));
        router.layer(SetRequestIdLayer::new(
            x_request_id,
            middleware::request_id::MakeReqId,
        ))
    }

    /// Build the complete HTTP router.
    #[must_use]
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(web::health_check))
            .route("/healthz", get(|| async { "ok" }));

        router = routes::register_routes(router, self.authz.clone(), self.index.clone());

        match (&self.static_roots, self.config.serve_static) {
            (Some(roots), true) => {
                tracing::debug!(
                    consumer = %roots.consumer.display(),
                    public = %roots.public.display(),
                    "serving storage trees as static files"
                );
                router = router
                    .nest_service(CONSUMER_PREFIX, ServeDir::new(&roots.consumer))
                    .nest_service(PUBLIC_PREFIX, ServeDir::new(&roots.public));
            }
            (None, true) => tracing::debug!("no static roots configured"),
            (_, false) => tracing::debug!("static file serving disabled"),
        }

        router = router.fallback(not_found);
        self.apply_middleware_stack(router)
    }

    /// Parse bind address from configuration string.
    fn parse_bind_address(bind_addr: &str) -> Result<SocketAddr> {
        bind_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{bind_addr}': {e}"))
    }

    /// Background HTTP server: bind, serve until cancelled.
    ///
    /// # Errors
    /// Returns an error if the address is invalid, binding fails or the
    /// server stops abnormally.
    pub async fn serve(self: Arc<Self>, cancel: CancellationToken) -> Result<()> {
        let addr = Self::parse_bind_address(&self.config.bind_addr)?;
        let router = self.build_router();

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP server bound on {}", addr);

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}

/// Mask the token segment of `/consumer/<token>/...` paths.
fn redact_consumer_path(path: &str) -> Cow<'_, str> {
    let Some(rest) = path
        .strip_prefix(CONSUMER_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return Cow::Borrowed(path);
    };
    match rest.split_once('/') {
        Some((_, tail)) => Cow::Owned(format!("{CONSUMER_PREFIX}/***/{tail}")),
        None if rest.is_empty() => Cow::Borrowed(path),
        None => Cow::Owned(format!("{CONSUMER_PREFIX}/***")),
    }
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    Problem::new(
        StatusCode::NOT_FOUND,
        "Not Found",
        format!("No route for {}", uri.path()),
    )
    .with_instance(uri.path())
}
