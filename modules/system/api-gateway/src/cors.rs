//! CORS layer built from configuration.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::config::{ApiGatewayConfig, CorsConfig};

/// Build the CORS layer. Missing detailed config means permissive defaults.
///
/// Credentials are never combined with wildcard origins or headers; such
/// configurations drop `allow_credentials` with a warning.
#[must_use]
pub fn build_cors_layer(cfg: &ApiGatewayConfig) -> CorsLayer {
    let cors = cfg.cors.clone().unwrap_or_default();
    let any_origin = cors.allowed_origins.iter().any(|o| o == "*");
    let any_header = cors.allowed_headers.iter().any(|h| h == "*");

    let origins = if any_origin {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            cors.allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    let headers = if any_header {
        AllowHeaders::any()
    } else {
        AllowHeaders::list(
            cors.allowed_headers
                .iter()
                .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok()),
        )
    };

    let mut layer = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods(&cors))
        .allow_headers(headers)
        .max_age(Duration::from_secs(cors.max_age_seconds));

    if cors.allow_credentials {
        if any_origin || any_header {
            tracing::warn!("CORS allow_credentials ignored: incompatible with wildcard origins or headers");
        } else {
            layer = layer.allow_credentials(true);
        }
    }

    layer
}

fn methods(cors: &CorsConfig) -> Vec<Method> {
    cors.allowed_methods
        .iter()
        .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
        .collect()
}
