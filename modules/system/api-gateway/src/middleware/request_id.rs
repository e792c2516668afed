//! `x-request-id` generation and propagation.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::request_id::{MakeRequestId, RequestId};

/// Request id made available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct XRequestId(pub String);

#[must_use]
pub fn header() -> HeaderName {
    HeaderName::from_static("x-request-id")
}

/// Generates a nanoid for requests arriving without an id.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&nanoid::nanoid!())
            .ok()
            .map(RequestId::new)
    }
}

/// Record the request id on the current span and in request extensions.
pub async fn push_req_id_to_extensions(mut req: Request, next: Next) -> Response {
    let rid = req
        .headers()
        .get(header())
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if let Some(rid) = rid {
        tracing::Span::current().record("request_id", rid.as_str());
        req.extensions_mut().insert(XRequestId(rid));
    }

    next.run(req).await
}
