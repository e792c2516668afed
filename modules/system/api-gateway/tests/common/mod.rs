//! Shared fixtures for gateway integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use api_gateway::{ApiGateway, ApiGatewayConfig, InMemoryRecordIndex, RecordIndex};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use token_authz_sdk::{
    AuthorizedSet, ConsumerView, RequestedSet, ResourceId, Token, TokenAuthzClient,
    TokenAuthzError,
};

pub const SECURE_ID: &str = "example.com/sha/owner/weather/station1";
pub const OTHER_SECURE_ID: &str = "example.com/sha/owner/weather/station2";
pub const PUBLIC_ID: &str = "example.com/sha/owner/weather/station9.public";

/// Grants keyed by token; unknown tokens are unauthorized.
#[derive(Default)]
pub struct StaticAuthz {
    grants: HashMap<String, AuthorizedSet>,
    consumer_root: PathBuf,
    authorize_calls: AtomicUsize,
    materialized: Mutex<Vec<ResourceId>>,
}

impl StaticAuthz {
    pub fn new(consumer_root: impl Into<PathBuf>) -> Self {
        Self {
            consumer_root: consumer_root.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn grant(mut self, token: &str, ids: &[&str]) -> Self {
        self.grants.insert(
            token.to_owned(),
            ids.iter().copied().map(ResourceId::from).collect(),
        );
        self
    }

    pub fn authorize_calls(&self) -> usize {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    pub fn materialized(&self) -> Vec<ResourceId> {
        self.materialized.lock().unwrap().clone()
    }

    fn resolve(&self, token: &Token) -> Result<&AuthorizedSet, TokenAuthzError> {
        self.grants
            .get(token.expose())
            .ok_or(TokenAuthzError::Unauthorized)
    }
}

#[async_trait]
impl TokenAuthzClient for StaticAuthz {
    async fn authorize(
        &self,
        token: &Token,
        requested: &RequestedSet,
    ) -> Result<(), TokenAuthzError> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        if self.resolve(token)?.covers(requested) {
            Ok(())
        } else {
            Err(TokenAuthzError::Unauthorized)
        }
    }

    async fn authorized_resources(&self, token: &Token) -> Result<AuthorizedSet, TokenAuthzError> {
        self.resolve(token).cloned()
    }

    async fn materialize(
        &self,
        token: &Token,
        ids: &[ResourceId],
    ) -> Result<ConsumerView, TokenAuthzError> {
        self.materialized.lock().unwrap().extend_from_slice(ids);
        Ok(ConsumerView::new(
            self.consumer_root.join(token.expose()),
            ids.iter().map(|id| id.leaf_name().to_owned()).collect(),
        ))
    }
}

pub struct Harness {
    pub authz: Arc<StaticAuthz>,
    pub index: Arc<InMemoryRecordIndex>,
    pub router: axum::Router,
}

pub fn harness(authz: StaticAuthz) -> Harness {
    harness_with(authz, ApiGatewayConfig::default(), None)
}

pub fn harness_with(
    authz: StaticAuthz,
    config: ApiGatewayConfig,
    static_roots: Option<(PathBuf, PathBuf)>,
) -> Harness {
    let authz = Arc::new(authz);
    let index = Arc::new(InMemoryRecordIndex::new());

    let mut gateway = ApiGateway::new(
        config,
        authz.clone() as Arc<dyn TokenAuthzClient>,
        index.clone() as Arc<dyn RecordIndex>,
    );
    if let Some((consumer, public)) = static_roots {
        gateway = gateway.with_static_roots(consumer, public);
    }

    Harness {
        authz,
        index,
        router: gateway.build_router(),
    }
}

pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
