//! Local (in-process) client for the token `AuthZ` module.

use std::sync::Arc;

use async_trait::async_trait;
use token_authz_sdk::{
    AuthorizedSet, ConsumerView, RequestedSet, ResourceId, Token, TokenAuthzClient,
    TokenAuthzError,
};

use super::{DomainError, Service};

/// Local client wrapping the service.
pub struct TokenAuthzLocalClient {
    svc: Arc<Service>,
}

impl TokenAuthzLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }
}

// Denials are routine and stay at debug; only infrastructure faults are errors.
fn log_and_convert(op: &str, e: DomainError) -> TokenAuthzError {
    if e.is_internal() {
        tracing::error!(operation = op, error = %e, "token_authz call failed");
    } else {
        tracing::debug!(operation = op, error = %e, "token_authz denied request");
    }
    e.into()
}

#[async_trait]
impl TokenAuthzClient for TokenAuthzLocalClient {
    async fn authorize(
        &self,
        token: &Token,
        requested: &RequestedSet,
    ) -> Result<(), TokenAuthzError> {
        self.svc
            .authorize(token, requested)
            .await
            .map_err(|e| log_and_convert("authorize", e))
    }

    async fn authorized_resources(&self, token: &Token) -> Result<AuthorizedSet, TokenAuthzError> {
        self.svc
            .authorized_resources(token)
            .await
            .map_err(|e| log_and_convert("authorized_resources", e))
    }

    async fn materialize(
        &self,
        token: &Token,
        ids: &[ResourceId],
    ) -> Result<ConsumerView, TokenAuthzError> {
        self.svc
            .materialize(token, ids)
            .await
            .map_err(|e| log_and_convert("materialize", e))
    }
}
