//! Introspection contract: bounded call to the authority, then cache write.

use std::sync::Arc;
use std::time::Duration;

use token_authz_sdk::Token;
use tracing::debug;

use super::error::DomainError;
use super::ports::{AuthorityClient, CacheStore};

/// Calls the authority and persists a successful payload under the token.
#[derive(Clone)]
pub struct Introspector {
    authority: Arc<dyn AuthorityClient>,
    cache: Arc<dyn CacheStore>,
    timeout: Duration,
}

impl Introspector {
    #[must_use]
    pub fn new(
        authority: Arc<dyn AuthorityClient>,
        cache: Arc<dyn CacheStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            authority,
            cache,
            timeout,
        }
    }

    /// Introspect `token` and cache the payload verbatim.
    ///
    /// # Errors
    ///
    /// - `Timeout` when the authority does not answer within the bound
    /// - any rejection or transport error from the authority
    /// - `Cache` if the payload cannot be stored
    #[tracing::instrument(skip_all)]
    pub async fn introspect(&self, token: &Token) -> Result<String, DomainError> {
        let payload = tokio::time::timeout(self.timeout, self.authority.introspect(token))
            .await
            .map_err(|_| DomainError::Timeout(self.timeout))??;

        self.cache.set(token.expose(), payload.clone()).await?;
        debug!(bytes = payload.len(), "authorization payload cached");

        Ok(payload)
    }
}
