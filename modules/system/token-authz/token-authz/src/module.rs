//! Token `AuthZ` module wiring.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use token_authz_sdk::TokenAuthzClient;
use tracing::info;

use crate::config::TokenAuthzConfig;
use crate::domain::evaluator::AccessEvaluator;
use crate::domain::exposure::ResourceExposureManager;
use crate::domain::introspection::Introspector;
use crate::domain::ports::{AuthorityClient, CacheStore, ResourceStorage};
use crate::domain::resolver::AuthorizationResolver;
use crate::domain::{Service, TokenAuthzLocalClient};
use crate::infra::{FsResourceStorage, HttpsAuthorityClient, MemoryCacheStore};

/// Secure files live under this directory of the provider root.
pub const SECURE_DIR: &str = "secure";

/// Token `AuthZ` module.
///
/// Builds the resolver, evaluator and exposure manager from configuration and
/// exposes them through [`TokenAuthzClient`].
pub struct TokenAuthzModule {
    client: Arc<dyn TokenAuthzClient>,
    provider_root: PathBuf,
    consumer_root: PathBuf,
}

impl TokenAuthzModule {
    /// Build the module with the production adapters.
    ///
    /// # Errors
    ///
    /// Invalid introspection settings, or storage roots that cannot be made
    /// absolute.
    #[tracing::instrument(skip_all)]
    pub fn init(cfg: &TokenAuthzConfig) -> anyhow::Result<Self> {
        let authority = Arc::new(HttpsAuthorityClient::new(&cfg.introspection)?);
        info!(
            authority = authority.url(),
            timeout = ?cfg.introspection.timeout,
            dedupe_inflight = cfg.dedupe_inflight,
            "Initializing token_authz module"
        );

        Self::with_ports(
            cfg,
            authority,
            Arc::new(MemoryCacheStore::new(cfg.cache.expiry)),
            Arc::new(FsResourceStorage),
        )
    }

    /// Build the module around caller-supplied adapters.
    ///
    /// # Errors
    ///
    /// Storage roots that cannot be made absolute.
    pub fn with_ports(
        cfg: &TokenAuthzConfig,
        authority: Arc<dyn AuthorityClient>,
        cache: Arc<dyn CacheStore>,
        storage: Arc<dyn ResourceStorage>,
    ) -> anyhow::Result<Self> {
        let provider_root = absolute(&cfg.storage.provider_root)?;
        let consumer_root = absolute(&cfg.storage.consumer_root)?;

        let introspector = Introspector::new(authority, cache.clone(), cfg.introspection.timeout);
        let resolver = Arc::new(AuthorizationResolver::new(
            cache,
            introspector,
            cfg.dedupe_inflight,
        ));
        let exposure = ResourceExposureManager::new(
            storage,
            provider_root.join(SECURE_DIR),
            consumer_root.clone(),
        );
        let svc = Arc::new(Service::new(AccessEvaluator::new(resolver), exposure));

        info!(
            provider_root = %provider_root.display(),
            consumer_root = %consumer_root.display(),
            "token_authz module initialized"
        );

        Ok(Self {
            client: Arc::new(TokenAuthzLocalClient::new(svc)),
            provider_root,
            consumer_root,
        })
    }

    #[must_use]
    pub fn client(&self) -> Arc<dyn TokenAuthzClient> {
        self.client.clone()
    }

    #[must_use]
    pub fn provider_root(&self) -> &Path {
        &self.provider_root
    }

    #[must_use]
    pub fn consumer_root(&self) -> &Path {
        &self.consumer_root
    }
}

fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("cannot resolve {}", path.display()))
}
