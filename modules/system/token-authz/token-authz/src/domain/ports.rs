//! Boundaries the domain depends on. Implementations live in `infra`.

use std::path::Path;

use async_trait::async_trait;
use token_authz_sdk::Token;

use super::error::DomainError;

/// Token → authorization payload store.
///
/// No read-modify-write and no locking: concurrent `set`s on one key are
/// last-writer-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    async fn set(&self, key: &str, value: String) -> Result<(), DomainError>;
}

/// Transport to the remote introspection authority.
#[async_trait]
pub trait AuthorityClient: Send + Sync {
    /// Returns the raw payload body of a `200` response. Every other outcome
    /// is an error.
    async fn introspect(&self, token: &Token) -> Result<String, DomainError>;
}

/// Outcome of a link request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Created,
    AlreadyExists,
}

/// Filesystem capability used by the exposure manager.
#[async_trait]
pub trait ResourceStorage: Send + Sync {
    async fn exists(&self, path: &Path) -> Result<bool, DomainError>;

    async fn mkdir_all(&self, path: &Path) -> Result<(), DomainError>;

    /// Create `link` pointing at `target`.
    async fn link(&self, target: &Path, link: &Path) -> Result<LinkOutcome, DomainError>;
}
