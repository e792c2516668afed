//! Public API trait for token authorization.
//!
//! Request handlers consume this trait; the `token_authz` module implements it
//! on top of the cache-aside resolver, the access evaluator and the resource
//! exposure manager.

use async_trait::async_trait;

use crate::error::TokenAuthzError;
use crate::models::{AuthorizedSet, ConsumerView, RequestedSet, ResourceId, Token};

/// Public API trait for token authorization.
///
/// Every identifier passed to this trait is treated as secure-scoped. Callers
/// must route identifiers ending in [`crate::PUBLIC_SUFFIX`] around it.
///
/// ```ignore
/// // Subset check before a secure search or publish
/// authz.authorize(&token, &requested).await?;
///
/// // Bulk download: everything the token may read
/// let ids = authz.authorized_resources(&token).await?;
/// let view = authz.materialize(&token, &ids.to_vec()).await?;
/// ```
#[async_trait]
pub trait TokenAuthzClient: Send + Sync {
    /// Check that every requested identifier is granted to the token.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the token cannot be resolved or a requested
    ///   identifier is not granted. The error never names the identifiers.
    async fn authorize(
        &self,
        token: &Token,
        requested: &RequestedSet,
    ) -> Result<(), TokenAuthzError>;

    /// Return every identifier granted to the token.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the token cannot be resolved
    async fn authorized_resources(&self, token: &Token) -> Result<AuthorizedSet, TokenAuthzError>;

    /// Expose already-authorized secure resources in the token's consumer view.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if any identifier is absent from provider storage
    /// - `Internal` if the view cannot be written
    async fn materialize(
        &self,
        token: &Token,
        ids: &[ResourceId],
    ) -> Result<ConsumerView, TokenAuthzError>;
}
