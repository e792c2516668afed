//! Domain service for the token `AuthZ` module.

use token_authz_sdk::{AuthorizedSet, ConsumerView, RequestedSet, ResourceId, Token};

use super::error::DomainError;
use super::evaluator::AccessEvaluator;
use super::exposure::ResourceExposureManager;

/// Token `AuthZ` service: evaluation plus consumer view materialization.
pub struct Service {
    evaluator: AccessEvaluator,
    exposure: ResourceExposureManager,
}

impl Service {
    #[must_use]
    pub fn new(evaluator: AccessEvaluator, exposure: ResourceExposureManager) -> Self {
        Self {
            evaluator,
            exposure,
        }
    }

    /// # Errors
    ///
    /// See [`AccessEvaluator::authorize`].
    pub async fn authorize(
        &self,
        token: &Token,
        requested: &RequestedSet,
    ) -> Result<(), DomainError> {
        self.evaluator.authorize(token, requested).await
    }

    /// # Errors
    ///
    /// See [`AccessEvaluator::authorized_resources`].
    pub async fn authorized_resources(&self, token: &Token) -> Result<AuthorizedSet, DomainError> {
        self.evaluator.authorized_resources(token).await
    }

    /// # Errors
    ///
    /// See [`ResourceExposureManager::materialize`].
    pub async fn materialize(
        &self,
        token: &Token,
        ids: &[ResourceId],
    ) -> Result<ConsumerView, DomainError> {
        self.exposure.materialize(token, ids).await
    }
}
