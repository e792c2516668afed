//! Access evaluation on top of the resolver.

use std::sync::Arc;

use token_authz_sdk::{AuthorizedSet, RequestedSet, Token};

use super::error::DomainError;
use super::resolver::AuthorizationResolver;

/// Subset-check and enumeration modes over a resolved token.
///
/// Every identifier reaching the evaluator is treated as secure-scoped.
pub struct AccessEvaluator {
    resolver: Arc<AuthorizationResolver>,
}

impl AccessEvaluator {
    #[must_use]
    pub fn new(resolver: Arc<AuthorizationResolver>) -> Self {
        Self { resolver }
    }

    /// Require `authorized(token) ⊇ requested`.
    ///
    /// # Errors
    ///
    /// Resolution failure, or `AclMismatch` carrying only a count.
    #[tracing::instrument(skip_all, fields(requested = requested.len()))]
    pub async fn authorize(
        &self,
        token: &Token,
        requested: &RequestedSet,
    ) -> Result<(), DomainError> {
        let authorized = self.resolver.resolve(token).await?;

        match authorized.count_missing(requested) {
            0 => Ok(()),
            missing => Err(DomainError::AclMismatch { missing }),
        }
    }

    /// Every identifier granted to `token`.
    ///
    /// # Errors
    ///
    /// Resolution failure.
    #[tracing::instrument(skip_all)]
    pub async fn authorized_resources(&self, token: &Token) -> Result<AuthorizedSet, DomainError> {
        self.resolver.resolve(token).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use token_authz_sdk::ResourceId;

    use super::*;
    use crate::domain::introspection::Introspector;
    use crate::domain::test_support::{AuthorityScript, CountingCache, ScriptedAuthority};

    fn evaluator(script: AuthorityScript) -> AccessEvaluator {
        let cache = Arc::new(CountingCache::default());
        let authority = Arc::new(ScriptedAuthority::new(script));
        let introspector = Introspector::new(authority, cache.clone(), Duration::from_secs(5));
        AccessEvaluator::new(Arc::new(AuthorizationResolver::new(
            cache,
            introspector,
            false,
        )))
    }

    #[tokio::test]
    async fn subset_is_authorized() {
        let evaluator = evaluator(AuthorityScript::Grant(r#"{"request":["a","b"]}"#));
        let requested: RequestedSet = ["a"].into_iter().collect();

        evaluator
            .authorize(&Token::new("t"), &requested)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn partial_overlap_is_denied_with_count_only() {
        let evaluator = evaluator(AuthorityScript::Grant(r#"{"request":["a","b"]}"#));
        let requested: RequestedSet = ["a", "hidden-id"].into_iter().collect();

        let err = evaluator
            .authorize(&Token::new("t"), &requested)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::AclMismatch { missing: 1 }));
        assert!(!err.to_string().contains("hidden-id"));
    }

    #[tokio::test]
    async fn unresolvable_token_is_denied() {
        let evaluator = evaluator(AuthorityScript::Reject(401));
        let requested: RequestedSet = ["a"].into_iter().collect();

        assert!(
            evaluator
                .authorize(&Token::new("t"), &requested)
                .await
                .is_err()
        );
        assert!(
            evaluator
                .authorized_resources(&Token::new("t"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn enumeration_returns_deduplicated_set() {
        let evaluator = evaluator(AuthorityScript::Grant(
            r#"{"request":[{"id":"a"},{"id":"b"},{"id":"a"}]}"#,
        ));

        let set = evaluator
            .authorized_resources(&Token::new("t"))
            .await
            .unwrap();

        assert_eq!(
            set.to_vec(),
            vec![ResourceId::from("a"), ResourceId::from("b")]
        );
    }
}
