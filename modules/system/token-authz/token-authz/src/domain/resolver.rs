//! Cache-aside authorization resolver.
//!
//! `read → (miss: introspect + write) → read → parse`. Concurrent resolutions
//! of the same uncached token are not ordered against each other: each may
//! observe the miss, call the authority and write the cache, and the last
//! write wins. With `dedupe_inflight` enabled, concurrent misses on one token
//! await a single shared introspection instead.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use token_authz_sdk::{AuthorizedSet, Token};
use tracing::debug;

use super::error::DomainError;
use super::introspection::Introspector;
use super::payload::AuthorizationPayload;
use super::ports::CacheStore;

type PendingIntrospection = Shared<BoxFuture<'static, Result<(), Arc<DomainError>>>>;

/// Resolves a token to the identifiers its grants cover.
pub struct AuthorizationResolver {
    cache: Arc<dyn CacheStore>,
    introspector: Introspector,
    inflight: Option<DashMap<String, PendingIntrospection>>,
}

impl AuthorizationResolver {
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>, introspector: Introspector, dedupe_inflight: bool) -> Self {
        Self {
            cache,
            introspector,
            inflight: dedupe_inflight.then(DashMap::new),
        }
    }

    /// Resolve `token` to its authorized set.
    ///
    /// # Errors
    ///
    /// Any cache, authority or payload failure. Callers collapse all of them
    /// into an authorization denial.
    #[tracing::instrument(skip_all)]
    pub async fn resolve(&self, token: &Token) -> Result<AuthorizedSet, DomainError> {
        let key = token.expose();

        if self.cache.get(key).await?.is_none() {
            debug!("token not cached, introspecting");
            self.introspect(token).await?;
        }

        // Decisions are always made from the cached copy, never from the
        // introspection response in hand.
        let Some(raw) = self.cache.get(key).await? else {
            return Err(DomainError::NotCached);
        };

        AuthorizationPayload::parse(&raw)?.authorized_set()
    }

    async fn introspect(&self, token: &Token) -> Result<(), DomainError> {
        let Some(inflight) = &self.inflight else {
            return self.introspector.introspect(token).await.map(drop);
        };

        let key = token.expose();
        let pending = match inflight.entry(key.to_owned()) {
            Entry::Occupied(entry) => {
                debug!("joining in-flight introspection");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let introspector = self.introspector.clone();
                let token = token.clone();
                let pending = async move {
                    introspector
                        .introspect(&token)
                        .await
                        .map(drop)
                        .map_err(Arc::new)
                }
                .boxed()
                .shared();
                entry.insert(pending.clone());
                pending
            }
        };

        let result = pending.clone().await;
        inflight.remove_if(key, |_, current| current.ptr_eq(&pending));
        result.map_err(DomainError::Coalesced)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use token_authz_sdk::ResourceId;

    use super::*;
    use crate::domain::test_support::{AuthorityScript, CountingCache, ScriptedAuthority};

    const PAYLOAD: &str = r#"{"request":[{"id":"example.com/sha/owner/cat/a"},{"id":"example.com/sha/owner/cat/b"}]}"#;

    fn resolver(
        cache: &Arc<CountingCache>,
        authority: &Arc<ScriptedAuthority>,
        dedupe: bool,
    ) -> AuthorizationResolver {
        let introspector = Introspector::new(
            authority.clone(),
            cache.clone(),
            Duration::from_secs(5),
        );
        AuthorizationResolver::new(cache.clone(), introspector, dedupe)
    }

    #[tokio::test]
    async fn miss_introspects_and_populates_cache() {
        let cache = Arc::new(CountingCache::default());
        let authority = Arc::new(ScriptedAuthority::new(AuthorityScript::Grant(PAYLOAD)));
        let resolver = resolver(&cache, &authority, false);

        let set = resolver.resolve(&Token::new("t1")).await.unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.contains(&ResourceId::from("example.com/sha/owner/cat/a")));
        assert_eq!(cache.value("t1").as_deref(), Some(PAYLOAD));
        assert_eq!(cache.writes(), 1);
        assert_eq!(cache.reads(), 2);
        assert_eq!(authority.calls(), 1);
    }

    #[tokio::test]
    async fn hit_skips_authority() {
        let cache = Arc::new(CountingCache::default());
        cache.seed("t1", PAYLOAD);
        let authority = Arc::new(ScriptedAuthority::new(AuthorityScript::Reject(401)));
        let resolver = resolver(&cache, &authority, false);

        let set = resolver.resolve(&Token::new("t1")).await.unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(authority.calls(), 0);
        assert_eq!(cache.writes(), 0);
    }

    #[tokio::test]
    async fn rejection_leaves_cache_absent() {
        let cache = Arc::new(CountingCache::default());
        let authority = Arc::new(ScriptedAuthority::new(AuthorityScript::Reject(403)));
        let resolver = resolver(&cache, &authority, false);

        let err = resolver.resolve(&Token::new("t1")).await.unwrap_err();

        assert!(matches!(err, DomainError::AuthorityRejected { status: 403 }));
        assert_eq!(cache.value("t1"), None);
        assert_eq!(cache.writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_authority_times_out() {
        let cache = Arc::new(CountingCache::default());
        let authority = Arc::new(ScriptedAuthority::new(AuthorityScript::Hang));
        let introspector =
            Introspector::new(authority.clone(), cache.clone(), Duration::from_millis(200));
        let resolver = AuthorizationResolver::new(cache.clone(), introspector, false);

        let err = resolver.resolve(&Token::new("t1")).await.unwrap_err();

        assert!(matches!(err, DomainError::Timeout(_)));
        assert_eq!(cache.value("t1"), None);
    }

    #[tokio::test]
    async fn cached_payload_without_grants_is_rejected() {
        let cache = Arc::new(CountingCache::default());
        cache.seed("t1", r#"{"request":[]}"#);
        let authority = Arc::new(ScriptedAuthority::new(AuthorityScript::Grant(PAYLOAD)));
        let resolver = resolver(&cache, &authority, false);

        let err = resolver.resolve(&Token::new("t1")).await.unwrap_err();
        assert!(matches!(err, DomainError::NoGrants));
    }

    #[tokio::test]
    async fn entry_vanishing_before_second_read_is_not_cached() {
        let cache = Arc::new(CountingCache::dropping_writes());
        let authority = Arc::new(ScriptedAuthority::new(AuthorityScript::Grant(PAYLOAD)));
        let resolver = resolver(&cache, &authority, false);

        let err = resolver.resolve(&Token::new("t1")).await.unwrap_err();
        assert!(matches!(err, DomainError::NotCached));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_both_succeed_with_duplicate_calls() {
        let cache = Arc::new(CountingCache::default());
        let authority = Arc::new(
            ScriptedAuthority::new(AuthorityScript::Grant(PAYLOAD))
                .with_delay(Duration::from_millis(50)),
        );
        let resolver = resolver(&cache, &authority, false);
        let token = Token::new("t1");

        let (first, second) = tokio::join!(resolver.resolve(&token), resolver.resolve(&token));

        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(authority.calls(), 2);
        assert_eq!(cache.writes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_share_one_call_when_deduplicated() {
        let cache = Arc::new(CountingCache::default());
        let authority = Arc::new(
            ScriptedAuthority::new(AuthorityScript::Grant(PAYLOAD))
                .with_delay(Duration::from_millis(50)),
        );
        let resolver = resolver(&cache, &authority, true);
        let token = Token::new("t1");

        let (first, second) = tokio::join!(resolver.resolve(&token), resolver.resolve(&token));

        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(authority.calls(), 1);
        assert_eq!(cache.writes(), 1);
        assert!(resolver.inflight.as_ref().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn deduplicated_rejection_reaches_every_waiter() {
        let cache = Arc::new(CountingCache::default());
        let authority = Arc::new(
            ScriptedAuthority::new(AuthorityScript::Reject(401))
                .with_delay(Duration::from_millis(50)),
        );
        let resolver = resolver(&cache, &authority, true);
        let token = Token::new("t1");

        let (first, second) = tokio::join!(resolver.resolve(&token), resolver.resolve(&token));

        assert!(matches!(first, Err(DomainError::Coalesced(_))));
        assert!(matches!(second, Err(DomainError::Coalesced(_))));
        assert_eq!(authority.calls(), 1);
    }
}
