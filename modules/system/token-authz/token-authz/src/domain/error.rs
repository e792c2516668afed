//! Domain errors for the token `AuthZ` module.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use token_authz_sdk::TokenAuthzError;

/// Internal domain errors.
///
/// Carries the full cause for logging. Conversion into [`TokenAuthzError`]
/// drops it: everything except link-step storage failures becomes
/// `Unauthorized`.
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("cache store failure: {0}")]
    Cache(String),

    #[error("token absent from cache after introspection")]
    NotCached,

    #[error("authority rejected token with status {status}")]
    AuthorityRejected { status: u16 },

    #[error("authority transport failure: {0}")]
    Transport(String),

    #[error("introspection exceeded {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Coalesced(Arc<DomainError>),

    #[error("malformed authorization payload: {0}")]
    MalformedPayload(String),

    #[error("authorization payload carries no grants")]
    NoGrants,

    #[error("{missing} requested resource(s) not granted")]
    AclMismatch { missing: usize },

    #[error("resource '{id}' is not present in provider storage")]
    ResourceAbsent { id: String },

    #[error("unsafe path component in {what}")]
    UnsafePath { what: &'static str },

    #[error("cannot stat {path}: {source}")]
    StorageLookup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage failure at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DomainError {
    /// Whether this is a post-authorization infrastructure fault rather than
    /// an access denial.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Storage { .. } => true,
            Self::Coalesced(inner) => inner.is_internal(),
            _ => false,
        }
    }
}

impl From<DomainError> for TokenAuthzError {
    fn from(e: DomainError) -> Self {
        if e.is_internal() {
            Self::Internal("could not create consumer links".to_owned())
        } else {
            Self::Unauthorized
        }
    }
}
