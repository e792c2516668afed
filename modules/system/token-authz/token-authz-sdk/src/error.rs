//! Error types for the token `AuthZ` module.

use thiserror::Error;

/// Errors surfaced to request handlers.
///
/// Resolution and ACL failures all collapse into `Unauthorized`; the
/// underlying cause is logged by the module and never carried here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenAuthzError {
    /// The token is missing, invalid or expired, or the requested resources
    /// are not available to it.
    #[error("unauthorized")]
    Unauthorized,

    /// Authorization succeeded but the infrastructure failed afterwards.
    #[error("internal error: {0}")]
    Internal(String),
}
