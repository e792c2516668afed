//! Token extraction and public/secure request classification.

use axum::http::{HeaderMap, header};
use token_authz_sdk::{RequestedSet, ResourceId, Token};

/// How a request over a set of identifiers must be served.
#[derive(Debug)]
pub enum AccessPlan {
    /// No authorization needed.
    Public,
    /// Authorize `requested` for `token` first; `.public` identifiers are
    /// already filtered out.
    Secure { token: Token, requested: RequestedSet },
}

impl AccessPlan {
    /// Without a token every identifier has already been checked to be
    /// public, so the plan is public. With a token the plan is public only if
    /// every identifier is.
    #[must_use]
    pub fn classify(ids: &[ResourceId], token: Option<Token>) -> Self {
        let Some(token) = token else {
            return Self::Public;
        };
        let requested: RequestedSet = ids.iter().filter(|id| !id.is_public()).cloned().collect();
        if requested.is_empty() {
            Self::Public
        } else {
            Self::Secure { token, requested }
        }
    }
}

/// Token from the `token` query parameter, else from a Bearer header.
/// Empty values count as absent.
#[must_use]
pub fn extract_token(query_token: Option<&str>, headers: &HeaderMap) -> Option<Token> {
    query_token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| extract_bearer_token(headers))
        .map(Token::from)
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(str::trim))
        .filter(|t| !t.is_empty())
}
