//! Authorization payload returned by the authority and cached per token.
//!
//! Observed authorities send grants either as plain identifier strings or as
//! objects with an `id` field plus optional constraints. Both resolve to the
//! same identifier set here; the constraints are kept but not enforced.

use serde::Deserialize;
use token_authz_sdk::{AuthorizedSet, ResourceId};
use tracing::trace;

use super::error::DomainError;

/// One grant inside a payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Grant {
    PlainId(String),
    Detailed(DetailedGrant),
}

/// Grant object form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetailedGrant {
    pub id: String,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub apis: Vec<String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl Grant {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::PlainId(id) => id,
            Self::Detailed(grant) => &grant.id,
        }
    }

    fn has_constraints(&self) -> bool {
        match self {
            Self::PlainId(_) => false,
            Self::Detailed(grant) => {
                !grant.methods.is_empty() || !grant.apis.is_empty() || grant.body.is_some()
            }
        }
    }
}

/// `grants` is accepted in place of `request`. A document carrying both keys
/// is a duplicate field and is rejected as malformed.
#[derive(Deserialize)]
struct RawPayload {
    #[serde(alias = "grants")]
    request: Option<Vec<Grant>>,
}

/// Parsed authorization payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationPayload {
    grants: Vec<Grant>,
}

impl AuthorizationPayload {
    /// Parse a cached payload.
    ///
    /// # Errors
    ///
    /// `MalformedPayload` if the document is not JSON, has no grant list, or
    /// a grant has an empty identifier.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let payload: RawPayload = serde_json::from_str(raw)
            .map_err(|e| DomainError::MalformedPayload(e.to_string()))?;

        let grants = payload
            .request
            .ok_or_else(|| DomainError::MalformedPayload("missing grant list".to_owned()))?;

        if grants.iter().any(|g| g.id().is_empty()) {
            return Err(DomainError::MalformedPayload(
                "grant with empty identifier".to_owned(),
            ));
        }

        Ok(Self { grants })
    }

    #[must_use]
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    /// Identifier set granted by this payload.
    ///
    /// # Errors
    ///
    /// `NoGrants` if the grant list is empty.
    pub fn authorized_set(&self) -> Result<AuthorizedSet, DomainError> {
        if self.grants.is_empty() {
            return Err(DomainError::NoGrants);
        }

        // TODO: enforce per-grant method/body/api constraints once the authority contract for them is fixed
        if self.grants.iter().any(Grant::has_constraints) {
            trace!("grant constraints present but not enforced");
        }

        Ok(self
            .grants
            .iter()
            .map(|g| ResourceId::from(g.id()))
            .collect())
    }
}
