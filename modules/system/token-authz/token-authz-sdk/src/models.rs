//! Domain models for the token `AuthZ` module.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Identifier suffix marking a resource that needs no token.
pub const PUBLIC_SUFFIX: &str = ".public";

/// Opaque bearer credential identifying a consumer.
///
/// Wrapped in `SecretString` so `Debug` output never contains the value.
#[derive(Debug, Clone)]
pub struct Token(SecretString);

impl Token {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Raw token value, for cache keys and forwarding to the authority.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Path-like resource identifier: `domain/sha/owner/category/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier carries the [`PUBLIC_SUFFIX`].
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.0.ends_with(PUBLIC_SUFFIX)
    }

    /// File name on disk: everything after the final `/`.
    #[must_use]
    pub fn leaf_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Second-to-last path segment, if the identifier has one.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        let mut segments = self.0.rsplit('/');
        segments.next()?;
        segments.next()
    }

    /// Path segments split on `/`.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifiers a token's grants resolve to. Duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizedSet(BTreeSet<ResourceId>);

impl AuthorizedSet {
    #[must_use]
    pub fn contains(&self, id: &ResourceId) -> bool {
        self.0.contains(id)
    }

    /// Number of requested identifiers that are not in this set.
    #[must_use]
    pub fn count_missing(&self, requested: &RequestedSet) -> usize {
        requested.iter().filter(|id| !self.contains(id)).count()
    }

    /// `self ⊇ requested`.
    #[must_use]
    pub fn covers(&self, requested: &RequestedSet) -> bool {
        self.count_missing(requested) == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceId> {
        self.0.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<ResourceId> {
        self.0.iter().cloned().collect()
    }

    /// Granted identifiers without the [`PUBLIC_SUFFIX`]: the only ones that
    /// may be passed on to `materialize`.
    #[must_use]
    pub fn secure_ids(&self) -> Vec<ResourceId> {
        self.0.iter().filter(|id| !id.is_public()).cloned().collect()
    }
}

impl FromIterator<ResourceId> for AuthorizedSet {
    fn from_iter<I: IntoIterator<Item = ResourceId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for AuthorizedSet {
    type Item = ResourceId;
    type IntoIter = std::collections::btree_set::IntoIter<ResourceId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Identifiers a single operation wants to act on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedSet(BTreeSet<ResourceId>);

impl RequestedSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceId> {
        self.0.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<ResourceId> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<ResourceId> for RequestedSet {
    fn from_iter<I: IntoIterator<Item = ResourceId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for RequestedSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(ResourceId::from).collect())
    }
}

/// Per-token directory of links into provider secure storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerView {
    dir: PathBuf,
    entries: Vec<String>,
}

impl ConsumerView {
    #[must_use]
    pub fn new(dir: PathBuf, entries: Vec<String>) -> Self {
        Self { dir, entries }
    }

    /// Directory holding the links.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Link names created or confirmed by the call, in request order.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}
