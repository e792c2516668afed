//! Configuration for the token `AuthZ` module.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Module configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenAuthzConfig {
    pub introspection: IntrospectionConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    /// Share one pending introspection between concurrent misses on the same
    /// token. Off by default: every miss calls the authority independently.
    pub dedupe_inflight: bool,
}

/// Remote introspection authority.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntrospectionConfig {
    /// Base URL of the authority, e.g. `https://auth.example.com`.
    pub authority: String,
    /// Introspection endpoint path appended to `authority`.
    pub path: String,
    /// Upper bound for a single introspection call. Elapsed calls are rejections.
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,
    /// Permit plain `http://` authorities. Only for local development.
    pub allow_insecure_http: bool,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            authority: String::new(),
            path: "/auth/v1/token/introspect".to_owned(),
            timeout: Duration::from_secs(10),
            allow_insecure_http: false,
        }
    }
}

/// Cache store policy.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub expiry: CacheExpiry,
}

/// When a cached authorization payload stops being served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum CacheExpiry {
    /// Entries live until the process exits.
    #[default]
    Never,
    /// Entries older than `ttl` are treated as absent and re-introspected.
    After {
        #[serde(with = "humantime_duration")]
        ttl: Duration,
    },
}

/// Filesystem layout for provider storage and consumer views.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Provider root; secure files live under `<provider_root>/secure`.
    pub provider_root: PathBuf,
    /// Consumer views are created as `<consumer_root>/<token>`.
    pub consumer_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider_root: PathBuf::from("webroot/provider"),
            consumer_root: PathBuf::from("webroot/consumer"),
        }
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
