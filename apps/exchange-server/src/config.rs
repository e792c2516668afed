//! Layered application configuration: defaults, then YAML, then environment.

use std::path::Path;

use anyhow::{Context, Result, bail};
use api_gateway::ApiGatewayConfig;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use token_authz::TokenAuthzConfig;

/// Prefix of environment overrides; `__` separates nesting levels, e.g.
/// `EXCHANGE__API_GATEWAY__BIND_ADDR`.
pub const ENV_PREFIX: &str = "EXCHANGE__";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub token_authz: TokenAuthzConfig,
    pub api_gateway: ApiGatewayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl AppConfig {
    /// Load configuration, optionally from a YAML file.
    ///
    /// # Errors
    /// Returns an error if the file does not exist or any layer fails to
    /// deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.is_file() {
                bail!("config file '{}' not found", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }
}
