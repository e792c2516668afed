//! HTTPS transport to the introspection authority.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use token_authz_sdk::Token;
use tracing::debug;

use crate::config::IntrospectionConfig;
use crate::domain::DomainError;
use crate::domain::ports::AuthorityClient;

/// `POST <authority><path>` with `{"token": ...}`; a `200` body is the payload.
///
/// The overall deadline is enforced by the caller; this client only bounds
/// connection setup.
pub struct HttpsAuthorityClient {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    url: String,
}

impl HttpsAuthorityClient {
    /// # Errors
    ///
    /// Fails when the authority is empty, uses plain `http` without
    /// `allow_insecure_http`, or TLS cannot be configured.
    pub fn new(cfg: &IntrospectionConfig) -> anyhow::Result<Self> {
        let authority = cfg.authority.trim_end_matches('/');
        if authority.is_empty() {
            anyhow::bail!("introspection.authority must be set");
        }
        if authority.starts_with("http://") && !cfg.allow_insecure_http {
            anyhow::bail!(
                "introspection.authority uses plain http; set introspection.allow_insecure_http for local authorities"
            );
        }

        let builder = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::aws_lc_rs::default_provider())
            .map_err(|e| anyhow::anyhow!("cannot build TLS configuration: {e}"))?;
        let builder = if cfg.allow_insecure_http {
            builder.https_or_http()
        } else {
            builder.https_only()
        };
        let https = builder.enable_http1().build();

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .build(https);

        Ok(Self {
            client,
            url: format!("{authority}{}", cfg.path),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AuthorityClient for HttpsAuthorityClient {
    async fn introspect(&self, token: &Token) -> Result<String, DomainError> {
        let body = serde_json::to_vec(&serde_json::json!({ "token": token.expose() }))
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        let request = Request::post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| DomainError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(status = status.as_u16(), "authority rejected token");
            return Err(DomainError::AuthorityRejected {
                status: status.as_u16(),
            });
        }

        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| DomainError::Transport(e.to_string()))?
            .to_bytes();

        String::from_utf8(bytes.to_vec())
            .map_err(|e| DomainError::MalformedPayload(format!("payload is not UTF-8: {e}")))
    }
}
