//! Certificate-pinned HTTPS transport built on reqwest and rustls

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use tracing::debug;
use url::Url;

use super::{Connector, RawResponse, Transport, TrustAnchor};
use crate::core::{NetworkStep, TransportError};
use crate::protocol::{FederationRequest, PROTOCOL_HEADER, PROTOCOL_VERSION};
use crate::utils::error_chain;

/// Production [`Connector`]
///
/// Builds a reqwest client whose TLS layer trusts only the supplied anchor.
/// Redirects are never followed, so the request cannot be steered to a peer
/// the anchor was not meant for.
#[derive(Debug, Clone, Default)]
pub struct PinnedConnector {
    connect_timeout: Option<Duration>,
}

impl PinnedConnector {
    /// Connector without a connect timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound TCP connect and TLS handshake
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

impl Connector for PinnedConnector {
    fn connect(
        &self,
        anchor: &TrustAnchor,
        https_only: bool,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let setup_failure = |reason: String| TransportError::ConnectionFailure {
            step: NetworkStep::ClientSetup,
            reason,
        };

        let tls = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| setup_failure(e.to_string()))?
        .with_root_certificates(anchor.roots())
        .with_no_client_auth();

        let mut builder = reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .https_only(https_only)
            .redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build().map_err(|e| setup_failure(error_chain(&e)))?;

        debug!(
            trust_anchor = %anchor.path().display(),
            roots = anchor.len(),
            https_only,
            "Pinned federation client ready"
        );
        Ok(Box::new(PinnedTransport { client }))
    }
}

/// Transport produced by [`PinnedConnector`]
#[derive(Debug, Clone)]
pub struct PinnedTransport {
    client: reqwest::Client,
}

#[async_trait]
impl Transport for PinnedTransport {
    async fn exchange(
        &self,
        endpoint: &Url,
        request: &FederationRequest,
    ) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(PROTOCOL_HEADER, PROTOCOL_VERSION.to_string())
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailure {
                step: if e.is_connect() {
                    NetworkStep::Connect
                } else {
                    NetworkStep::Send
                },
                reason: error_chain(&e),
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::ConnectionFailure {
                step: NetworkStep::Receive,
                reason: error_chain(&e),
            })?;

        debug!(status, bytes = body.len(), "Federation response received");
        Ok(RawResponse { status, body })
    }
}
