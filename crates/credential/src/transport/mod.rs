//! Transport layer for the federation exchange
//!
//! A [`Connector`] turns a [`TrustAnchor`] into a [`Transport`]; a
//! [`Transport`] performs exactly one request/response round trip. The
//! production pair is [`PinnedConnector`] / [`PinnedTransport`], which trust
//! the configured anchor and nothing else.

mod pinned;
mod trust;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::core::TransportError;
use crate::protocol::FederationRequest;

pub use pinned::{PinnedConnector, PinnedTransport};
pub use trust::TrustAnchor;

/// Raw HTTP outcome of one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

/// One federation round trip
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `request` to `endpoint` and return the raw response
    async fn exchange(
        &self,
        endpoint: &Url,
        request: &FederationRequest,
    ) -> Result<RawResponse, TransportError>;
}

/// Builds a [`Transport`] that trusts only `anchor`
pub trait Connector: Send + Sync {
    /// Set up a client pinned to `anchor`
    ///
    /// With `https_only` the transport must refuse plaintext endpoints.
    fn connect(
        &self,
        anchor: &TrustAnchor,
        https_only: bool,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

impl<T: Connector + ?Sized> Connector for &T {
    fn connect(
        &self,
        anchor: &TrustAnchor,
        https_only: bool,
    ) -> Result<Box<dyn Transport>, TransportError> {
        (**self).connect(anchor, https_only)
    }
}

impl<T: Connector + ?Sized> Connector for Arc<T> {
    fn connect(
        &self,
        anchor: &TrustAnchor,
        https_only: bool,
    ) -> Result<Box<dyn Transport>, TransportError> {
        (**self).connect(anchor, https_only)
    }
}
