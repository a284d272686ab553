//! Fedauth Credential - federated temporary cloud credentials
//!
//! Exchanges a user identity for a short-lived access key, secret key and
//! session token by talking to an identity federation service over a TLS
//! channel pinned to a single trust anchor.
//!
//! # Flow
//!
//! - [`AuthConfig`] - validated, immutable request configuration
//! - [`Authenticator`] - single-use state machine: `new_request` then `process`
//! - [`Credentials`] - the issued triple, secrets wrapped in `SecretString`
//! - [`provider::configure`] - runs one attempt and injects the result into a
//!   [`CredentialSink`]
//!
//! # Example
//!
//! ```no_run
//! use fedauth_credential::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::builder()
//!     .endpoint("https://federation.corp.example/v1/authenticate")
//!     .user_id("alice")
//!     .password("correct horse battery staple")
//!     .trust_anchor_path("/etc/fedauth/federation-ca.pem")
//!     .role_id("arn:aws:iam::123456789012:role/deploy")
//!     .build()?;
//!
//! let mut authenticator = Authenticator::new();
//! authenticator.new_request(&config)?;
//! let credentials = authenticator.process().await?;
//! println!("issued {}", credentials.access_key_id());
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

/// Single-use authenticator state machine
pub mod authenticator;
/// Core types, errors, and configuration
pub mod core;
/// Wire protocol v1 request and response handling
pub mod protocol;
/// Settings loading and credential injection for the host provider
pub mod provider;
/// Trust anchor loading and the pinned HTTPS transport
pub mod transport;
/// Log redaction helpers
pub mod utils;

// ── Root re-exports ─────────────────────────────────────────────────────────

pub use crate::authenticator::Authenticator;
pub use crate::core::{
    AuthConfig, AuthConfigBuilder, AuthenticationError, AuthenticatorState, ConfigError,
    Credentials, FederationError, InjectError, NetworkStep, PasswordPolicy, PrepareError,
    ProcessError, SequenceError, TransportError,
};
pub use crate::provider::{
    CredentialSink, FederationSettings, SettingsError, StaticCredentialFields, configure,
};
pub use crate::transport::{Connector, PinnedConnector, Transport, TrustAnchor};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::authenticator::Authenticator;
    pub use crate::core::{
        AuthConfig, AuthenticationError, AuthenticatorState, Credentials, FederationError,
        PasswordPolicy, PrepareError, ProcessError,
    };
    pub use crate::provider::{CredentialSink, FederationSettings, StaticCredentialFields};
    pub use crate::transport::{Connector, PinnedConnector};

    pub use secrecy::{ExposeSecret, SecretString};
}
