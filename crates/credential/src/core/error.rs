//! Error types for the federation exchange
//!
//! The hierarchy follows the two phases of an attempt:
//! - [`PrepareError`]: raised by `new_request`, wraps [`ConfigError`] and [`TransportError`]
//! - [`ProcessError`]: raised by `process`, wraps [`AuthenticationError`]
//! - [`SequenceError`]: an operation was called in the wrong authenticator state
//! - [`FederationError`]: top-level error surfaced by the provider shim
//!
//! No variant ever carries the password, the issued secret key, the session
//! token or raw certificate bytes. Messages name the field or network step
//! instead.
//!
//! # Error Conversion Examples
//!
//! ```
//! use fedauth_credential::core::{ConfigError, FederationError, PrepareError};
//!
//! let config_err = ConfigError::MissingField { field: "role_id" };
//! let err: FederationError = PrepareError::from(config_err).into();
//! assert!(err.to_string().contains("role_id"));
//! ```

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::AuthenticatorState;

/// Configuration errors raised while assembling an [`AuthConfig`](super::AuthConfig)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A mandatory field is absent or blank
    #[error("Missing required configuration field '{field}'")]
    MissingField {
        /// Field name
        field: &'static str,
    },

    /// A field is present but unusable
    #[error("Invalid configuration field '{field}': {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Network step at which an exchange failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkStep {
    /// Building the pinned HTTP client
    ClientSetup,
    /// TCP connect and TLS handshake, including peer certificate validation
    Connect,
    /// Writing the request
    Send,
    /// Reading the response
    Receive,
    /// The caller-supplied deadline expired
    Deadline,
    /// The caller cancelled the exchange
    Cancelled,
}

impl fmt::Display for NetworkStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ClientSetup => "client setup",
            Self::Connect => "connect",
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Deadline => "deadline",
            Self::Cancelled => "cancellation",
        })
    }
}

/// Transport layer errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Trust anchor file missing, unreadable, or not PEM
    #[error("Failed to read trust anchor '{}': {reason}", .path.display())]
    CertificateReadFailure {
        /// Trust anchor path
        path: PathBuf,
        /// Reason, never the file content
        reason: String,
    },

    /// Trust anchor holds a PEM block whose certificate is malformed
    #[error("Failed to parse trust anchor '{}': {reason}", .path.display())]
    CertificateParseFailure {
        /// Trust anchor path
        path: PathBuf,
        /// Reason, never the certificate bytes
        reason: String,
    },

    /// Network unreachable, timeout, handshake or certificate validation failure
    #[error("Connection to federation service failed during {step}: {reason}")]
    ConnectionFailure {
        /// Step that failed
        step: NetworkStep,
        /// Underlying error chain
        reason: String,
    },
}

/// Illegal authenticator state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot call {operation} while the authenticator is {state}")]
pub struct SequenceError {
    /// Operation that was attempted
    pub operation: &'static str,
    /// State the authenticator was in
    pub state: AuthenticatorState,
}

/// Errors from `Authenticator::new_request`
#[derive(Debug, Error)]
pub enum PrepareError {
    /// The configuration violates its invariants
    #[error("Invalid federation configuration: {0}")]
    Config(#[from] ConfigError),

    /// Trust anchor or client setup failed
    #[error("Transport setup failed: {0}")]
    Transport(#[from] TransportError),

    /// The authenticator is not in the `Unprepared` state
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

/// Failures of the federation exchange itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    /// Transport failure during send or receive, deadline expiry, or cancellation
    #[error("Request to federation service failed during {step}: {reason}")]
    RequestFailure {
        /// Step that failed
        step: NetworkStep,
        /// Underlying error chain
        reason: String,
    },

    /// The service explicitly denied the request
    #[error("Federation service rejected the request (HTTP {status}): {reason}")]
    ServiceRejected {
        /// HTTP status of the response
        status: u16,
        /// Reason reported by the service, or the status line
        reason: String,
    },

    /// A response arrived but did not carry a usable verdict and credentials
    #[error("Malformed federation response: {reason}")]
    MalformedResponse {
        /// What was missing or unparseable
        reason: String,
    },
}

impl AuthenticationError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }
}

impl From<TransportError> for AuthenticationError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionFailure { step, reason } => {
                Self::RequestFailure { step, reason }
            }
            other => Self::RequestFailure {
                step: NetworkStep::ClientSetup,
                reason: other.to_string(),
            },
        }
    }
}

/// Errors from `Authenticator::process`
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The exchange failed
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    /// `process` was called outside the `Prepared` state
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

/// The cloud configuration refused the injected credentials
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to set '{field}' on the cloud configuration: {reason}")]
pub struct InjectError {
    /// Configuration field that could not be set
    pub field: &'static str,
    /// Why
    pub reason: String,
}

/// Top-level error surfaced by the provider shim
#[derive(Debug, Error)]
pub enum FederationError {
    /// Preparing the request failed
    #[error("Could not prepare authentication request to federation service: {0}")]
    Prepare(#[from] PrepareError),

    /// The exchange failed
    #[error("Failed to authenticate to federation service: {0}")]
    Authenticate(#[from] ProcessError),

    /// The credentials could not be handed to the cloud configuration
    #[error(transparent)]
    Inject(#[from] InjectError),
}

/// Result type alias for federation operations
pub type Result<T, E = FederationError> = std::result::Result<T, E>;
