//! Core types for the federation exchange

mod config;
mod credentials;
mod error;
mod state;

pub use config::{AuthConfig, AuthConfigBuilder, PasswordPolicy};
pub use credentials::Credentials;
pub use error::{
    AuthenticationError, ConfigError, FederationError, InjectError, NetworkStep, PrepareError,
    ProcessError, Result, SequenceError, TransportError,
};
pub use state::AuthenticatorState;
