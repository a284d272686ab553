//! Hand-off of issued credentials to the cloud SDK configuration

use std::fmt;

use secrecy::SecretString;

use crate::core::{Credentials, InjectError};

/// Cloud SDK configuration object that receives the three credential values
///
/// The exchange neither constructs nor validates the object. It only
/// deposits access key, secret key and session token.
pub trait CredentialSink {
    /// Store the credentials
    fn inject(&mut self, credentials: Credentials) -> Result<(), InjectError>;
}

/// Minimal sink holding the three static credential fields
#[derive(Clone, Default)]
pub struct StaticCredentialFields {
    /// Access key id
    pub access_key: Option<String>,
    /// Secret access key
    pub secret_key: Option<SecretString>,
    /// Session token
    pub token: Option<SecretString>,
}

impl StaticCredentialFields {
    /// Empty field set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether all three fields are set
    pub fn is_populated(&self) -> bool {
        self.access_key.is_some() && self.secret_key.is_some() && self.token.is_some()
    }
}

impl CredentialSink for StaticCredentialFields {
    fn inject(&mut self, credentials: Credentials) -> Result<(), InjectError> {
        let (access_key, secret_key, token) = credentials.into_parts();
        self.access_key = Some(access_key);
        self.secret_key = Some(secret_key);
        self.token = Some(token);
        Ok(())
    }
}

impl<S: CredentialSink + ?Sized> CredentialSink for &mut S {
    fn inject(&mut self, credentials: Credentials) -> Result<(), InjectError> {
        (**self).inject(credentials)
    }
}

impl fmt::Debug for StaticCredentialFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialFields")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
