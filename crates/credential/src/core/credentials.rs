//! Temporary cloud credentials issued by the federation service

use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

/// Access key, secret key and session token issued for one role
///
/// The secret key and session token stay wrapped in [`SecretString`] so they
/// never reach `Debug` output or logs. Only the access key id is printable.
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: SecretString,
    expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Bundle the three values issued by the service
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            session_token: SecretString::from(session_token.into()),
            expiration: None,
        }
    }

    /// Attach the expiry reported by the service
    #[must_use]
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Access key id
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Secret access key
    pub fn secret_access_key(&self) -> &SecretString {
        &self.secret_access_key
    }

    /// Session token
    pub fn session_token(&self) -> &SecretString {
        &self.session_token
    }

    /// When the credentials stop being valid, if the service said
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Whether the reported expiry is at or before `now`
    ///
    /// Credentials without an expiry never report expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|at| at <= now)
    }

    /// Split into `(access_key_id, secret_access_key, session_token)`
    pub fn into_parts(self) -> (String, SecretString, SecretString) {
        (
            self.access_key_id,
            self.secret_access_key,
            self.session_token,
        )
    }
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.access_key_id == other.access_key_id
            && self.secret_access_key.expose_secret() == other.secret_access_key.expose_secret()
            && self.session_token.expose_secret() == other.session_token.expose_secret()
            && self.expiration == other.expiration
    }
}

impl Eq for Credentials {}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Credentials {
        Credentials::new("AKIAEXAMPLE", "wJalrXUtnFEMI", "FwoGZXIvYXdzEBc")
    }

    #[test]
    fn test_accessors_return_issued_values() {
        let creds = sample();
        assert_eq!(creds.access_key_id(), "AKIAEXAMPLE");
        assert_eq!(creds.secret_access_key().expose_secret(), "wJalrXUtnFEMI");
        assert_eq!(creds.session_token().expose_secret(), "FwoGZXIvYXdzEBc");
        assert_eq!(creds.expiration(), None);
    }

    #[test]
    fn test_debug_hides_secret_and_token() {
        let debug = format!("{:?}", sample());
        assert!(debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
        assert!(!debug.contains("FwoGZXIvYXdzEBc"));
    }

    #[test]
    fn test_expiry() {
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let creds = sample().with_expiration(at);

        assert!(!creds.is_expired_at(at - chrono::Duration::seconds(1)));
        assert!(creds.is_expired_at(at));
        assert!(!sample().is_expired_at(at));
    }

    #[test]
    fn test_into_parts() {
        let (access, secret, token) = sample().into_parts();
        assert_eq!(access, "AKIAEXAMPLE");
        assert_eq!(secret.expose_secret(), "wJalrXUtnFEMI");
        assert_eq!(token.expose_secret(), "FwoGZXIvYXdzEBc");
    }
}
