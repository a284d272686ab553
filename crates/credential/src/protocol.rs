//! Federation wire protocol, version 1
//!
//! # Request
//!
//! `POST <endpoint>` with `Content-Type: application/json`,
//! `Accept: application/json` and [`PROTOCOL_HEADER`]`: 1`:
//!
//! ```json
//! {"protocol_version":1,"user_id":"alice","password":"...","role_id":"role/deploy"}
//! ```
//!
//! `password` is omitted when none was configured.
//!
//! # Response
//!
//! ```json
//! {
//!   "protocol_version": 1,
//!   "status": "approved",
//!   "reason": "optional human readable text",
//!   "credentials": {
//!     "AccessKeyId": "AKIA...",
//!     "SecretAccessKey": "...",
//!     "SessionToken": "...",
//!     "Expiration": "2030-01-01T00:00:00Z"
//!   }
//! }
//! ```
//!
//! Only `"approved"` with all three credential fields present and non-empty
//! yields [`Credentials`]. Anything else is an [`AuthenticationError`].

use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use crate::core::{AuthConfig, AuthenticationError, Credentials};
use crate::utils::redact::truncate_chars;

/// Protocol version spoken by this client
pub const PROTOCOL_VERSION: u16 = 1;

/// Header announcing the protocol version
pub const PROTOCOL_HEADER: &str = "X-Federation-Protocol";

/// Longest service-provided reason kept in an error
const MAX_REASON_CHARS: usize = 200;

/// Outbound authentication request, built once by `new_request`
#[derive(Clone)]
pub struct FederationRequest {
    user_id: String,
    password: Option<SecretString>,
    role_id: String,
}

impl FederationRequest {
    /// Build the payload for `config`
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            user_id: config.user_id().to_string(),
            password: config.password().cloned(),
            role_id: config.role_id().to_string(),
        }
    }

    /// Identity presented to the service
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Role requested
    pub fn role_id(&self) -> &str {
        &self.role_id
    }

    /// Whether the payload carries a password
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl Serialize for FederationRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FederationRequest", 4)?;
        state.serialize_field("protocol_version", &PROTOCOL_VERSION)?;
        state.serialize_field("user_id", &self.user_id)?;
        match &self.password {
            Some(password) => state.serialize_field("password", password.expose_secret())?,
            None => state.skip_field("password")?,
        }
        state.serialize_field("role_id", &self.role_id)?;
        state.end()
    }
}

impl fmt::Debug for FederationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederationRequest")
            .field("user_id", &self.user_id)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("role_id", &self.role_id)
            .finish()
    }
}

#[derive(Deserialize)]
struct FederationResponse {
    protocol_version: Option<u16>,
    status: Option<Verdict>,
    reason: Option<String>,
    credentials: Option<CredentialsPayload>,
}

#[derive(Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Verdict {
    Approved,
    Denied,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialsPayload {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
    expiration: Option<String>,
}

/// Turn an HTTP status and body into credentials or a classified failure
pub fn interpret(status: u16, body: &str) -> Result<Credentials, AuthenticationError> {
    if !(200..300).contains(&status) {
        let reason = serde_json::from_str::<FederationResponse>(body)
            .ok()
            .and_then(|response| response.reason)
            .map_or_else(|| format!("HTTP status {status}"), |r| clip_reason(&r));
        return Err(AuthenticationError::ServiceRejected { status, reason });
    }

    // serde_json messages can quote the offending value, so only its position
    // is reported.
    let response: FederationResponse = serde_json::from_str(body).map_err(|e| {
        AuthenticationError::malformed(format!(
            "body is not a protocol document ({:?} error at line {}, column {})",
            e.classify(),
            e.line(),
            e.column()
        ))
    })?;

    if let Some(version) = response
        .protocol_version
        .filter(|version| *version != PROTOCOL_VERSION)
    {
        return Err(AuthenticationError::malformed(format!(
            "unsupported protocol version {version}"
        )));
    }

    match response.status {
        Some(Verdict::Approved) => {}
        Some(Verdict::Denied) => {
            return Err(AuthenticationError::ServiceRejected {
                status,
                reason: response
                    .reason
                    .map_or_else(|| "denied".to_string(), |r| clip_reason(&r)),
            });
        }
        Some(Verdict::Unknown) => {
            return Err(AuthenticationError::malformed("unrecognised status verdict"));
        }
        None => return Err(AuthenticationError::malformed("missing status verdict")),
    }

    let payload = response
        .credentials
        .ok_or_else(|| AuthenticationError::malformed("approved response carries no credentials"))?;

    let access_key_id = payload
        .access_key_id
        .filter(|value| !value.is_empty())
        .ok_or_else(|| missing("AccessKeyId"))?;
    let secret_access_key = payload
        .secret_access_key
        .filter(|value| !value.is_empty())
        .ok_or_else(|| missing("SecretAccessKey"))?;
    let session_token = payload
        .session_token
        .filter(|value| !value.is_empty())
        .ok_or_else(|| missing("SessionToken"))?;

    let credentials = Credentials::new(access_key_id, secret_access_key, session_token);
    Ok(match payload.expiration.as_deref().and_then(parse_expiration) {
        Some(at) => credentials.with_expiration(at),
        None => credentials,
    })
}

/// The expiry is informational, so an unreadable one is dropped, not fatal
fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        Err(e) => {
            warn!(expiration = %raw, error = %e, "Ignoring credential expiry that is not RFC 3339");
            None
        }
    }
}

fn missing(field: &str) -> AuthenticationError {
    AuthenticationError::malformed(format!("credential field '{field}' is missing or empty"))
}

fn clip_reason(reason: &str) -> String {
    truncate_chars(reason.trim(), MAX_REASON_CHARS)
}
