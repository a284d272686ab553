//! Provider-facing federation settings
//!
//! Values come from a TOML file and/or prefixed environment variables. The
//! environment wins over the file, matching how configuration sources are
//! prioritised elsewhere.
//!
//! ```toml
//! user_id = "alice"
//! password = "..."
//! auth_endpoint = "https://federation.corp.example/v1/authenticate"
//! trust_ca = "/etc/fedauth/federation-ca.pem"
//! role_id = "arn:aws:iam::123456789012:role/deploy"
//! password_policy = "optional"
//! timeout = "30s"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::core::{AuthConfig, ConfigError, PasswordPolicy};

/// Errors raised while loading [`FederationSettings`]
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read
    #[error("Failed to read federation settings '{}': {source}", .path.display())]
    Read {
        /// Settings file
        path: PathBuf,
        /// I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The settings document is not valid
    #[error("Failed to parse federation settings: {reason}")]
    Parse {
        /// Parser message, without the offending input
        reason: String,
    },

    /// An environment variable holds an unusable value
    #[error("Invalid value in environment variable '{variable}': {reason}")]
    InvalidEnv {
        /// Variable name
        variable: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Parameters the host provider passes to the federation exchange
///
/// Every field is named, so user id, password, endpoint, trust anchor and
/// role can never be swapped positionally.
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FederationSettings {
    /// Identity; falls back to the caller-supplied default user
    pub user_id: Option<String>,
    /// Password; empty or absent means none
    #[serde(deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
    /// Federation service URL
    pub auth_endpoint: Option<String>,
    /// PEM trust anchor for the service
    pub trust_ca: Option<PathBuf>,
    /// Cloud role to assume
    pub role_id: Option<String>,
    /// Empty-password policy
    pub password_policy: PasswordPolicy,
    /// Accept an `http` endpoint
    pub allow_plaintext: bool,
    /// Upper bound on the exchange
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl FederationSettings {
    /// Parse settings from a TOML document
    pub fn from_toml_str(document: &str) -> Result<Self, SettingsError> {
        // Both the Display form and the serde message can quote the offending
        // value, which may be the password. Only the key and position survive.
        toml::from_str(document).map_err(|e| SettingsError::Parse {
            reason: locate_toml_error(document, &e),
        })
    }

    /// Read and parse a TOML settings file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&document)
    }

    /// Overlay `<prefix>USER_ID`, `<prefix>PASSWORD` and friends from the process environment
    pub fn with_env_overrides(self, prefix: &str) -> Result<Self, SettingsError> {
        self.with_env_lookup(prefix, |name| std::env::var(name).ok())
    }

    /// Overlay values resolved by `lookup` for each prefixed variable name
    ///
    /// Recognised suffixes: `USER_ID`, `PASSWORD`, `AUTH_ENDPOINT`,
    /// `TRUST_CA`, `ROLE_ID`, `PASSWORD_POLICY`, `ALLOW_PLAINTEXT`,
    /// `TIMEOUT_SECS`. Unset variables leave the current value alone.
    pub fn with_env_lookup<F>(mut self, prefix: &str, lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{prefix}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, value)) = var("USER_ID") {
            self.user_id = Some(value);
        }
        if let Some((_, value)) = var("PASSWORD") {
            self.password = Some(SecretString::from(value));
        }
        if let Some((_, value)) = var("AUTH_ENDPOINT") {
            self.auth_endpoint = Some(value);
        }
        if let Some((_, value)) = var("TRUST_CA") {
            self.trust_ca = Some(PathBuf::from(value));
        }
        if let Some((_, value)) = var("ROLE_ID") {
            self.role_id = Some(value);
        }
        if let Some((name, value)) = var("PASSWORD_POLICY") {
            self.password_policy = match value.trim().to_ascii_lowercase().as_str() {
                "optional" => PasswordPolicy::Optional,
                "required" => PasswordPolicy::Required,
                _ => return Err(invalid_env(name, "expected 'optional' or 'required'")),
            };
        }
        if let Some((name, value)) = var("ALLOW_PLAINTEXT") {
            self.allow_plaintext = parse_bool(&value)
                .ok_or_else(|| invalid_env(name, "expected true/false"))?;
        }
        if let Some((name, value)) = var("TIMEOUT_SECS") {
            let seconds: u64 = value
                .trim()
                .parse()
                .map_err(|_| invalid_env(name, "expected a whole number of seconds"))?;
            self.timeout = Some(Duration::from_secs(seconds));
        }
        Ok(self)
    }

    /// Build the exchange configuration
    ///
    /// The user id is the explicit setting when non-blank, else
    /// `default_user`. Mandatory fields are validated by [`AuthConfig`].
    pub fn to_auth_config(&self, default_user: Option<&str>) -> Result<AuthConfig, ConfigError> {
        let user_id = self
            .user_id
            .as_deref()
            .filter(|user| !user.trim().is_empty())
            .or(default_user)
            .unwrap_or_default();

        let mut builder = AuthConfig::builder()
            .endpoint(self.auth_endpoint.clone().unwrap_or_default())
            .user_id(user_id)
            .trust_anchor_path(self.trust_ca.clone().unwrap_or_default())
            .role_id(self.role_id.clone().unwrap_or_default())
            .password_policy(self.password_policy)
            .allow_plaintext(self.allow_plaintext);
        if let Some(password) = &self.password {
            builder = builder.secret_password(password.clone());
        }
        builder.build()
    }
}

fn locate_toml_error(document: &str, err: &toml::de::Error) -> String {
    let Some(before) = err.span().and_then(|span| document.get(..span.start)) else {
        return "document is not valid TOML".to_string();
    };
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);
    let column = before[line_start..].chars().count() + 1;

    let key = document[line_start..]
        .lines()
        .next()
        .and_then(|text| text.split_once('='))
        .map(|(key, _)| key.trim())
        .filter(|key| is_bare_key(key));
    match key {
        Some(key) => format!("invalid entry '{key}' at line {line}, column {column}"),
        None => format!("invalid entry at line {line}, column {column}"),
    }
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn invalid_env(variable: String, reason: &str) -> SettingsError {
    SettingsError::InvalidEnv {
        variable,
        reason: reason.to_string(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl fmt::Debug for FederationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederationSettings")
            .field("user_id", &self.user_id)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("auth_endpoint", &self.auth_endpoint)
            .field("trust_ca", &self.trust_ca)
            .field("role_id", &self.role_id)
            .field("password_policy", &self.password_policy)
            .field("allow_plaintext", &self.allow_plaintext)
            .field("timeout", &self.timeout)
            .finish()
    }
}
