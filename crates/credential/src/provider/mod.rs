//! Integration shim between the host provider and the exchange
//!
//! [`configure`] runs one complete attempt: settings are turned into an
//! [`AuthConfig`](crate::core::AuthConfig), a fresh [`Authenticator`] performs the
//! exchange, and the issued credentials are injected into the caller's
//! [`CredentialSink`].

mod settings;
mod sink;

use tracing::{error, info};

use crate::authenticator::Authenticator;
use crate::core::{Credentials, PrepareError, Result};
use crate::transport::Connector;

pub use settings::{FederationSettings, SettingsError};
pub use sink::{CredentialSink, StaticCredentialFields};

/// Run one federation exchange and return the issued credentials
///
/// `default_user` is used when the settings carry no user id; the shim never
/// consults the process identity itself.
pub async fn authenticate<C: Connector>(
    settings: &FederationSettings,
    default_user: Option<&str>,
    connector: C,
) -> Result<Credentials> {
    let config = settings
        .to_auth_config(default_user)
        .map_err(PrepareError::from)?;

    let mut authenticator = Authenticator::with_connector(connector);
    authenticator.new_request(&config)?;
    let credentials = match settings.timeout {
        Some(timeout) => authenticator.process_with_deadline(timeout).await?,
        None => authenticator.process().await?,
    };
    Ok(credentials.clone())
}

/// Authenticate and inject the credentials into `sink`
pub async fn configure<C, S>(
    settings: &FederationSettings,
    default_user: Option<&str>,
    connector: C,
    sink: &mut S,
) -> Result<()>
where
    C: Connector,
    S: CredentialSink + ?Sized,
{
    info!(
        endpoint = settings.auth_endpoint.as_deref().unwrap_or_default(),
        role_id = settings.role_id.as_deref().unwrap_or_default(),
        "Authenticating to federation service"
    );

    let credentials = authenticate(settings, default_user, connector)
        .await
        .inspect_err(|err| error!(error = %err, "Federation authentication failed"))?;
    sink.inject(credentials)?;

    info!("Authentication to federation service successful");
    Ok(())
}
