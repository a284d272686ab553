//! Federated credential exchange example
//!
//! Loads settings from an optional TOML file plus `FEDAUTH_*` environment
//! variables, exchanges them for temporary credentials and prints the
//! access key id.
//!
//! ```text
//! FEDAUTH_AUTH_ENDPOINT=https://federation.corp.example/v1/authenticate \
//! FEDAUTH_TRUST_CA=/etc/fedauth/federation-ca.pem \
//! FEDAUTH_ROLE_ID=arn:aws:iam::123456789012:role/deploy \
//! FEDAUTH_PASSWORD=... \
//! cargo run --example federate -- settings.toml
//! ```

use fedauth_credential::prelude::*;
use fedauth_credential::provider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => FederationSettings::from_toml_file(path)?,
        None => FederationSettings::default(),
    }
    .with_env_overrides("FEDAUTH_")?;

    // The library never reads the process identity; the caller supplies it.
    let default_user = std::env::var("USER").ok();

    let mut fields = StaticCredentialFields::new();
    provider::configure(
        &settings,
        default_user.as_deref(),
        PinnedConnector::new(),
        &mut fields,
    )
    .await?;

    println!(
        "Issued temporary credentials for access key {}",
        fields.access_key.as_deref().unwrap_or("<none>")
    );
    Ok(())
}
