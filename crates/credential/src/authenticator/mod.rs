//! Single-use authenticator driving one federation exchange
//!
//! ```text
//! let mut auth = Authenticator::new();
//! auth.new_request(&config)?;       // Unprepared -> Prepared
//! let creds = auth.process().await?; // Prepared -> Completed | Failed
//! ```
//!
//! Every failure is terminal for the instance. A fresh [`Authenticator`] is
//! required for another attempt.

use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::core::{
    AuthConfig, AuthenticationError, AuthenticatorState, Credentials, NetworkStep, PrepareError,
    ProcessError, SequenceError,
};
use crate::protocol::{self, FederationRequest};
use crate::transport::{Connector, PinnedConnector, RawResponse, Transport, TrustAnchor};
use crate::utils::sanitize_body_for_logging;

/// Everything `process` needs, built by `new_request`
struct PreparedExchange {
    endpoint: Url,
    request: FederationRequest,
    transport: Box<dyn Transport>,
}

enum Stage {
    Unprepared,
    Prepared(Box<PreparedExchange>),
    Completed,
    Failed,
}

impl Stage {
    fn state(&self) -> AuthenticatorState {
        match self {
            Self::Unprepared => AuthenticatorState::Unprepared,
            Self::Prepared(_) => AuthenticatorState::Prepared,
            Self::Completed => AuthenticatorState::Completed,
            Self::Failed => AuthenticatorState::Failed,
        }
    }
}

/// How long `process` may wait for the service
#[derive(Clone, Copy)]
enum Bound<'a> {
    Unbounded,
    Deadline(Duration),
    Cancellation(&'a CancellationToken),
}

/// Drives one authentication attempt
///
/// `C` is the [`Connector`] used to build the pinned transport. Production
/// code uses [`PinnedConnector`]; tests inject spies.
pub struct Authenticator<C = PinnedConnector> {
    connector: C,
    stage: Stage,
    credentials: Option<Credentials>,
}

impl Authenticator<PinnedConnector> {
    /// Authenticator using the production pinned transport
    pub fn new() -> Self {
        Self::with_connector(PinnedConnector::new())
    }
}

impl Default for Authenticator<PinnedConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> Authenticator<C> {
    /// Authenticator building its transport through `connector`
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            stage: Stage::Unprepared,
            credentials: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> AuthenticatorState {
        self.stage.state()
    }

    /// Credentials issued by a completed exchange
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Hand the issued credentials to the caller
    pub fn into_credentials(self) -> Option<Credentials> {
        self.credentials
    }

    /// Prepare the outbound request for `config`
    ///
    /// Loads the trust anchor and builds the pinned transport. No network
    /// I/O happens here. On failure the authenticator stays `Unprepared`.
    pub fn new_request(&mut self, config: &AuthConfig) -> Result<(), PrepareError> {
        let state = self.state();
        if state != AuthenticatorState::Unprepared {
            return Err(SequenceError {
                operation: "new_request",
                state,
            }
            .into());
        }

        config.validate()?;
        let anchor = TrustAnchor::load(config.trust_anchor_path())?;
        let transport = self.connector.connect(&anchor, !config.allow_plaintext())?;
        let request = FederationRequest::from_config(config);

        debug!(
            user_id = %request.user_id(),
            role_id = %request.role_id(),
            endpoint = %config.endpoint(),
            with_password = request.has_password(),
            "Federation request prepared"
        );

        self.stage = Stage::Prepared(Box::new(PreparedExchange {
            endpoint: config.endpoint().clone(),
            request,
            transport,
        }));
        Ok(())
    }

    /// Send the prepared request and interpret the response
    pub async fn process(&mut self) -> Result<&Credentials, ProcessError> {
        self.run(Bound::Unbounded).await
    }

    /// Like [`process`](Self::process), failing if no answer arrives within `deadline`
    pub async fn process_with_deadline(
        &mut self,
        deadline: Duration,
    ) -> Result<&Credentials, ProcessError> {
        self.run(Bound::Deadline(deadline)).await
    }

    /// Like [`process`](Self::process), abandoning the exchange once `token` is cancelled
    pub async fn process_with_cancellation(
        &mut self,
        token: &CancellationToken,
    ) -> Result<&Credentials, ProcessError> {
        self.run(Bound::Cancellation(token)).await
    }

    async fn run(&mut self, bound: Bound<'_>) -> Result<&Credentials, ProcessError> {
        let prepared = match std::mem::replace(&mut self.stage, Stage::Failed) {
            Stage::Prepared(prepared) => prepared,
            other => {
                let state = other.state();
                self.stage = other;
                return Err(SequenceError {
                    operation: "process",
                    state,
                }
                .into());
            }
        };

        let span = info_span!(
            "federation_exchange",
            user_id = %prepared.request.user_id(),
            role_id = %prepared.request.role_id(),
            endpoint = %prepared.endpoint,
        );
        let credentials = exchange(&prepared, bound).instrument(span).await?;

        self.stage = Stage::Completed;
        Ok(&*self.credentials.insert(credentials))
    }
}

async fn exchange(
    prepared: &PreparedExchange,
    bound: Bound<'_>,
) -> Result<Credentials, AuthenticationError> {
    let round_trip = async {
        prepared
            .transport
            .exchange(&prepared.endpoint, &prepared.request)
            .await
            .map_err(AuthenticationError::from)
    };

    let raw = match bound {
        Bound::Unbounded => round_trip.await,
        Bound::Deadline(deadline) => tokio::time::timeout(deadline, round_trip)
            .await
            .unwrap_or_else(|_| {
                Err(AuthenticationError::RequestFailure {
                    step: NetworkStep::Deadline,
                    reason: format!("no response within {deadline:?}"),
                })
            }),
        Bound::Cancellation(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(AuthenticationError::RequestFailure {
                step: NetworkStep::Cancelled,
                reason: "exchange cancelled by caller".to_string(),
            }),
            raw = round_trip => raw,
        },
    };

    let RawResponse { status, body } = raw.inspect_err(|err| {
        warn!(error = %err, "Federation exchange failed");
    })?;

    match protocol::interpret(status, &body) {
        Ok(credentials) => {
            info!(
                status,
                access_key_id = %credentials.access_key_id(),
                expiration = ?credentials.expiration(),
                "Federation service issued credentials"
            );
            Ok(credentials)
        }
        Err(err) => {
            warn!(
                status,
                error = %err,
                body = %sanitize_body_for_logging(&body),
                "Federation service did not issue credentials"
            );
            Err(err)
        }
    }
}

impl<C> fmt::Debug for Authenticator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("state", &self.stage.state())
            .field("credentials", &self.credentials)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransportError;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport answering every exchange with a fixed response
    #[derive(Clone)]
    struct Scripted {
        response: RawResponse,
        delay: Duration,
        exchanges: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn exchange(
            &self,
            _endpoint: &Url,
            _request: &FederationRequest,
        ) -> Result<RawResponse, TransportError> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.response.clone())
        }
    }

    impl Connector for Scripted {
        fn connect(
            &self,
            _anchor: &TrustAnchor,
            _https_only: bool,
        ) -> Result<Box<dyn Transport>, TransportError> {
            Ok(Box::new(self.clone()))
        }
    }

    fn scripted(status: u16, body: &str) -> Scripted {
        Scripted {
            response: RawResponse {
                status,
                body: body.to_string(),
            },
            delay: Duration::ZERO,
            exchanges: Arc::new(AtomicUsize::new(0)),
        }
    }

    const APPROVED: &str = concat!(
        r#"{"protocol_version":1,"status":"approved","credentials":"#,
        r#"{"AccessKeyId":"AKIA1","SecretAccessKey":"secret123","SessionToken":"tok-xyz"}}"#,
    );

    fn config() -> AuthConfig {
        AuthConfig::builder()
            .endpoint("https://federation.example.com/authenticate")
            .user_id("alice")
            .password("hunter2")
            .trust_anchor_path(
                Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/federation-ca.pem"),
            )
            .role_id("role/deploy")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_successful_exchange_completes() {
        let connector = scripted(200, APPROVED);
        let mut auth = Authenticator::with_connector(connector.clone());
        assert_eq!(auth.state(), AuthenticatorState::Unprepared);

        auth.new_request(&config()).unwrap();
        assert_eq!(auth.state(), AuthenticatorState::Prepared);

        let access_key = auth.process().await.unwrap().access_key_id().to_string();
        assert_eq!(access_key, "AKIA1");
        assert_eq!(auth.state(), AuthenticatorState::Completed);
        assert_eq!(connector.exchanges.load(Ordering::SeqCst), 1);
        assert!(auth.into_credentials().is_some());
    }

    #[tokio::test]
    async fn test_process_before_new_request() {
        let mut auth = Authenticator::with_connector(scripted(200, APPROVED));
        let err = auth.process().await.unwrap_err();

        assert!(matches!(
            err,
            ProcessError::Sequence(SequenceError {
                state: AuthenticatorState::Unprepared,
                ..
            })
        ));
        assert_eq!(auth.state(), AuthenticatorState::Unprepared);
    }

    #[tokio::test]
    async fn test_second_process_is_sequence_error() {
        let connector = scripted(200, APPROVED);
        let mut auth = Authenticator::with_connector(connector.clone());
        auth.new_request(&config()).unwrap();
        auth.process().await.unwrap();

        let err = auth.process().await.unwrap_err();
        assert!(matches!(err, ProcessError::Sequence(_)));
        assert_eq!(auth.state(), AuthenticatorState::Completed);
        assert_eq!(connector.exchanges.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_new_request_twice_is_sequence_error() {
        let mut auth = Authenticator::with_connector(scripted(200, APPROVED));
        auth.new_request(&config()).unwrap();

        let err = auth.new_request(&config()).unwrap_err();
        assert!(matches!(err, PrepareError::Sequence(_)));
        assert_eq!(auth.state(), AuthenticatorState::Prepared);
    }

    #[tokio::test]
    async fn test_rejection_fails_the_attempt() {
        let mut auth = Authenticator::with_connector(scripted(
            200,
            r#"{"status":"denied","reason":"role not permitted"}"#,
        ));
        auth.new_request(&config()).unwrap();

        let err = auth.process().await.unwrap_err();
        assert!(matches!(
            err,
            ProcessError::Authentication(AuthenticationError::ServiceRejected { .. })
        ));
        assert_eq!(auth.state(), AuthenticatorState::Failed);
        assert!(auth.credentials().is_none());
    }

    #[tokio::test]
    async fn test_deadline_expiry_is_request_failure() {
        let mut connector = scripted(200, APPROVED);
        connector.delay = Duration::from_secs(30);
        let mut auth = Authenticator::with_connector(connector);
        auth.new_request(&config()).unwrap();

        let err = auth
            .process_with_deadline(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessError::Authentication(AuthenticationError::RequestFailure {
                step: NetworkStep::Deadline,
                ..
            })
        ));
        assert_eq!(auth.state(), AuthenticatorState::Failed);
    }

    #[tokio::test]
    async fn test_already_cancelled_token() {
        let mut auth = Authenticator::with_connector(scripted(200, APPROVED));
        auth.new_request(&config()).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let err = auth.process_with_cancellation(&token).await.unwrap_err();
        assert!(matches!(
            err,
            ProcessError::Authentication(AuthenticationError::RequestFailure {
                step: NetworkStep::Cancelled,
                ..
            })
        ));
        assert_eq!(auth.state(), AuthenticatorState::Failed);
    }

    #[test]
    fn test_debug_reports_state() {
        let auth = Authenticator::with_connector(scripted(200, APPROVED));
        let debug = format!("{auth:?}");
        assert!(debug.contains("Unprepared"));
    }
}
