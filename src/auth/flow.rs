//! Browser-based OAuth authorization-code flow.
//!
//! `Idle -> AwaitingRedirect -> Exchanging -> Complete | Failed`
//!
//! The redirect listener only captures one opaque string; the token exchange
//! happens here, after the code has been handed over. Once the listener is
//! bound it is shut down on every exit path.

use std::net::SocketAddr;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use super::callback_listener::{CallbackHandle, CallbackListener};
use super::credentials::{OAuthClientConfig, OAuthToken};
use super::secret_channel::{secret_channel, ChannelOutcome, SecretWaiter};
use crate::error::AuthError;

/// Scope required by the calendar tools.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingRedirect,
    Exchanging,
    Complete,
    Failed,
}

/// Where to listen and how long to wait.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Address the redirect listener binds. Port `0` picks a free port.
    pub bind_addr: SocketAddr,
    /// Host used in the `redirect_uri` (must match the registered client).
    pub redirect_host: String,
    /// `None` waits for the redirect indefinitely.
    pub redirect_timeout: Option<Duration>,
    pub shutdown_timeout: Duration,
    pub scope: String,
    /// Echoed back on the redirect; fresh per run.
    pub state_token: String,
}

impl FlowSettings {
    pub fn for_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], port)),
            redirect_host: "localhost".to_string(),
            redirect_timeout: Some(Duration::from_secs(300)),
            shutdown_timeout: Duration::from_secs(10),
            scope: CALENDAR_SCOPE.to_string(),
            state_token: Uuid::new_v4().simple().to_string(),
        }
    }
}

pub struct AuthorizationFlow {
    client: OAuthClientConfig,
    settings: FlowSettings,
    http: reqwest::Client,
    state: FlowState,
}

impl AuthorizationFlow {
    pub fn new(client: OAuthClientConfig, settings: FlowSettings) -> Self {
        Self {
            client,
            settings,
            http: reqwest::Client::new(),
            state: FlowState::Idle,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Run the flow to completion.
    ///
    /// `present` receives the authorization URL once the listener is ready;
    /// the CLI prints it for the operator to open.
    pub async fn run<F>(&mut self, present: F) -> Result<OAuthToken, AuthError>
    where
        F: FnOnce(&Url),
    {
        let (publisher, waiter) = secret_channel();
        let cancel = CancellationToken::new();

        let listener = match CallbackListener::bind(
            self.settings.bind_addr,
            publisher,
            Some(self.settings.state_token.clone()),
            cancel,
            self.settings.shutdown_timeout,
        )
        .await
        {
            Ok(listener) => listener,
            Err(e) => {
                self.transition(FlowState::Failed);
                return Err(e);
            }
        };

        let result = self.authorize(&listener, waiter, present).await;

        // Cleanup runs whether or not the exchange succeeded.
        listener.shutdown().await;

        match &result {
            Ok(_) => self.transition(FlowState::Complete),
            Err(e) => {
                tracing::error!("Authorization failed: {}", e);
                self.transition(FlowState::Failed);
            }
        }
        result
    }

    async fn authorize<F>(
        &mut self,
        listener: &CallbackHandle,
        waiter: SecretWaiter,
        present: F,
    ) -> Result<OAuthToken, AuthError>
    where
        F: FnOnce(&Url),
    {
        let redirect_uri = format!(
            "http://{}:{}/",
            self.settings.redirect_host,
            listener.local_addr().port()
        );
        let auth_url = self.authorization_url(&redirect_uri)?;

        self.transition(FlowState::AwaitingRedirect);
        present(&auth_url);

        let code = match waiter.wait(self.settings.redirect_timeout).await {
            ChannelOutcome::Delivered(code) => code,
            ChannelOutcome::Closed => return Err(AuthError::ChannelClosed),
            ChannelOutcome::TimedOut => {
                return Err(AuthError::RedirectTimeout(
                    self.settings.redirect_timeout.unwrap_or_default(),
                ));
            }
        };

        self.transition(FlowState::Exchanging);
        self.exchange_code(&code, &redirect_uri).await
    }

    /// Build the consent URL, requesting offline (refresh-capable) access.
    pub fn authorization_url(&self, redirect_uri: &str) -> Result<Url, AuthError> {
        Url::parse_with_params(
            &self.client.auth_uri,
            &[
                ("access_type", "offline"),
                ("client_id", self.client.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", self.settings.scope.as_str()),
                ("state", self.settings.state_token.as_str()),
            ],
        )
        .map_err(|e| AuthError::AuthUrl(format!("{}: {e}", self.client.auth_uri)))
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthToken, AuthError> {
        let resp = self
            .http
            .post(&self.client.token_uri)
            .form(&[
                ("code", code),
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        resp.json::<OAuthToken>()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("invalid token response: {e}")))
    }

    fn transition(&mut self, next: FlowState) {
        tracing::debug!(from = ?self.state, to = ?next, "Authorization flow transition");
        self.state = next;
    }
}
