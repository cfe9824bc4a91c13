//! Local HTTP listener that captures the OAuth redirect.
//!
//! Every request, on any path, gets a `200 text/html` acknowledgement page so
//! the browser never shows an error for reloads or favicon requests. A
//! non-empty `code` query parameter is published into the
//! [`SecretPublisher`]; only the first one is delivered. When an expected
//! `state` is configured, redirects carrying any other value are
//! acknowledged but not published.
//!
//! **Shutdown model:** cancelling the [`CancellationToken`] starts axum's
//! graceful shutdown. A watcher task gives in-flight connections up to the
//! configured timeout to drain, aborts the server if they don't, then closes
//! the publisher so a waiter that never got a code observes `Closed`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::secret_channel::SecretPublisher;
use crate::error::AuthError;

#[derive(Debug, Default, Deserialize)]
struct RedirectParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Clone)]
struct RedirectContext {
    publisher: SecretPublisher,
    expected_state: Option<Arc<str>>,
}

impl RedirectContext {
    fn accepts(&self, state: Option<&str>) -> bool {
        match &self.expected_state {
            Some(expected) => state == Some(expected.as_ref()),
            None => true,
        }
    }
}

/// Binds the redirect listener. See the module docs for the request and
/// shutdown contract.
pub struct CallbackListener;

impl CallbackListener {
    /// Bind `addr` and start serving in the background. With
    /// `expected_state` set, only redirects echoing that value deliver a code.
    ///
    /// Fails with [`AuthError::Bind`] if the port is unavailable; this is not
    /// retried.
    pub async fn bind(
        addr: SocketAddr,
        publisher: SecretPublisher,
        expected_state: Option<String>,
        cancel: CancellationToken,
        shutdown_timeout: Duration,
    ) -> Result<CallbackHandle, AuthError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AuthError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| AuthError::Bind {
            addr: addr.to_string(),
            source,
        })?;

        let app = Router::new()
            .fallback(handle_redirect)
            .with_state(RedirectContext {
                publisher: publisher.clone(),
                expected_state: expected_state.map(Arc::from),
            });

        let graceful = cancel.clone();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { graceful.cancelled().await })
                .await
        });

        let watch = cancel.clone();
        let watcher = tokio::spawn(async move {
            watch.cancelled().await;
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(Ok(Ok(()))) => {
                    tracing::debug!(port = local_addr.port(), "Redirect listener stopped");
                }
                Ok(Ok(Err(e))) => {
                    tracing::warn!("Redirect listener exited with error: {}", e);
                }
                Ok(Err(e)) => {
                    tracing::warn!("Redirect listener task failed: {}", e);
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = shutdown_timeout.as_secs(),
                        "Redirect listener did not drain in time, aborting"
                    );
                    server.abort();
                    // Wait for the abort so the socket is released.
                    let _ = server.await;
                }
            }
            publisher.close();
        });

        tracing::info!(addr = %local_addr, "Redirect listener started");

        Ok(CallbackHandle {
            local_addr,
            cancel,
            watcher: Some(watcher),
        })
    }
}

/// Handle to a running [`CallbackListener`]. Dropping it cancels the
/// listener without waiting for it.
pub struct CallbackHandle {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    watcher: Option<JoinHandle<()>>,
}

impl CallbackHandle {
    /// The address actually bound (resolves port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Cancel the listener and wait until the port is released and the
    /// channel is closed.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(watcher) = self.watcher.take() {
            if let Err(e) = watcher.await {
                tracing::warn!("Redirect listener watcher failed: {}", e);
            }
        }
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn handle_redirect(
    State(context): State<RedirectContext>,
    params: Option<Query<RedirectParams>>,
) -> Html<String> {
    let params = params.map(|Query(p)| p).unwrap_or_default();
    let mut code = params.code.unwrap_or_default();

    if !code.is_empty() && !context.accepts(params.state.as_deref()) {
        tracing::warn!("Ignoring redirect with an unexpected state parameter");
        code.clear();
    }

    if !code.is_empty() {
        if context.publisher.publish(code.as_str()) {
            tracing::info!("Authorization code received");
        } else {
            tracing::debug!("Ignoring repeated authorization redirect");
        }
    }

    Html(render_page(&code))
}

fn render_page(code: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>calmate authorization</title>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body>
  <h1>Authorization code:</h1>
  <pre>{}</pre>
  <p>You can close this page once calmate reports that authorization succeeded.</p>
</body>
</html>
"#,
        escape_html(code)
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
