//! Interactive Google sign-in through the OAuth loopback redirect.

use anyhow::{Context, Result};
use async_trait::async_trait;
use calbridge_core::config::RemoteSettings;
use google_calendar::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use super::session_store::SessionStore;
use crate::auth::{Session, SessionProvider, SignInRequest};

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/calendar.events",
];

const CALLBACK_RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
    Content-Type: text/html\r\n\
    Connection: close\r\n\
    \r\n\
    <html><body>\
    <h1>Signed in</h1>\
    <p>You can close this window and return to the application.</p>\
    </body></html>";

pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{}/callback", port)
}

fn redirect_address(port: u16) -> String {
    format!("127.0.0.1:{}", port)
}

/// Sessions for Google OAuth clients: stored on disk, refreshed when
/// expired, obtained through the browser when missing.
pub struct GoogleSessionProvider {
    client_secret: String,
    redirect_port: u16,
    store: SessionStore,
}

impl GoogleSessionProvider {
    pub fn new(client_secret: impl Into<String>, redirect_port: u16, store: SessionStore) -> Self {
        GoogleSessionProvider {
            client_secret: client_secret.into(),
            redirect_port,
            store,
        }
    }

    pub fn from_settings(settings: &RemoteSettings) -> Result<Self> {
        let client_secret = settings.client_secret.clone().unwrap_or_else(|| {
            tracing::warn!("no [remote] client_secret configured; Google sign-in will likely fail");
            String::new()
        });

        Ok(Self::new(
            client_secret,
            settings.redirect_port,
            SessionStore::in_config_dir()?,
        ))
    }

    async fn refresh(&self, client_id: &str, session: &Session) -> Result<Session> {
        let client = Client::new(
            client_id.to_string(),
            self.client_secret.clone(),
            String::new(),
            session.access_token.clone(),
            session.refresh_token.clone(),
        );

        let tokens = client
            .refresh_access_token()
            .await
            .context("Failed to refresh token")?;

        let mut refreshed = Session::from(&tokens);
        // Google typically doesn't return a new refresh_token on refresh
        if refreshed.refresh_token.is_empty() {
            refreshed.refresh_token = session.refresh_token.clone();
        }

        self.store.save(client_id, &refreshed)?;
        Ok(refreshed)
    }
}

#[async_trait]
impl SessionProvider for GoogleSessionProvider {
    async fn current_session(&self, client_id: &str) -> Option<Session> {
        let stored = match self.store.load(client_id) {
            Ok(stored) => stored?,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable Google session");
                return None;
            }
        };

        if !stored.is_expired() {
            return Some(stored);
        }

        match self.refresh(client_id, &stored).await {
            Ok(session) => {
                tracing::debug!(client_id, "refreshed Google session");
                Some(session)
            }
            Err(e) => {
                tracing::warn!(client_id, error = %e, "could not refresh Google session");
                None
            }
        }
    }

    async fn sign_in(&self, request: SignInRequest) -> Result<Session> {
        let scopes: Vec<String> = SCOPES.iter().map(|s| s.to_string()).collect();

        let mut client = Client::new(
            request.client_id.clone(),
            self.client_secret.clone(),
            redirect_uri(self.redirect_port),
            String::new(),
            String::new(),
        );

        // Listen before presenting so a fast redirect is not missed
        let listener = TcpListener::bind(redirect_address(self.redirect_port))
            .await
            .context("Failed to bind OAuth callback listener")?;

        let consent_url = client.user_consent_url(&scopes);
        request
            .surface
            .present_sign_in(&consent_url)
            .context("Failed to present the sign-in page")?;

        let (code, state) = wait_for_callback(&listener).await?;

        tracing::debug!("received authorization code, exchanging for tokens");
        let tokens = client
            .get_access_token(&code, &state)
            .await
            .context("Failed to exchange authorization code")?;

        let session = Session::from(&tokens);
        self.store.save(&request.client_id, &session)?;

        tracing::info!(client_id = %request.client_id, "signed in to Google");
        Ok(session)
    }
}

async fn wait_for_callback(listener: &TcpListener) -> Result<(String, String)> {
    let (stream, _) = listener
        .accept()
        .await
        .context("Failed to accept OAuth callback")?;

    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .await
        .context("Failed to read OAuth callback request line")?;

    let params = parse_callback(&request_line)?;

    let mut stream = reader.into_inner();
    stream
        .write_all(CALLBACK_RESPONSE.as_bytes())
        .await
        .context("Failed to write OAuth callback response")?;
    stream.flush().await?;

    Ok(params)
}

/// Code and state from the redirect's request line
/// (`GET /callback?code=...&state=... HTTP/1.1`).
fn parse_callback(request_line: &str) -> Result<(String, String)> {
    let url_part = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("Invalid HTTP request"))?;

    let url = url::Url::parse(&format!("http://localhost{}", url_part))?;

    if let Some((_, error)) = url.query_pairs().find(|(k, _)| k == "error") {
        anyhow::bail!("Sign-in was not completed: {}", error);
    }

    let code = url
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
        .ok_or_else(|| anyhow::anyhow!("No code in callback"))?;

    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())
        .ok_or_else(|| anyhow::anyhow!("No state in callback"))?;

    Ok((code, state))
}
