//! Account sign-in for the remote backend.

use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use calbridge_core::auth::{SessionState, SingleFlight};
use calbridge_core::error::{CalendarError, CalendarResult, Reason};
use calbridge_core::target::PresentationSurface;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth tokens of a signed-in account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Holds an access token that has not expired.
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }
}

/// An interactive sign-in, presented on `surface`.
#[derive(Clone)]
pub struct SignInRequest {
    pub surface: Arc<dyn PresentationSurface>,
    pub client_id: String,
}

/// Where sessions come from.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// A previously stored session for `client_id`, refreshed if it expired.
    /// Never prompts.
    async fn current_session(&self, client_id: &str) -> Option<Session>;

    /// Run the interactive sign-in flow.
    async fn sign_in(&self, request: SignInRequest) -> Result<Session>;
}

/// Owns the signed-in session of one dispatcher.
///
/// The session is looked up (or signed in) on first need and cached
/// afterwards. Concurrent callers that find no session share one sign-in
/// flow.
pub struct SignInCoordinator {
    provider: Arc<dyn SessionProvider>,
    session: Arc<RwLock<Option<Session>>>,
    flight: SingleFlight<Session>,
}

impl SignInCoordinator {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        SignInCoordinator {
            provider,
            session: Arc::new(RwLock::new(None)),
            flight: SingleFlight::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        match cached(&self.session) {
            Some(_) => SessionState::SignedIn,
            None => SessionState::SignedOut,
        }
    }

    /// Forget the cached session. The next operation signs in again.
    pub fn sign_out(&self) {
        store(&self.session, None);
    }

    /// The current session, signing in through `surface` if there is none.
    ///
    /// Every failure to obtain a session is reported as
    /// `Message(AuthorizationFail)`; the cause is logged.
    pub async fn ensure_signed_in(
        &self,
        surface: Arc<dyn PresentationSurface>,
        client_id: &str,
    ) -> CalendarResult<Session> {
        if let Some(session) = cached(&self.session) {
            return Ok(session);
        }

        let provider = self.provider.clone();
        let cache = self.session.clone();
        let client_id = client_id.to_string();

        self.flight
            .run(move || async move {
                // A flight that finished just before this one started may have signed in
                if let Some(session) = cached(&cache) {
                    return Ok(session);
                }

                let session = match provider.current_session(&client_id).await {
                    Some(session) => session,
                    None => {
                        tracing::info!(client_id = %client_id, "starting interactive sign-in");
                        let request = SignInRequest {
                            surface,
                            client_id: client_id.clone(),
                        };
                        provider.sign_in(request).await.map_err(|e| {
                            tracing::warn!(client_id = %client_id, error = %e, "sign-in failed");
                            CalendarError::from(Reason::AuthorizationFail)
                        })?
                    }
                };

                if !session.is_usable() {
                    tracing::warn!(client_id = %client_id, "sign-in returned no usable access token");
                    return Err(Reason::AuthorizationFail.into());
                }

                store(&cache, Some(session.clone()));
                Ok(session)
            })
            .await
    }
}

fn cached(slot: &RwLock<Option<Session>>) -> Option<Session> {
    slot.read()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .as_ref()
        .filter(|s| s.is_usable())
        .cloned()
}

fn store(slot: &RwLock<Option<Session>>, session: Option<Session>) {
    *slot
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner) = session;
}
