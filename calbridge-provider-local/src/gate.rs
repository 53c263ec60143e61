//! Authorization gate for the local store.

use std::sync::Arc;

use calbridge_core::auth::{AuthorizationStatus, Proceed, SingleFlight};
use calbridge_core::error::{CalendarError, CalendarResult};

use crate::store::CalendarStore;

/// Decides whether a local operation may proceed, asking for access when
/// the store has never been asked.
pub struct LocalAuthorizationGate {
    store: Arc<dyn CalendarStore>,
    request: SingleFlight<Proceed>,
}

impl LocalAuthorizationGate {
    pub fn new(store: Arc<dyn CalendarStore>) -> Self {
        LocalAuthorizationGate {
            store,
            request: SingleFlight::new(),
        }
    }

    /// Succeeds immediately when authorized. When undetermined, issues one
    /// access request shared by every concurrent caller. Denied and
    /// restricted stores fail straight away: they will not prompt again.
    pub async fn ensure_authorized(&self) -> CalendarResult<Proceed> {
        match self.store.authorization_status() {
            AuthorizationStatus::Authorized => Ok(Proceed::granted()),
            AuthorizationStatus::NotDetermined => {
                let store = self.store.clone();
                self.request
                    .run(move || async move {
                        tracing::debug!("requesting local calendar access");
                        match store.request_access().await {
                            Ok(true) => {
                                tracing::info!("local calendar access granted");
                                Ok(Proceed::granted())
                            }
                            Ok(false) => Err(CalendarError::AccessRequestDenied),
                            Err(e) => Err(CalendarError::underlying(e)),
                        }
                    })
                    .await
            }
            status @ (AuthorizationStatus::Denied | AuthorizationStatus::Restricted) => {
                tracing::debug!(%status, "local calendar access refused");
                Err(CalendarError::AuthorizationDenied(status))
            }
        }
    }
}
