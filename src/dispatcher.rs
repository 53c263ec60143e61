//! The facade routing each operation to the backend of every target.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use calbridge_core::backend::CalendarBackend;
use calbridge_core::config::CalbridgeConfig;
use calbridge_core::date_range::DateRange;
use calbridge_core::error::{CalendarError, CalendarResult};
use calbridge_core::target::{BackendTarget, RemoteTarget};
use calbridge_core::{AddMethod, AddOutcome, EventModel};
use calbridge_provider_google::google::{GoogleServiceFactory, GoogleSessionProvider};
use calbridge_provider_google::{RemoteBackend, ServiceFactory, SessionProvider, SignInCoordinator};
use calbridge_provider_local::{DirectoryStore, LocalBackend};
use futures::future::join_all;

/// Remote adapters are reused per (client id, calendar id)
type RemoteKey = (String, String);

/// Identity of a target; targets with equal keys reach the same calendar.
#[derive(Debug, PartialEq, Eq, Hash)]
enum TargetKey {
    Native,
    Remote(RemoteKey),
}

impl TargetKey {
    fn of(target: &BackendTarget) -> Self {
        match target {
            BackendTarget::Native => TargetKey::Native,
            BackendTarget::Remote(remote) => TargetKey::Remote(remote_key(remote)),
        }
    }
}

fn remote_key(target: &RemoteTarget) -> RemoteKey {
    (target.client_id.clone(), target.calendar_id.clone())
}

/// `targets` with later entries reaching an already listed calendar dropped.
fn distinct(targets: &[BackendTarget]) -> Vec<&BackendTarget> {
    let mut seen = HashSet::new();

    targets
        .iter()
        .filter(|target| {
            let first = seen.insert(TargetKey::of(target));
            if !first {
                tracing::debug!(%target, "skipping repeated target");
            }
            first
        })
        .collect()
}

/// Dispatches add/remove/list calls to the local backend and to remote
/// backends built on demand.
///
/// Completions are reported per target: each target's success or error
/// callback fires exactly once per call, as that target finishes. Failures
/// never escape as return values and leave the dispatcher usable.
pub struct CalendarDispatcher {
    local: Arc<LocalBackend>,
    sign_in: Arc<SignInCoordinator>,
    services: Arc<dyn ServiceFactory>,
    remotes: Mutex<HashMap<RemoteKey, Arc<RemoteBackend>>>,
}

impl CalendarDispatcher {
    pub fn new(
        local: LocalBackend,
        sessions: Arc<dyn SessionProvider>,
        services: Arc<dyn ServiceFactory>,
    ) -> Self {
        CalendarDispatcher {
            local: Arc::new(local),
            sign_in: Arc::new(SignInCoordinator::new(sessions)),
            services,
            remotes: Mutex::new(HashMap::new()),
        }
    }

    /// Directory-backed local calendar plus Google, as configured.
    pub fn from_config(config: &CalbridgeConfig) -> Result<Self> {
        let tz = config.resolve_time_zone()?;
        let calendar_dir = config.calendar_dir();

        tracing::debug!(dir = %calendar_dir.display(), %tz, "using local calendar directory");
        let store =
            DirectoryStore::new(calendar_dir, tz).create_if_missing(config.local.create_if_missing);

        Ok(Self::new(
            LocalBackend::new(Arc::new(store), tz),
            Arc::new(GoogleSessionProvider::from_settings(&config.remote)?),
            Arc::new(GoogleServiceFactory::from_settings(&config.remote)),
        ))
    }

    /// The local backend, e.g. to subscribe to editing-ended notifications.
    pub fn local(&self) -> &LocalBackend {
        &self.local
    }

    pub fn sign_in(&self) -> &SignInCoordinator {
        &self.sign_in
    }

    /// Add `method`'s event to every distinct target in `targets`.
    ///
    /// A modal add that presented an editor fires neither callback; its
    /// result arrives through the local backend's editing-ended
    /// notification.
    pub async fn add<S, E>(
        &self,
        method: AddMethod,
        targets: &[BackendTarget],
        on_success: S,
        on_error: E,
    ) where
        S: Fn(&BackendTarget, String),
        E: Fn(&BackendTarget, CalendarError),
    {
        let on_success = &on_success;
        let on_error = &on_error;

        join_all(distinct(targets).into_iter().map(|target| {
            let method = method.clone();
            async move {
                let backend = self.backend(target);
                tracing::debug!(%target, "dispatching add");

                match backend.add_event(method).await {
                    Ok(AddOutcome::Added(status)) => on_success(target, status),
                    Ok(AddOutcome::EditorPresented) => {
                        tracing::debug!(%target, "editor presented");
                    }
                    Err(e) => on_error(target, e),
                }
            }
        }))
        .await;
    }

    /// Remove `event` from every distinct target in `targets`, searching
    /// `range` where the backend supports it.
    pub async fn remove<S, E>(
        &self,
        event: &EventModel,
        targets: &[BackendTarget],
        range: Option<DateRange>,
        on_success: S,
        on_error: E,
    ) where
        S: Fn(&BackendTarget, String),
        E: Fn(&BackendTarget, CalendarError),
    {
        let on_success = &on_success;
        let on_error = &on_error;

        join_all(distinct(targets).into_iter().map(|target| async move {
            let backend = self.backend(target);
            tracing::debug!(%target, "dispatching remove");

            match backend.remove_event(event, range).await {
                Ok(status) => on_success(target, status),
                Err(e) => on_error(target, e),
            }
        }))
        .await;
    }

    /// Events of `target` overlapping `range`.
    pub async fn events(
        &self,
        target: &BackendTarget,
        range: &DateRange,
    ) -> CalendarResult<Vec<EventModel>> {
        self.backend(target).events(range).await
    }

    /// Whether `target` already holds an event matching `event`.
    pub async fn event_exists(
        &self,
        target: &BackendTarget,
        event: &EventModel,
    ) -> CalendarResult<bool> {
        self.backend(target).event_exists(event).await
    }

    fn backend(&self, target: &BackendTarget) -> Arc<dyn CalendarBackend> {
        match target {
            BackendTarget::Native => self.local.clone(),
            BackendTarget::Remote(remote) => self.remote(remote),
        }
    }

    /// The adapter for `target`, built on first use. A reused adapter keeps
    /// the surface it was built with.
    fn remote(&self, target: &RemoteTarget) -> Arc<RemoteBackend> {
        let key = remote_key(target);
        let mut remotes = self
            .remotes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        remotes
            .entry(key)
            .or_insert_with(|| {
                tracing::debug!(?target, "creating remote backend");
                Arc::new(RemoteBackend::new(
                    target.clone(),
                    self.sign_in.clone(),
                    self.services.clone(),
                ))
            })
            .clone()
    }
}
