//! The remote backend: capability interface over a `CalendarService`.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use calbridge_core::backend::CalendarBackend;
use calbridge_core::date_range::DateRange;
use calbridge_core::error::{CalendarError, CalendarResult, Reason};
use calbridge_core::matcher::{find_match, is_same_event};
use calbridge_core::target::RemoteTarget;
use calbridge_core::{AddMethod, AddOutcome, EventModel};

use crate::auth::SignInCoordinator;
use crate::convert::{FromGoogle, ToGoogle};
use crate::service::{CalendarService, ServiceFactory};

/// A service handle and the access token it was built with.
struct CachedService {
    access_token: String,
    service: Arc<dyn CalendarService>,
}

pub struct RemoteBackend {
    target: RemoteTarget,
    coordinator: Arc<SignInCoordinator>,
    factory: Arc<dyn ServiceFactory>,
    service: Mutex<Option<CachedService>>,
}

impl RemoteBackend {
    pub fn new(
        target: RemoteTarget,
        coordinator: Arc<SignInCoordinator>,
        factory: Arc<dyn ServiceFactory>,
    ) -> Self {
        RemoteBackend {
            target,
            coordinator,
            factory,
            service: Mutex::new(None),
        }
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    /// Sign in, then hand out the service handle for the current session.
    ///
    /// The handle is rebuilt whenever the session's access token changes,
    /// e.g. after a refresh or a new sign-in.
    async fn service(&self) -> CalendarResult<Arc<dyn CalendarService>> {
        let session = self
            .coordinator
            .ensure_signed_in(self.target.surface.clone(), &self.target.client_id)
            .await?;

        let mut cached = self.service.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(current) = cached.as_ref()
            && current.access_token == session.access_token
        {
            return Ok(current.service.clone());
        }

        if cached.is_some() {
            tracing::debug!(
                client_id = %self.target.client_id,
                "session changed, rebuilding calendar service"
            );
        }

        let Some(service) = self.factory.build(&session, &self.target.client_id) else {
            tracing::warn!(
                client_id = %self.target.client_id,
                "no calendar service for signed-in session"
            );
            return Err(Reason::ServiceUnavailable.into());
        };

        *cached = Some(CachedService {
            access_token: session.access_token,
            service: service.clone(),
        });
        Ok(service)
    }

    async fn list(
        &self,
        service: &dyn CalendarService,
        range: Option<&DateRange>,
    ) -> CalendarResult<Vec<EventModel>> {
        if range.is_some_and(|r| !r.is_valid()) {
            return Err(Reason::ListUnavailable.into());
        }

        let response = service
            .list(&self.target.calendar_id, range)
            .await
            .map_err(CalendarError::underlying)?;

        let events = response
            .body
            .into_iter()
            .filter(|e| e.status != "cancelled")
            .filter_map(|e| match EventModel::from_google(e) {
                Ok(event) => Some(event),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable remote event");
                    None
                }
            })
            .collect();

        Ok(events)
    }
}

#[async_trait]
impl CalendarBackend for RemoteBackend {
    async fn add_event(&self, method: AddMethod) -> CalendarResult<AddOutcome> {
        let event = match method {
            AddMethod::Easy(event) => event,
            AddMethod::FromModal(_) => return Err(Reason::ModalNotAvailable.into()),
        };

        let service = self.service().await?;
        event.validate()?;

        // Let google assign the id
        let mut google_event = event.to_google();
        google_event.id = String::new();

        let response = service
            .insert(&self.target.calendar_id, &google_event)
            .await
            .map_err(CalendarError::underlying)?;

        tracing::info!(
            calendar_id = %self.target.calendar_id,
            id = %response.body.id,
            status = response.status,
            "added remote event"
        );
        Ok(AddOutcome::Added(format!(
            "Remote calendar event added (status {})",
            response.status
        )))
    }

    /// Searches the whole calendar; `range` only bounds local removals.
    async fn remove_event(
        &self,
        event: &EventModel,
        _range: Option<DateRange>,
    ) -> CalendarResult<String> {
        let service = self.service().await?;
        let events = self.list(service.as_ref(), None).await?;

        let Some(event_id) = find_match(event, &events).and_then(|m| m.id.clone()) else {
            return Err(Reason::CantFindEvent.into());
        };

        let response = service
            .delete(&self.target.calendar_id, &event_id)
            .await
            .map_err(CalendarError::underlying)?;

        tracing::info!(
            calendar_id = %self.target.calendar_id,
            id = %event_id,
            status = response.status,
            "removed remote event"
        );
        Ok(format!(
            "Remote calendar event removed (status {})",
            response.status
        ))
    }

    async fn events(&self, range: &DateRange) -> CalendarResult<Vec<EventModel>> {
        let service = self.service().await?;
        self.list(service.as_ref(), Some(range)).await
    }

    async fn event_exists(&self, event: &EventModel) -> CalendarResult<bool> {
        let service = self.service().await?;
        let window = DateRange::new(event.start, event.end);
        let events = self.list(service.as_ref(), Some(&window)).await?;

        Ok(events.iter().any(|candidate| is_same_event(event, candidate)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::auth::{Session, SessionProvider, SignInRequest};
    use crate::service::ServiceResponse;
    use calbridge_core::target::PresentationSurface;
    use chrono::{DateTime, TimeZone, Utc};
    use google_calendar::types::Event as GoogleEvent;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
    }

    fn standup() -> EventModel {
        EventModel::new(at(10, 9, 0), at(10, 9, 30), "Standup")
    }

    struct NoSurface;

    impl PresentationSurface for NoSurface {
        fn present_sign_in(&self, _url: &str) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingProvider {
        sign_ins: AtomicUsize,
    }

    #[async_trait]
    impl SessionProvider for CountingProvider {
        async fn current_session(&self, _client_id: &str) -> Option<Session> {
            None
        }

        async fn sign_in(&self, _request: SignInRequest) -> anyhow::Result<Session> {
            let n = self.sign_ins.fetch_add(1, Ordering::SeqCst);
            Ok(Session {
                access_token: format!("token-{}", n),
                refresh_token: "refresh".to_string(),
                expires_at: None,
            })
        }
    }

    #[derive(Default)]
    struct FakeService {
        events: Mutex<Vec<GoogleEvent>>,
        next_id: AtomicUsize,
        listed_ranges: Mutex<Vec<Option<DateRange>>>,
    }

    #[async_trait]
    impl CalendarService for FakeService {
        async fn insert(
            &self,
            _calendar_id: &str,
            event: &GoogleEvent,
        ) -> anyhow::Result<ServiceResponse<GoogleEvent>> {
            let mut event = event.clone();
            event.id = format!("g-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            self.events.lock().unwrap().push(event.clone());
            Ok(ServiceResponse::new(200, event))
        }

        async fn list(
            &self,
            _calendar_id: &str,
            range: Option<&DateRange>,
        ) -> anyhow::Result<ServiceResponse<Vec<GoogleEvent>>> {
            self.listed_ranges.lock().unwrap().push(range.copied());
            Ok(ServiceResponse::new(200, self.events.lock().unwrap().clone()))
        }

        async fn delete(
            &self,
            _calendar_id: &str,
            event_id: &str,
        ) -> anyhow::Result<ServiceResponse<()>> {
            self.events.lock().unwrap().retain(|e| e.id != event_id);
            Ok(ServiceResponse::new(204, ()))
        }
    }

    struct FakeFactory {
        service: Option<Arc<FakeService>>,
        builds: AtomicUsize,
        tokens: Mutex<Vec<String>>,
    }

    impl ServiceFactory for FakeFactory {
        fn build(&self, session: &Session, _client_id: &str) -> Option<Arc<dyn CalendarService>> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            self.tokens
                .lock()
                .unwrap()
                .push(session.access_token.clone());
            self.service
                .clone()
                .map(|s| s as Arc<dyn CalendarService>)
        }
    }

    struct Fixture {
        provider: Arc<CountingProvider>,
        coordinator: Arc<SignInCoordinator>,
        service: Arc<FakeService>,
        factory: Arc<FakeFactory>,
        backend: RemoteBackend,
    }

    fn fixture(with_service: bool) -> Fixture {
        let provider = Arc::new(CountingProvider::default());
        let service = Arc::new(FakeService::default());
        let factory = Arc::new(FakeFactory {
            service: with_service.then(|| service.clone()),
            builds: AtomicUsize::new(0),
            tokens: Mutex::new(Vec::new()),
        });
        let coordinator = Arc::new(SignInCoordinator::new(provider.clone()));
        let target = RemoteTarget::new(Arc::new(NoSurface), "client");
        let backend = RemoteBackend::new(target, coordinator.clone(), factory.clone());

        Fixture {
            provider,
            coordinator,
            service,
            factory,
            backend,
        }
    }

    #[tokio::test]
    async fn test_modal_is_unavailable_without_sign_in() {
        let f = fixture(true);

        for draft in [None, Some(standup())] {
            let err = f
                .backend
                .add_event(AddMethod::FromModal(draft))
                .await
                .unwrap_err();
            assert_eq!(err.reason(), Some(Reason::ModalNotAvailable));
        }

        assert_eq!(f.provider.sign_ins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_reports_status_and_skips_duplicate_check() {
        let f = fixture(true);

        for _ in 0..2 {
            let outcome = f
                .backend
                .add_event(AddMethod::Easy(standup()))
                .await
                .unwrap();
            assert_eq!(
                outcome,
                AddOutcome::Added("Remote calendar event added (status 200)".to_string())
            );
        }

        assert_eq!(f.service.events.lock().unwrap().len(), 2);
        assert_eq!(f.provider.sign_ins.load(Ordering::SeqCst), 1);
        assert_eq!(f.factory.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remove_by_structural_match() {
        let f = fixture(true);
        f.backend
            .add_event(AddMethod::Easy(standup()))
            .await
            .unwrap();

        let status = f
            .backend
            .remove_event(&standup().with_id("unknown"), None)
            .await
            .unwrap();

        assert_eq!(status, "Remote calendar event removed (status 204)");
        assert!(f.service.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_searches_whole_calendar() {
        let f = fixture(true);
        f.backend
            .add_event(AddMethod::Easy(standup()))
            .await
            .unwrap();

        let february = DateRange::new(
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap(),
        );
        f.backend
            .remove_event(&standup(), Some(february))
            .await
            .unwrap();

        assert!(f.service.events.lock().unwrap().is_empty());
        assert_eq!(*f.service.listed_ranges.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_new_session_rebuilds_service() {
        let f = fixture(true);
        f.backend
            .add_event(AddMethod::Easy(standup()))
            .await
            .unwrap();

        f.coordinator.sign_out();
        f.backend
            .add_event(AddMethod::Easy(standup()))
            .await
            .unwrap();
        f.backend.event_exists(&standup()).await.unwrap();

        assert_eq!(
            *f.factory.tokens.lock().unwrap(),
            vec!["token-0".to_string(), "token-1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_service() {
        let f = fixture(true);

        let probe = standup();
        let (a, b) = tokio::join!(
            f.backend.add_event(AddMethod::Easy(standup())),
            f.backend.event_exists(&probe)
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(f.provider.sign_ins.load(Ordering::SeqCst), 1);
        assert_eq!(f.factory.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remove_without_match_fails() {
        let f = fixture(true);
        f.backend
            .add_event(AddMethod::Easy(standup()))
            .await
            .unwrap();

        let other = EventModel::new(at(11, 9, 0), at(11, 9, 30), "Retro");
        let err = f.backend.remove_event(&other, None).await.unwrap_err();

        assert_eq!(err.reason(), Some(Reason::CantFindEvent));
        assert_eq!(f.service.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_service_is_unavailable() {
        let f = fixture(false);

        let err = f
            .backend
            .add_event(AddMethod::Easy(standup()))
            .await
            .unwrap_err();

        assert_eq!(err.reason(), Some(Reason::ServiceUnavailable));
        assert_eq!(f.provider.sign_ins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_event_exists_uses_identity_match() {
        let f = fixture(true);
        f.backend
            .add_event(AddMethod::Easy(standup()))
            .await
            .unwrap();

        assert!(f.backend.event_exists(&standup()).await.unwrap());

        let other = EventModel::new(at(10, 9, 0), at(10, 9, 30), "Retro");
        assert!(!f.backend.event_exists(&other).await.unwrap());
    }

    #[tokio::test]
    async fn test_listed_events_carry_remote_ids() {
        let f = fixture(true);
        f.backend
            .add_event(AddMethod::Easy(standup()))
            .await
            .unwrap();

        let range = DateRange::new(at(1, 0, 0), at(31, 0, 0));
        let events = f.backend.events(&range).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_deref(), Some("g-0"));
        assert_eq!(events[0].title, "Standup");
    }
}
