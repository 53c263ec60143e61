use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use calbridge::CalendarDispatcher;
use calbridge_core::auth::AuthorizationStatus;
use calbridge_core::date_range::DateRange;
use calbridge_core::error::{CalendarError, Reason};
use calbridge_core::target::{BackendTarget, PresentationSurface};
use calbridge_core::{AddMethod, EventModel};
use calbridge_provider_google::{
    CalendarService, GoogleEvent, ServiceFactory, ServiceResponse, Session, SessionProvider,
    SignInRequest,
};
use calbridge_provider_local::{DirectoryStore, LocalBackend, MemoryStore};
use chrono::{DateTime, TimeZone, Utc};

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, minute, 0).unwrap()
}

fn standup() -> EventModel {
    EventModel::new(at(10, 9, 0), at(10, 9, 30), "Standup")
}

fn january() -> DateRange {
    DateRange::new(at(1, 0, 0), at(31, 0, 0))
}

struct CountingSurface {
    presentations: AtomicUsize,
}

impl PresentationSurface for CountingSurface {
    fn present_sign_in(&self, _url: &str) -> std::io::Result<()> {
        self.presentations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Signs in after a delay, presenting on the request's surface
#[derive(Default)]
struct SlowSignIn {
    sign_ins: AtomicUsize,
}

#[async_trait]
impl SessionProvider for SlowSignIn {
    async fn current_session(&self, _client_id: &str) -> Option<Session> {
        None
    }

    async fn sign_in(&self, request: SignInRequest) -> anyhow::Result<Session> {
        self.sign_ins.fetch_add(1, Ordering::SeqCst);
        request.surface.present_sign_in("https://accounts.example/consent")?;
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(Session {
            access_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: None,
        })
    }
}

#[derive(Default)]
struct RemoteCalendar {
    events: Mutex<Vec<GoogleEvent>>,
    next_id: AtomicUsize,
}

#[async_trait]
impl CalendarService for RemoteCalendar {
    async fn insert(
        &self,
        _calendar_id: &str,
        event: &GoogleEvent,
    ) -> anyhow::Result<ServiceResponse<GoogleEvent>> {
        let mut event = event.clone();
        event.id = format!("remote-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.events.lock().unwrap().push(event.clone());
        Ok(ServiceResponse::new(200, event))
    }

    async fn list(
        &self,
        _calendar_id: &str,
        _range: Option<&DateRange>,
    ) -> anyhow::Result<ServiceResponse<Vec<GoogleEvent>>> {
        Ok(ServiceResponse::new(200, self.events.lock().unwrap().clone()))
    }

    async fn delete(&self, _calendar_id: &str, event_id: &str) -> anyhow::Result<ServiceResponse<()>> {
        self.events.lock().unwrap().retain(|e| e.id != event_id);
        Ok(ServiceResponse::new(204, ()))
    }
}

struct SharedCalendar(Arc<RemoteCalendar>);

impl ServiceFactory for SharedCalendar {
    fn build(&self, _session: &Session, _client_id: &str) -> Option<Arc<dyn CalendarService>> {
        Some(self.0.clone())
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    sessions: Arc<SlowSignIn>,
    remote: Arc<RemoteCalendar>,
    surface: Arc<CountingSurface>,
    dispatcher: CalendarDispatcher,
}

impl Harness {
    fn new(status: AuthorizationStatus) -> Self {
        let store = Arc::new(MemoryStore::new(status));
        let sessions = Arc::new(SlowSignIn::default());
        let remote = Arc::new(RemoteCalendar::default());
        let surface = Arc::new(CountingSurface {
            presentations: AtomicUsize::new(0),
        });

        let dispatcher = CalendarDispatcher::new(
            LocalBackend::new(store.clone(), chrono_tz::UTC),
            sessions.clone(),
            Arc::new(SharedCalendar(remote.clone())),
        );

        Harness {
            store,
            sessions,
            remote,
            surface,
            dispatcher,
        }
    }

    fn remote_target(&self) -> BackendTarget {
        BackendTarget::remote(self.surface.clone(), "client.apps.googleusercontent.com")
    }
}

/// Per-target completions, as "<target>" -> Ok(status) / Err(error)
#[derive(Default)]
struct Completions(Mutex<Vec<(String, Result<String, CalendarError>)>>);

impl Completions {
    fn success(&self, target: &BackendTarget, status: String) {
        self.0.lock().unwrap().push((target.to_string(), Ok(status)));
    }

    fn error(&self, target: &BackendTarget, error: CalendarError) {
        self.0.lock().unwrap().push((target.to_string(), Err(error)));
    }

    fn take(&self) -> Vec<(String, Result<String, CalendarError>)> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

#[tokio::test]
async fn test_add_to_native_then_duplicate() {
    let h = Harness::new(AuthorizationStatus::Authorized);
    let done = Completions::default();

    h.dispatcher
        .add(
            AddMethod::Easy(standup()),
            &[BackendTarget::Native],
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        )
        .await;

    let first = done.take();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].0, "native");
    assert!(first[0].1.is_ok());
    assert_eq!(h.store.all_events().len(), 1);

    h.dispatcher
        .add(
            AddMethod::Easy(standup()),
            &[BackendTarget::Native],
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        )
        .await;

    let second = done.take();
    assert_eq!(second.len(), 1);
    let err = second[0].1.as_ref().unwrap_err();
    assert_eq!(err.reason(), Some(Reason::EventAlreadyExists));
    assert_eq!(h.store.all_events().len(), 1);
}

#[tokio::test]
async fn test_remove_matches_structurally() {
    let h = Harness::new(AuthorizationStatus::Authorized);
    let done = Completions::default();

    h.dispatcher
        .add(
            AddMethod::Easy(standup()),
            &[BackendTarget::Native],
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        )
        .await;
    done.take();

    h.dispatcher
        .remove(
            &standup().with_id("not-a-store-id"),
            &[BackendTarget::Native],
            Some(january()),
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        )
        .await;

    let removed = done.take();
    assert!(removed[0].1.is_ok());
    assert!(h.store.all_events().is_empty());

    h.dispatcher
        .remove(
            &standup(),
            &[BackendTarget::Native],
            Some(january()),
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        )
        .await;

    let missing = done.take();
    let err = missing[0].1.as_ref().unwrap_err();
    assert_eq!(err.reason(), Some(Reason::CantFindEvent));
}

#[tokio::test]
async fn test_denied_local_access_reports_status() {
    let h = Harness::new(AuthorizationStatus::Denied);
    let done = Completions::default();

    h.dispatcher
        .add(
            AddMethod::Easy(standup()),
            &[BackendTarget::Native],
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        )
        .await;

    let results = done.take();
    assert!(matches!(
        results[0].1,
        Err(CalendarError::AuthorizationDenied(AuthorizationStatus::Denied))
    ));
    assert_eq!(h.store.access_requests(), 0);
}

#[tokio::test]
async fn test_remote_modal_fails_without_sign_in() {
    let h = Harness::new(AuthorizationStatus::Authorized);
    let done = Completions::default();

    h.dispatcher
        .add(
            AddMethod::FromModal(None),
            &[h.remote_target()],
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        )
        .await;

    let results = done.take();
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].1.as_ref().unwrap_err().reason(),
        Some(Reason::ModalNotAvailable)
    );
    assert_eq!(h.sessions.sign_ins.load(Ordering::SeqCst), 0);
    assert_eq!(h.surface.presentations.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_remote_adds_share_one_sign_in() {
    let h = Harness::new(AuthorizationStatus::Authorized);
    let done = Completions::default();
    let target = [h.remote_target()];
    let retro = EventModel::new(at(11, 9, 0), at(11, 9, 30), "Retro");

    tokio::join!(
        h.dispatcher.add(
            AddMethod::Easy(standup()),
            &target,
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        ),
        h.dispatcher.add(
            AddMethod::Easy(retro),
            &target,
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        ),
    );

    let results = done.take();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, r)| r.is_ok()));
    assert_eq!(h.sessions.sign_ins.load(Ordering::SeqCst), 1);
    assert_eq!(h.surface.presentations.load(Ordering::SeqCst), 1);
    assert_eq!(h.remote.events.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_each_target_completes_separately() {
    let h = Harness::new(AuthorizationStatus::Authorized);
    let done = Completions::default();
    let targets = [BackendTarget::Native, h.remote_target()];

    h.dispatcher
        .add(
            AddMethod::Easy(standup()),
            &targets,
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        )
        .await;
    done.take();

    // Second add: the local duplicate check fails, the remote add still goes through
    h.dispatcher
        .add(
            AddMethod::Easy(standup()),
            &targets,
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        )
        .await;

    let mut results = done.take();
    results.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "native");
    assert_eq!(
        results[0].1.as_ref().unwrap_err().reason(),
        Some(Reason::EventAlreadyExists)
    );
    assert_eq!(results[1].0, "remote:primary");
    assert!(results[1].1.as_ref().unwrap().contains("status 200"));
    assert_eq!(h.remote.events.lock().unwrap().len(), 2);

    let remote_events = h
        .dispatcher
        .events(&targets[1], &january())
        .await
        .unwrap();
    assert_eq!(remote_events.len(), 2);
    assert!(h.dispatcher.event_exists(&targets[0], &standup()).await.unwrap());
}

fn ics_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .path()
                .extension()
                .is_some_and(|e| e == "ics")
        })
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_repeated_targets_dispatch_once() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = Arc::new(RemoteCalendar::default());
    let dispatcher = CalendarDispatcher::new(
        LocalBackend::new(
            Arc::new(DirectoryStore::new(tmp.path(), chrono_tz::UTC)),
            chrono_tz::UTC,
        ),
        Arc::new(SlowSignIn::default()),
        Arc::new(SharedCalendar(remote.clone())),
    );
    let surface = Arc::new(CountingSurface {
        presentations: AtomicUsize::new(0),
    });
    let google = BackendTarget::remote(surface, "client.apps.googleusercontent.com");
    let done = Completions::default();

    dispatcher
        .add(
            AddMethod::Easy(standup()),
            &[
                BackendTarget::Native,
                google.clone(),
                BackendTarget::Native,
                google.clone(),
            ],
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        )
        .await;

    let added = done.take();
    assert_eq!(added.len(), 2);
    assert!(added.iter().all(|(_, result)| result.is_ok()));
    assert_eq!(ics_files(tmp.path()), 1);
    assert_eq!(remote.events.lock().unwrap().len(), 1);

    dispatcher
        .remove(
            &standup(),
            &[BackendTarget::Native, BackendTarget::Native],
            Some(january()),
            |t, s| done.success(t, s),
            |t, e| done.error(t, e),
        )
        .await;

    let removed = done.take();
    assert_eq!(removed.len(), 1);
    assert!(removed[0].1.is_ok());
    assert_eq!(ics_files(tmp.path()), 0);
}
