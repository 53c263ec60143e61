//! Authorization states and shared pending requests.
//!
//! Both backends gate every operation: the local store behind an OS-style
//! permission state, the remote calendar behind an account sign-in. Asking
//! the user is a one-shot interactive step, so concurrent operations racing
//! the same gate must share one pending request instead of each starting
//! their own. `SingleFlight` provides that sharing.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};

use crate::error::CalendarResult;

/// Permission state of the local calendar store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// Never asked; an access request may be issued
    NotDetermined,
    Authorized,
    /// The user refused; the store will not prompt again
    Denied,
    /// Access is blocked by policy
    Restricted,
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            AuthorizationStatus::NotDetermined => "not_determined",
            AuthorizationStatus::Authorized => "authorized",
            AuthorizationStatus::Denied => "denied",
            AuthorizationStatus::Restricted => "restricted",
        };
        write!(f, "{}", s)
    }
}

/// Sign-in state of the remote account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    SignedOut,
    SignedIn,
}

/// Returned by a gate when an operation may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proceed(());

impl Proceed {
    pub fn granted() -> Self {
        Proceed(())
    }
}

type Flight<T> = Shared<BoxFuture<'static, CalendarResult<T>>>;
type Slot<T> = Mutex<Option<(u64, Flight<T>)>>;

/// Runs at most one request at a time; callers arriving while it is pending
/// attach to the same outcome.
pub struct SingleFlight<T: Clone + Send + Sync + 'static> {
    pending: Arc<Slot<T>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> Default for SingleFlight<T> {
    fn default() -> Self {
        SingleFlight {
            pending: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the pending request, or start one with `start` if none is pending.
    ///
    /// `start` is only invoked when this caller becomes the one issuing the
    /// request. The request clears the slot as soon as it completes, so any
    /// later call starts afresh even while earlier waiters have yet to resume.
    pub async fn run<F, Fut>(&self, start: F) -> CalendarResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CalendarResult<T>> + Send + 'static,
    {
        let flight = {
            let mut slot = lock(&self.pending);
            match slot.as_ref() {
                Some((_, flight)) => {
                    tracing::debug!("attaching to pending authorization request");
                    flight.clone()
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let request = start();
                    let owner = Arc::downgrade(&self.pending);

                    let flight = async move {
                        let outcome = request.await;
                        if let Some(pending) = owner.upgrade() {
                            clear(&pending, id);
                        }
                        outcome
                    }
                    .boxed()
                    .shared();

                    *slot = Some((id, flight.clone()));
                    flight
                }
            }
        };

        flight.await
    }
}

fn clear<T: Clone + Send + Sync + 'static>(pending: &Slot<T>, id: u64) {
    let mut slot = lock(pending);
    if slot.as_ref().is_some_and(|(current, _)| *current == id) {
        *slot = None;
    }
}

fn lock<T: Clone + Send + Sync + 'static>(
    pending: &Slot<T>,
) -> std::sync::MutexGuard<'_, Option<(u64, Flight<T>)>> {
    // The guarded value is always left consistent, so a poisoned lock is still usable
    pending
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CalendarError, Reason};
    use futures::channel::oneshot;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_request() {
        let flight = SingleFlight::<u32>::new();
        let started = Arc::new(AtomicUsize::new(0));

        let start = |started: Arc<AtomicUsize>| {
            move || async move {
                started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(7)
            }
        };

        let (a, b) = tokio::join!(
            flight.run(start(started.clone())),
            flight.run(start(started.clone()))
        );

        assert_eq!(a.unwrap(), 7);
        assert_eq!(b.unwrap(), 7);
        assert_eq!(started.load(Ordering::SeqCst), 1);

        let c = flight.run(start(started.clone())).await;
        assert_eq!(c.unwrap(), 7);
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_shared_then_cleared() {
        let flight = SingleFlight::<u32>::new();

        let (a, b) = tokio::join!(
            flight.run(|| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(CalendarError::Message(Reason::AuthorizationFail))
            }),
            flight.run(|| async { Ok(1) })
        );

        assert_eq!(a.unwrap_err().reason(), Some(Reason::AuthorizationFail));
        assert_eq!(b.unwrap_err().reason(), Some(Reason::AuthorizationFail));

        // Next call after completion issues a fresh request
        let c = flight.run(|| async { Ok(2) }).await;
        assert_eq!(c.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_finished_request_is_not_reused_by_late_callers() {
        let flight = SingleFlight::<u32>::new();
        let (release, released) = oneshot::channel::<()>();

        let first = flight.run(move || async move {
            let _ = released.await;
            Err(CalendarError::Message(Reason::AuthorizationFail))
        });
        let second = flight.run(|| async { Ok(1) });
        futures::pin_mut!(first, second);

        assert!(futures::poll!(first.as_mut()).is_pending());
        assert!(futures::poll!(second.as_mut()).is_pending());

        release.send(()).unwrap();
        let outcome = first.await;
        assert_eq!(outcome.unwrap_err().reason(), Some(Reason::AuthorizationFail));

        // `second` has not resumed yet; a newcomer still gets a fresh request
        let late = flight.run(|| async { Ok(3) }).await;
        assert_eq!(late.unwrap(), 3);

        let shared = second.await;
        assert_eq!(shared.unwrap_err().reason(), Some(Reason::AuthorizationFail));
    }
}
