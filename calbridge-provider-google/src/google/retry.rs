//! Retry of transient Google API failures.

use std::future::Future;
use std::io;
use std::time::Duration;

use anyhow::Result;
use google_calendar::ClientError;

const INITIAL_DELAY: Duration = Duration::from_millis(500);

/// HTTP statuses worth another attempt
const TRANSIENT_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Exponential back-off whose total waiting time stays within
/// `max_interval`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    initial_delay: Duration,
    max_interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_interval: Duration) -> Self {
        RetryPolicy {
            initial_delay: INITIAL_DELAY,
            max_interval,
        }
    }

    /// Run `attempt` until it succeeds, fails permanently, or the next
    /// wait would exceed the budget. The last error is returned.
    pub async fn run<T, F, Fut>(&self, what: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.initial_delay;
        let mut waited = Duration::ZERO;

        loop {
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !is_transient(&err) || waited + delay > self.max_interval {
                return Err(err);
            }

            tracing::debug!(what, error = %err, ?delay, "transient failure, retrying");
            tokio::time::sleep(delay).await;
            waited += delay;
            delay *= 2;
        }
    }
}

/// Whether any cause of `err` is a retryable HTTP status or a timed-out or
/// dropped connection. Context messages are never inspected.
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(client_error) = cause.downcast_ref::<ClientError>() {
            return match client_error {
                ClientError::HttpError { status, .. } => is_transient_status(status.as_u16()),
                ClientError::ReqwestError(e) => e.is_timeout() || e.is_connect(),
                _ => false,
            };
        }

        cause.downcast_ref::<io::Error>().is_some_and(|e| {
            matches!(
                e.kind(),
                io::ErrorKind::TimedOut
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            )
        })
    })
}

pub fn is_transient_status(status: u16) -> bool {
    TRANSIENT_STATUSES.contains(&status)
}
