//! Retry with exponential backoff for transient database and network failures.
//!
//! Database reads and idempotent uploads go through [`with_retry`]; database
//! writes are never replayed.

use std::future::Future;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

type RetryPredicate = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;
type RetryObserver = Arc<dyn Fn(u32, Duration, &anyhow::Error) + Send + Sync>;

const TRANSIENT_MESSAGES: [&str; 5] = [
    "connection",
    "timeout",
    "timed out",
    "deadlock",
    "too many connections",
];

const TRANSIENT_SQLSTATES: [&str; 8] = [
    "08000", "08001", "08003", "08006", "40001", "40P01", "53300", "57P01",
];

#[derive(Clone)]
pub struct RetryOptions {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    should_retry: Option<RetryPredicate>,
    on_retry: Option<RetryObserver>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
            should_retry: None,
            on_retry: None,
        }
    }
}

impl std::fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("backoff_factor", &self.backoff_factor)
            .field("custom_predicate", &self.should_retry.is_some())
            .finish()
    }
}

impl RetryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Replaces the transient-error classifier.
    #[must_use]
    pub fn with_should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    /// Observes each retry as `(attempt, delay, error)`. Attempts start at 1.
    #[must_use]
    pub fn with_on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, Duration, &anyhow::Error) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// Delay slept before retry number `retry` (0 based): `initial * factor^retry`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let nanos = self.initial_delay.as_nanos() as f64 * self.backoff_factor.powi(exponent);
        Duration::from_nanos(nanos.clamp(0.0, u64::MAX as f64).round() as u64)
    }

    fn is_retryable(&self, err: &anyhow::Error) -> bool {
        match &self.should_retry {
            Some(predicate) => predicate(err),
            None => is_transient(err),
        }
    }
}

/// Runs `operation`, retrying retryable failures with exponential backoff.
pub async fn with_retry<T, F, Fut>(options: &RetryOptions, mut operation: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut retry = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if retry >= options.max_retries || !options.is_retryable(&err) {
                    return Err(err);
                }

                let delay = options.delay_for_retry(retry);
                retry += 1;

                warn!(
                    attempt = retry,
                    max_retries = options.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retry: transient failure, retrying"
                );

                if let Some(observer) = &options.on_retry {
                    observer(retry, delay, &err);
                }

                sleep(delay).await;
            }
        }
    }
}

/// Default classifier for failures worth another attempt.
pub fn is_transient(err: &anyhow::Error) -> bool {
    for cause in err.chain() {
        if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
            if matches!(
                io_err.kind(),
                ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::NotConnected
                    | ErrorKind::BrokenPipe
                    | ErrorKind::TimedOut
            ) {
                return true;
            }
        }

        if let Some(diesel::result::Error::DatabaseError(kind, _)) =
            cause.downcast_ref::<diesel::result::Error>()
        {
            if matches!(
                kind,
                diesel::result::DatabaseErrorKind::ClosedConnection
                    | diesel::result::DatabaseErrorKind::SerializationFailure
            ) {
                return true;
            }
        }

        let message = cause.to_string();
        let lowered = message.to_ascii_lowercase();
        if TRANSIENT_MESSAGES.iter().any(|needle| lowered.contains(needle))
            || TRANSIENT_SQLSTATES.iter().any(|code| message.contains(code))
        {
            return true;
        }
    }

    false
}
