//! Deadline wrapper for outbound calls

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Deadline applied when the caller does not choose one
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Call timed out after {}ms", .duration.as_millis())]
pub struct TimeoutError {
    pub duration: Duration,
}

/// Race a call against a timer.
///
/// The call is spawned onto the runtime and only the *wait* is bounded. When
/// the timer wins the caller gets a [`TimeoutError`], but the spawned call is
/// detached, not aborted: the request stays in flight until the transport
/// finishes or hits its own timeout. Do not rely on a timeout to stop a
/// state-changing call from landing.
pub async fn with_timeout<F, T, E>(call: F, duration: Duration) -> Result<T, E>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<TimeoutError> + Send + 'static,
{
    let task = tokio::spawn(call);

    match tokio::time::timeout(duration, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            if join_error.is_panic() {
                std::panic::resume_unwind(join_error.into_panic());
            }
            // cancelled only when the runtime is shutting down
            tracing::warn!("Call task cancelled before completing");
            Err(TimeoutError { duration }.into())
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = duration.as_millis() as u64,
                "Call exceeded deadline; abandoning wait"
            );
            Err(TimeoutError { duration }.into())
        }
    }
}
