//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap an upstream call with a deadline
//! - Keep expiry distinct from the call's own failure
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - Callers map `Elapsed` and `Failed` to different status codes

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimeoutError<E> {
    #[error("deadline of {0:?} elapsed")]
    Elapsed(Duration),

    #[error("{0}")]
    Failed(E),
}

/// Await `fut` for at most `deadline`.
pub async fn with_timeout<T, E, F>(deadline: Duration, fut: F) -> Result<T, TimeoutError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TimeoutError::Failed(e)),
        Err(_) => Err(TimeoutError::Elapsed(deadline)),
    }
}
