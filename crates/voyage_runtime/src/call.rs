//! Bounded collaborator calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::CollaboratorError;

/// Runs `call` under a `budget_ms` timeout, abandoning it as soon as
/// `cancel` fires. Cancellation wins over a result that is ready at the
/// same poll.
pub async fn bounded<T, F>(
    service: &'static str,
    budget_ms: u64,
    cancel: &CancellationToken,
    call: F,
) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CollaboratorError::Cancelled { service }),
        outcome = tokio::time::timeout(Duration::from_millis(budget_ms), call) => {
            outcome.unwrap_or(Err(CollaboratorError::Timeout { service, budget_ms }))
        }
    }
}
