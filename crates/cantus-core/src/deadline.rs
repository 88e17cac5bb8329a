//! Deadlines for calls made on behalf of a caller.
//!
//! Dropping the wrapped future on expiry cancels any in-flight request and
//! releases its connection.

use std::future::Future;
use std::time::Duration;

use crate::error::{CantusError, Result};

/// Deadline for a single registry operation.
pub const REGISTRY_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for aggregate operations such as pagination or batches.
pub const BATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs `future`, failing with a transient upstream error once `limit` elapses.
///
/// # Errors
///
/// Returns the future's own error, or [`CantusError::Upstream`] without a
/// status when the deadline is exceeded.
pub async fn with_deadline<T, F>(limit: Duration, source_system: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if let Ok(result) = tokio::time::timeout(limit, future).await {
        result
    } else {
        tracing::warn!(source = source_system, ?limit, "Deadline exceeded");
        Err(CantusError::transient(
            format!("no response within {limit:?}"),
            source_system,
        ))
    }
}
