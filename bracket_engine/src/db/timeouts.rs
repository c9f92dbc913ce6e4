//! Deadlines for match storage queries.
//!
//! Every PostgreSQL call made by the match repository goes through
//! [`with_timeout`] so a stalled connection surfaces as a persistence error
//! instead of hanging the operator's action.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Deadline for single-row reads and updates
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for the bulk insert of a freshly generated bracket
pub const LONG_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for timed storage operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Await `future`, giving up after `duration`
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(TimeoutError::Database),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completed_future_passes_through() {
        let value = with_timeout(DEFAULT_QUERY_TIMEOUT, async { Ok::<_, sqlx::Error>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_database_error_is_wrapped() {
        let err = with_timeout(DEFAULT_QUERY_TIMEOUT, async {
            Err::<(), _>(sqlx::Error::RowNotFound)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, TimeoutError::Database(sqlx::Error::RowNotFound)));
    }

    #[tokio::test]
    async fn test_stalled_future_times_out() {
        let err = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, sqlx::Error>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, TimeoutError::Timeout(d) if d == Duration::from_millis(50)));
        assert!(err.to_string().contains("timed out"));
    }
}
