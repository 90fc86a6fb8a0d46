use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::{StorageError, StorageResult};

/// Read-side retries. Writes are never retried here.
pub const MAX_READ_RETRIES: u32 = 3;
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const MAX_BACKOFF: Duration = Duration::from_millis(2000);

/// Runs a read operation, retrying transient failures with exponential
/// backoff (500ms doubling, capped at 2s, at most 3 retries). Masks the
/// window where a just-written record is not yet visible in the object
/// store. Non-transient errors propagate immediately.
pub async fn read_with_retry<T, F, Fut>(mut op: F) -> StorageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let mut delay = INITIAL_BACKOFF;
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < MAX_READ_RETRIES => {
                attempt += 1;
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying read");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_BACKOFF);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn masks_two_transient_failures_with_documented_delays() {
        let attempts = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let attempts_in_op = attempts.clone();
        let result = read_with_retry(move || {
            let attempts = attempts_in_op.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(StorageError::not_found("document not visible yet"))
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 500ms + 1000ms of backoff, no more
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_the_underlying_error() {
        let attempts = Arc::new(AtomicU32::new(0));

        let attempts_in_op = attempts.clone();
        let result: StorageResult<u32> = read_with_retry(move || {
            let attempts = attempts_in_op.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::not_found("still missing"))
            }
        })
        .await;

        assert!(matches!(result, Err(StorageError::NotFound(_))));
        // initial attempt + 3 retries
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_errors_propagate_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));

        let attempts_in_op = attempts.clone();
        let result: StorageResult<u32> = read_with_retry(move || {
            let attempts = attempts_in_op.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::Validation("bad input".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(StorageError::Validation(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_caps_at_two_seconds() {
        let attempts = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let attempts_in_op = attempts.clone();
        let _: StorageResult<u32> = read_with_retry(move || {
            let attempts = attempts_in_op.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::Backend("fetch failed".into()))
            }
        })
        .await;

        // 500ms + 1000ms + 2000ms
        assert_eq!(started.elapsed(), Duration::from_millis(3500));
    }
}
