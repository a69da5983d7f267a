//! Timeout and bounded retry around backend calls

use std::future::Future;
use std::io;

use tokio::time::{sleep, timeout};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// Run `call` under the configured timeout, retrying transient failures
///
/// `call` is invoked once per attempt. Backoff doubles after each retry.
pub(crate) async fn with_retry<T, F, Fut>(
    config: &StoreConfig,
    op: &'static str,
    key: &str,
    mut call: F,
) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    let mut attempt = 0;
    loop {
        let error = match timeout(config.op_timeout(), call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(source)) => StoreError::Backend {
                key: key.to_string(),
                source,
            },
            Err(_) => StoreError::Timeout {
                op,
                key: key.to_string(),
                after_ms: config.op_timeout_ms,
            },
        };
        if attempt >= config.max_retries || !error.is_retryable() {
            tracing::error!(op, key, attempt, %error, "store operation failed");
            return Err(error);
        }
        let delay = config.retry_backoff(attempt);
        tracing::warn!(op, key, attempt, ?delay, %error, "retrying store operation");
        sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn config() -> StoreConfig {
        StoreConfig::new()
            .with_op_timeout(Duration::from_millis(50))
            .with_retries(2, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&config(), "read", "k", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(io::Error::from(io::ErrorKind::Interrupted))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = with_retry(&config(), "write", "k", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(io::Error::from(io::ErrorKind::Interrupted)) }
        })
        .await;
        assert!(matches!(result, Err(StoreError::Backend { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = with_retry(&config(), "write", "k", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(io::Error::from(io::ErrorKind::PermissionDenied)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let result: StoreResult<()> = with_retry(&config(), "read", "k", || async {
            sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert!(matches!(
            result,
            Err(StoreError::Timeout {
                op: "read",
                after_ms: 50,
                ..
            })
        ));
    }
}
