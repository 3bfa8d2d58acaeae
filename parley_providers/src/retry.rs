use std::fmt::Display;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Retry an async operation, sleeping between attempts.
///
/// # Arguments
/// * `operation` - The async operation to retry
/// * `delays` - Pause before each retry; `delays.len() + 1` attempts in total
///
/// # Returns
/// The first successful result, or the error from the last attempt
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    delays: &[Duration],
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Display,
{
    let total_attempts = delays.len() + 1;
    let mut pending_delays = delays.iter();
    let mut attempt = 1_usize;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let Some(delay) = pending_delays.next() else {
                    return Err(e);
                };
                warn!(
                    "Request failed (attempt {attempt}/{total_attempts}): {e}. Retrying after {}ms...",
                    delay.as_millis()
                );
                sleep(*delay).await;
                attempt += 1;
            }
        }
    }
}

/// Convert whole-second delays from configuration.
#[must_use]
pub fn delays_from_secs(secs: &[u64]) -> Vec<Duration> {
    secs.iter().copied().map(Duration::from_secs).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FAST: [Duration; 2] = [Duration::from_millis(1), Duration::from_millis(1)];

    #[tokio::test]
    async fn retry_succeeds_on_first_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), String>(())
                }
            },
            &FAST,
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: std::result::Result<(), String> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if count < 3 {
                        Err(String::from("fail"))
                    } else {
                        Ok(())
                    }
                }
            },
            &FAST,
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_fails_after_all_attempts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: std::result::Result<(), String> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(format!("fail {n}"))
                }
            },
            &FAST,
        )
        .await;
        assert_eq!(result, Err("fail 3".to_string()));
        assert_eq!(attempts.load(Ordering::SeqCst), 3); // 1 initial + 2 retries
    }

    #[tokio::test]
    async fn no_delays_means_single_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: std::result::Result<(), String> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(String::from("fail"))
                }
            },
            &[],
        )
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delays_convert_from_seconds() {
        assert_eq!(
            delays_from_secs(&[2, 4]),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
    }
}
