//! Bounded-concurrency execution of blocking API calls with retry.

use crate::error::{PlaneError, Result};
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Ceiling on simultaneous in-flight remote calls across the whole process.
pub const MAX_CONCURRENT_CALLS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget with no waiting between attempts.
    pub fn immediate() -> Self {
        Self {
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Jittered exponential schedule, doubling from `min_wait` up to `max_wait`.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_wait)
            .with_max_delay(self.max_wait)
            .with_jitter()
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// Runs blocking calls on the worker pool, at most [`MAX_CONCURRENT_CALLS`] at a time,
/// retrying transient HTTP failures.
///
/// Clones share the same permit pool.
#[derive(Clone)]
pub struct Retrier {
    permits: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl Retrier {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_permits(policy, MAX_CONCURRENT_CALLS)
    }

    pub fn with_permits(policy: RetryPolicy, permits: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(permits)),
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Execute `call`, retrying on 429/502/503/504.
    ///
    /// The permit is held only while the call runs, not during backoff. After the
    /// last attempt the final error is returned as-is.
    pub async fn call<T, F>(&self, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        let call = Arc::new(call);
        let max_attempts = self.policy.max_attempts;
        let mut attempt: u32 = 0;

        (|| self.run_once(Arc::clone(&call)))
            .retry(self.policy.backoff())
            .when(PlaneError::is_retryable)
            .notify(|err: &PlaneError, wait: Duration| {
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_attempts,
                    status = err.status().unwrap_or_default(),
                    wait_secs = wait.as_secs_f64(),
                    "Transient API error, retrying"
                );
            })
            .await
    }

    async fn run_once<T, F>(&self, call: Arc<F>) -> Result<T>
    where
        T: Send + 'static,
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| PlaneError::Transport("request pool is closed".to_string()))?;
        tokio::task::spawn_blocking(move || call())
            .await
            .map_err(|e| PlaneError::Transport(format!("worker task failed: {}", e)))?
    }
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backon::BackoffBuilder;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn http(status: u16) -> PlaneError {
        PlaneError::Http {
            status,
            message: format!("HTTP {}", status),
        }
    }

    fn fast() -> Retrier {
        Retrier::new(RetryPolicy::immediate())
    }

    /// Fails with each status in `statuses` in turn, then succeeds.
    fn scripted(
        statuses: Vec<u16>,
    ) -> (
        Arc<AtomicUsize>,
        impl Fn() -> Result<&'static str> + Send + Sync + 'static,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let statuses = Mutex::new(statuses.into_iter());
        let f = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            match statuses.lock().unwrap().next() {
                Some(status) => Err(http(status)),
                None => Ok("ok"),
            }
        };
        (calls, f)
    }

    #[tokio::test]
    async fn test_retries_429_then_succeeds() {
        let (calls, f) = scripted(vec![429]);
        assert_eq!(fast().call(f).await.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retries_gateway_errors() {
        let (calls, f) = scripted(vec![502, 503, 504]);
        assert_eq!(fast().call(f).await.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_original_error() {
        let (calls, f) = scripted(vec![429; 10]);
        let err = fast().call(f).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_no_retry_on_fatal_statuses() {
        for status in [401, 404, 500] {
            let (calls, f) = scripted(vec![status]);
            let err = fast().call(f).await.unwrap_err();
            assert_eq!(err.status(), Some(status));
            assert_eq!(calls.load(Ordering::SeqCst), 1, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let retrier = fast();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..30 {
            let retrier = retrier.clone();
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            tasks.spawn(async move {
                retrier
                    .call(move || {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= MAX_CONCURRENT_CALLS, "peak {} exceeded ceiling", peak);
        assert!(peak > 1, "calls never overlapped");
    }

    #[tokio::test]
    async fn test_permit_released_between_attempts() {
        let retrier = Retrier::with_permits(RetryPolicy::immediate(), 1);
        let (calls, f) = scripted(vec![503, 503]);
        assert_eq!(retrier.call(f).await.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(retrier.permits.available_permits(), 1);
    }

    #[test]
    fn test_backoff_schedule() {
        let delays: Vec<Duration> = RetryPolicy::default().backoff().build().collect();
        assert_eq!(delays.len(), 4);
        for (attempt, wait) in delays.iter().enumerate() {
            assert!(*wait >= Duration::from_secs(1), "retry {}: {:?}", attempt, wait);
            assert!(*wait <= Duration::from_secs(120), "retry {}: {:?}", attempt, wait);
        }
        assert!(delays[0] < Duration::from_secs(2));

        let immediate: Vec<Duration> = RetryPolicy::immediate().backoff().build().collect();
        assert_eq!(immediate, vec![Duration::ZERO; 4]);
    }
}
