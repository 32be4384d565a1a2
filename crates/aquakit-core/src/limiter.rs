use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Calls accepted per rolling window against the inference service.
pub const MAX_CALLS_PER_WINDOW: usize = 20;
/// Length of the rolling window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window rate limiter shared across the whole process.
///
/// `acquire` delays a call that would exceed the quota until capacity
/// frees up; calls are never rejected. Window accounting runs on the tokio
/// clock so tests can pause and advance time.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    accepted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            accepted: Mutex::new(VecDeque::new()),
        }
    }

    /// Limiter matching the inference service quota.
    pub fn for_service_quota() -> Self {
        Self::new(MAX_CALLS_PER_WINDOW, WINDOW)
    }

    /// Block until the call fits in the current window, then count it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut accepted = self.accepted.lock().await;
                let now = Instant::now();
                while accepted
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.window)
                {
                    accepted.pop_front();
                }
                if accepted.len() < self.max_calls {
                    accepted.push_back(now);
                    return;
                }
                // At capacity, so the deque is non-empty; the oldest entry
                // bounds how long until a slot frees.
                let oldest = accepted[0];
                self.window.saturating_sub(now.duration_since(oldest))
            };
            tracing::debug!(
                delay_ms = wait.as_millis() as u64,
                "rate limit reached, delaying call"
            );
            sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn quota_fits_without_delay() {
        let limiter = RateLimiter::new(20, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..20 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn twenty_first_call_waits_out_the_window() {
        let limiter = RateLimiter::new(20, Duration::from_secs(60));
        for _ in 0..20 {
            limiter.acquire().await;
        }
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_frees_as_the_window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.acquire().await;

        // Full window: must wait until the first call ages out.
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_acquires_never_drop_a_call() {
        let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(60)));
        let start = Instant::now();
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..12 {
            let limiter = limiter.clone();
            tasks.spawn(async move { limiter.acquire().await });
        }
        let mut completed = 0;
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
            completed += 1;
        }
        assert_eq!(completed, 12);
        // 12 calls at 5 per window drain in three window-spaced bursts.
        assert!(start.elapsed() >= Duration::from_secs(120));
    }
}
