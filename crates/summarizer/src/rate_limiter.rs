//! Sliding-window request pacing.
//!
//! Keeps the process under a provider-friendly number of summarization
//! requests per minute. This is the only shared mutable state in the
//! summarization path; the dispatcher itself shares nothing between calls.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;

const WINDOW: Duration = Duration::from_secs(60);

/// Admits at most `calls_per_minute` acquisitions in any 60 second window.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// A limit of `0` is treated as `1`.
    pub fn per_minute(calls_per_minute: u32) -> Self {
        Self::new(calls_per_minute, WINDOW)
    }

    pub fn new(limit: u32, window: Duration) -> Self {
        let limit = limit.max(1) as usize;
        Self {
            limit,
            window,
            calls: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    /// Waits until a slot in the window is free, then takes it.
    ///
    /// The wait never exceeds one window.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut calls = self.calls.lock().await;
                let now = Instant::now();
                while calls
                    .front()
                    .is_some_and(|&t| now.duration_since(t) >= self.window)
                {
                    calls.pop_front();
                }

                match calls.front().copied() {
                    Some(oldest) if calls.len() >= self.limit => {
                        self.window.saturating_sub(now.duration_since(oldest))
                    }
                    _ => {
                        calls.push_back(now);
                        return;
                    }
                }
            };

            info!(wait_secs = wait.as_secs_f64(), "Rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn calls_under_the_limit_do_not_wait() {
        let limiter = RateLimiter::per_minute(3);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn call_over_the_limit_waits_for_the_oldest_to_expire() {
        let limiter = RateLimiter::per_minute(2);
        let start = Instant::now();

        limiter.acquire().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides() {
        let limiter = RateLimiter::new(1, Duration::from_secs(5));
        let start = Instant::now();
        for _ in 0..4 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_limit_behaves_as_one() {
        let limiter = RateLimiter::new(0, Duration::from_secs(1));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }
}
