//! Per-host sliding-window request limiter.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hosts: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Record a request to `host` if the window has room. A refused request is not recorded.
    pub async fn try_acquire_at(&self, host: &str, now: Instant) -> bool {
        let mut hosts = self.hosts.lock().await;
        let sent = hosts.entry(host.to_string()).or_default();

        while let Some(&oldest) = sent.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                sent.pop_front();
            } else {
                break;
            }
        }

        if sent.len() >= self.max_requests {
            return false;
        }
        sent.push_back(now);
        true
    }

    pub async fn try_acquire(&self, host: &str) -> bool {
        self.try_acquire_at(host, Instant::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_eleventh_request_in_window_is_refused() {
        let limiter = RateLimiter::per_minute(10);
        let start = Instant::now();

        for i in 0..10 {
            let at = start + Duration::from_secs(i);
            assert!(limiter.try_acquire_at("api.example:443", at).await);
        }
        assert!(
            !limiter
                .try_acquire_at("api.example:443", start + Duration::from_secs(30))
                .await
        );

        // Other hosts have their own window.
        assert!(limiter.try_acquire_at("other.example:443", start).await);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = RateLimiter::per_minute(10);
        let start = Instant::now();
        for i in 0..10 {
            limiter
                .try_acquire_at("h", start + Duration::from_secs(i))
                .await;
        }

        // The first request leaves the window at t=60s, freeing one slot.
        assert!(limiter.try_acquire_at("h", start + Duration::from_secs(60)).await);
        assert!(!limiter.try_acquire_at("h", start + Duration::from_secs(60)).await);
    }
}
