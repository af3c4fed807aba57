//! Process-wide rate limiting for named external services.
//!
//! One [`RateLimiter`] is constructed at composition time and shared (via
//! `Arc`) by every pipeline stage that calls an external service. Each named
//! service has its own bucket: at most `max_calls` admissions in any rolling
//! window of `window` length. A bucket's timestamp record is only touched
//! under its own async mutex, and because waiters sleep while *holding* that
//! mutex, grants are handed out in acquisition order (FIFO-ish fairness — no
//! caller is granted out of turn while an earlier caller is still waiting).

use std::collections::{HashMap, VecDeque};

use pipeline::{LimitPolicy, RateLimitRule, ServiceName, StageError};
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::trace;

struct Bucket {
    max_calls: usize,
    window: Duration,
    policy: LimitPolicy,
    // Admission timestamps inside the current window, oldest first.
    admitted: Mutex<VecDeque<Instant>>,
}

impl Bucket {
    fn new(rule: &RateLimitRule) -> Self {
        Self {
            max_calls: rule.max_calls as usize,
            window: rule.window(),
            policy: rule.policy,
            admitted: Mutex::new(VecDeque::new()),
        }
    }

    async fn acquire(&self, service: &ServiceName) -> Result<(), StageError> {
        let mut admitted = self.admitted.lock().await;
        loop {
            let now = Instant::now();
            while admitted
                .front()
                .is_some_and(|&t| t + self.window <= now)
            {
                admitted.pop_front();
            }
            if admitted.len() < self.max_calls {
                admitted.push_back(now);
                return Ok(());
            }
            match self.policy {
                LimitPolicy::Reject => {
                    return Err(StageError::RateLimitExhausted {
                        service: service.clone(),
                    });
                }
                LimitPolicy::Block => {
                    // Sleeping with the bucket lock held serialises waiters in
                    // arrival order.
                    if let Some(&oldest) = admitted.front() {
                        trace!(service = %service, "rate limit window full, waiting");
                        sleep_until(oldest + self.window).await;
                    }
                }
            }
        }
    }
}

/// Gate admitting calls to named external services at configured rates.
///
/// Services without a configured bucket pass through ungated.
pub struct RateLimiter {
    buckets: HashMap<ServiceName, Bucket>,
}

impl RateLimiter {
    /// Builds a limiter with one bucket per rule.
    pub fn new(rules: &[RateLimitRule]) -> Self {
        let buckets = rules
            .iter()
            .map(|rule| (rule.service.clone(), Bucket::new(rule)))
            .collect();
        Self { buckets }
    }

    /// Blocks until the service's bucket has room, records the call, and
    /// returns. For buckets configured with [`LimitPolicy::Reject`], returns
    /// [`StageError::RateLimitExhausted`] instead of waiting.
    pub async fn acquire(&self, service: &ServiceName) -> Result<(), StageError> {
        match self.buckets.get(service) {
            Some(bucket) => bucket.acquire(service).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc(name: &str) -> ServiceName {
        ServiceName::new(name).expect("non-empty")
    }

    fn limiter(max_calls: u32, window_secs: u64, policy: LimitPolicy) -> RateLimiter {
        RateLimiter::new(&[RateLimitRule {
            service: svc("llm"),
            max_calls,
            window_secs,
            policy,
        }])
    }

    #[tokio::test(start_paused = true)]
    async fn admits_max_calls_without_delay() {
        let limiter = limiter(3, 60, LimitPolicy::Block);
        let service = svc("llm");
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire(&service).await.expect("within window");
        }
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn delays_calls_beyond_the_window() {
        let limiter = limiter(2, 60, LimitPolicy::Block);
        let service = svc("llm");
        let start = Instant::now();
        limiter.acquire(&service).await.expect("1st");
        limiter.acquire(&service).await.expect("2nd");
        // Third call must wait until the first admission leaves the window.
        limiter.acquire(&service).await.expect("3rd");
        assert!(Instant::now() - start >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn sliding_window_never_exceeds_max() {
        let limiter = limiter(2, 10, LimitPolicy::Block);
        let service = svc("llm");
        let mut admissions = Vec::new();
        for _ in 0..6 {
            limiter.acquire(&service).await.expect("eventually admitted");
            admissions.push(Instant::now());
        }
        for window_start in &admissions {
            let in_window = admissions
                .iter()
                .filter(|&&t| t >= *window_start && t < *window_start + Duration::from_secs(10))
                .count();
            assert!(in_window <= 2, "{in_window} admissions in one window");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reject_policy_errors_instead_of_waiting() {
        let limiter = limiter(1, 60, LimitPolicy::Reject);
        let service = svc("llm");
        limiter.acquire(&service).await.expect("first call admitted");
        let err = limiter.acquire(&service).await.expect_err("bucket full");
        assert!(matches!(err, StageError::RateLimitExhausted { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_service_passes_through() {
        let limiter = limiter(1, 60, LimitPolicy::Reject);
        let other = svc("unconfigured");
        for _ in 0..10 {
            limiter.acquire(&other).await.expect("ungated");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_are_served_in_arrival_order() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let limiter = Arc::new(limiter(1, 10, LimitPolicy::Block));
        let service = svc("llm");
        limiter.acquire(&service).await.expect("fill the window");

        let next = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for i in 0..3 {
            let limiter = Arc::clone(&limiter);
            let service = service.clone();
            let next = Arc::clone(&next);
            handles.push(tokio::spawn(async move {
                limiter.acquire(&service).await.expect("admitted");
                let turn = next.fetch_add(1, Ordering::SeqCst);
                assert_eq!(turn, i, "waiter {i} granted out of turn");
            }));
            // Let waiter i reach the bucket queue before spawning i + 1.
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        for handle in handles {
            handle.await.expect("waiter task");
        }
    }
}
