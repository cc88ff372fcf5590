//! Process-wide governors: outbound rate limit and memory admission
//!
//! Both are created once per [`Analyzer`](crate::Analyzer) and shared behind
//! `Arc` by every checker and the batch orchestrator. Neither resets between
//! requests.

use crate::config::LimitsConfig;
use crate::{AnalyzerError, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Token bucket rate limiter
///
/// Tokens refill continuously at `rate` per second up to `capacity`. The
/// bucket is refilled lazily whenever a caller looks at it, so no
/// background task is needed.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    capacity: f64,
    rate: f64,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Creates a full bucket
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            rate: f64::from(requests_per_second.max(1)),
        }
    }

    pub fn from_config(limits: &LimitsConfig) -> Self {
        Self::new(limits.requests_per_second, limits.burst)
    }

    /// Waits for one token
    ///
    /// Fails with `Cancelled` if the token fires while waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Err(AnalyzerError::Cancelled);
            }

            let wait = {
                let mut bucket = self.bucket.lock().await;
                self.refill(&mut bucket);

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return Ok(());
                }

                let missing = 1.0 - bucket.tokens;
                Duration::from_secs_f64((missing / self.rate).max(0.001))
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AnalyzerError::Cancelled),
                _ = sleep(wait) => {}
            }
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.capacity);
        bucket.last_refill = now;
    }
}

/// Memory-weighted admission controller
///
/// The budget is tracked in KiB permits. A unit of work costs
/// `ceil(estimated_bytes * multiplier / 1024)` permits, held until the
/// returned [`Admission`] is dropped.
#[derive(Debug)]
pub struct AdmissionController {
    permits: Arc<Semaphore>,
    budget_kib: u32,
    multiplier: u64,
}

/// Budget held by admitted work; released on drop
#[derive(Debug)]
pub struct Admission {
    _permit: OwnedSemaphorePermit,
    cost_kib: u32,
}

impl Admission {
    pub fn cost_kib(&self) -> u32 {
        self.cost_kib
    }
}

impl AdmissionController {
    pub fn new(budget_kib: u32, multiplier: u64) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(budget_kib as usize)),
            budget_kib,
            multiplier: multiplier.max(1),
        }
    }

    /// Budget of `max-memory-mb` megabytes
    pub fn from_config(limits: &LimitsConfig) -> Self {
        let budget_kib = limits
            .max_memory_mb
            .saturating_mul(1024)
            .min(u64::from(u32::MAX)) as u32;
        Self::new(budget_kib, limits.overhead_multiplier)
    }

    /// Permits needed for work of `estimated_bytes`
    pub fn cost_kib(&self, estimated_bytes: u64) -> u64 {
        let weighted = estimated_bytes.saturating_mul(self.multiplier);
        (weighted.saturating_add(1023) / 1024).max(1)
    }

    /// Waits until the budget can hold the work
    ///
    /// # Errors
    ///
    /// `ResourceExhausted` when the cost exceeds the whole budget (it could
    /// never be admitted) or when the token fires while waiting.
    pub async fn admit(&self, estimated_bytes: u64, cancel: &CancellationToken) -> Result<Admission> {
        let cost = self.cost_kib(estimated_bytes);
        if cost > u64::from(self.budget_kib) {
            return Err(AnalyzerError::ResourceExhausted(format!(
                "estimated cost {} KiB exceeds memory budget of {} KiB",
                cost, self.budget_kib
            )));
        }
        let cost = cost as u32;

        let acquire = Arc::clone(&self.permits).acquire_many_owned(cost);
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AnalyzerError::ResourceExhausted("admission cancelled".to_string()));
            }
            permit = acquire => permit.map_err(|_| {
                AnalyzerError::ResourceExhausted("admission controller closed".to_string())
            })?,
        };

        tracing::debug!(cost_kib = cost, available_kib = self.available_kib(), "Admitted work");

        Ok(Admission {
            _permit: permit,
            cost_kib: cost,
        })
    }

    /// Budget not currently held
    pub fn available_kib(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn budget_kib(&self) -> u32 {
        self.budget_kib
    }
}
