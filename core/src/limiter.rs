use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Counting semaphore that also tracks how many permits are out and the
/// highest number that were ever out at once.
pub struct ConcurrencyLimiter {
    sem: Arc<Semaphore>,
    limit: usize,
    in_flight: Arc<AtomicUsize>,
    high_water: Arc<AtomicUsize>,
}

impl Clone for ConcurrencyLimiter {
    fn clone(&self) -> Self {
        ConcurrencyLimiter {
            sem: self.sem.clone(),
            limit: self.limit,
            in_flight: self.in_flight.clone(),
            high_water: self.high_water.clone(),
        }
    }
}

impl ConcurrencyLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        ConcurrencyLimiter {
            sem: Arc::new(Semaphore::new(limit)),
            limit,
            in_flight: Arc::new(AtomicUsize::new(0)),
            high_water: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot. The slot is released when the permit is dropped.
    pub async fn acquire(&self) -> Result<LimiterPermit, AcquireError> {
        let permit = self.sem.clone().acquire_owned().await?;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        Ok(LimiterPermit { _permit: permit, in_flight: self.in_flight.clone() })
    }

    pub fn limit(&self) -> usize { self.limit }

    pub fn in_flight(&self) -> usize { self.in_flight.load(Ordering::SeqCst) }

    pub fn high_water(&self) -> usize { self.high_water.load(Ordering::SeqCst) }
}

pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for LimiterPermit {
    fn drop(&mut self) {
        // decrement before the semaphore slot is handed to the next waiter
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
