// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded pool of terminal driver handles.
//!
//! Callers hold a [`Lease`], never a raw handle; the lease returns its
//! handle on drop, on every exit path including cancellation. Handles older
//! than `max_age` are destroyed on return instead of being reused, and a
//! periodic sweep health-checks idle handles and replenishes to `min_size`.

use muster_adapters::TerminalDriver;
use muster_core::PoolConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Errors from pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// All handles were in use for the full acquisition timeout.
    #[error("driver pool exhausted (waited {waited_ms}ms)")]
    Exhausted { waited_ms: u64 },
    /// The pool has been closed by shutdown.
    #[error("driver pool closed")]
    Closed,
}

/// Counters exposed through the monitor status surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub created: u64,
    pub reused: u64,
    pub recycled: u64,
    pub timeouts: u64,
    pub in_use: usize,
    pub available: usize,
}

struct PooledHandle<D> {
    driver: D,
    created_at: Instant,
}

struct PoolInner<D> {
    factory: Box<dyn Fn() -> D + Send + Sync>,
    config: PoolConfig,
    semaphore: Arc<Semaphore>,
    available: Mutex<Vec<PooledHandle<D>>>,
    counters: Mutex<Counters>,
}

#[derive(Default)]
struct Counters {
    created: u64,
    reused: u64,
    recycled: u64,
    timeouts: u64,
}

/// Bounded pool of driver handles.
pub struct DriverPool<D: TerminalDriver> {
    inner: Arc<PoolInner<D>>,
}

impl<D: TerminalDriver> Clone for DriverPool<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: TerminalDriver> DriverPool<D> {
    pub fn new(config: PoolConfig, factory: impl Fn() -> D + Send + Sync + 'static) -> Self {
        let max = config.max_size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                factory: Box::new(factory),
                config,
                semaphore: Arc::new(Semaphore::new(max)),
                available: Mutex::new(Vec::new()),
                counters: Mutex::new(Counters::default()),
            }),
        }
    }

    /// Acquire a lease, waiting up to the configured acquisition timeout.
    pub async fn acquire(&self) -> Result<Lease<D>, PoolError> {
        let timeout = Duration::from_millis(self.inner.config.acquisition_timeout_ms);
        let started = Instant::now();

        let permit = match tokio::time::timeout(
            timeout,
            Arc::clone(&self.inner.semaphore).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => {
                self.inner.counters.lock().timeouts += 1;
                return Err(PoolError::Exhausted {
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
        };

        let handle = {
            let mut available = self.inner.available.lock();
            available.pop()
        };

        let handle = match handle {
            Some(handle) => {
                self.inner.counters.lock().reused += 1;
                handle
            }
            None => {
                self.inner.counters.lock().created += 1;
                PooledHandle {
                    driver: (self.inner.factory)(),
                    created_at: Instant::now(),
                }
            }
        };

        Ok(Lease {
            handle: Some(handle),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// One sweep pass: evict unhealthy idle handles, replenish to `min_size`.
    ///
    /// Run periodically by the monitor service; separated out so tests can
    /// drive sweeps deterministically.
    pub async fn sweep_once(&self) {
        let idle: Vec<PooledHandle<D>> = {
            let mut available = self.inner.available.lock();
            available.drain(..).collect()
        };

        let mut kept = Vec::with_capacity(idle.len());
        for handle in idle {
            let max_age = Duration::from_secs(self.inner.config.max_age_seconds);
            if handle.created_at.elapsed() > max_age || !handle.driver.health().await {
                self.inner.counters.lock().recycled += 1;
                continue;
            }
            kept.push(handle);
        }

        // Replenish to min_size, counting handles currently leased out.
        let in_use = self.in_use();
        while kept.len() + in_use < self.inner.config.min_size {
            kept.push(PooledHandle {
                driver: (self.inner.factory)(),
                created_at: Instant::now(),
            });
            self.inner.counters.lock().created += 1;
        }

        self.inner.available.lock().extend(kept);
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.inner.config.sweep_interval_seconds)
    }

    fn in_use(&self) -> usize {
        let max = self.inner.config.max_size.max(1);
        max - self.inner.semaphore.available_permits()
    }

    pub fn stats(&self) -> PoolStats {
        let counters = self.inner.counters.lock();
        PoolStats {
            created: counters.created,
            reused: counters.reused,
            recycled: counters.recycled,
            timeouts: counters.timeouts,
            in_use: self.in_use(),
            available: self.inner.available.lock().len(),
        }
    }
}

/// Scoped driver lease. Dereferences to the driver; returns the handle to
/// the pool on drop unless it has aged out, in which case it is destroyed.
pub struct Lease<D: TerminalDriver> {
    handle: Option<PooledHandle<D>>,
    pool: Arc<PoolInner<D>>,
    _permit: OwnedSemaphorePermit,
}

impl<D: TerminalDriver> Deref for Lease<D> {
    type Target = D;

    fn deref(&self) -> &D {
        // Invariant: `handle` is Some until drop.
        match self.handle {
            Some(ref handle) => &handle.driver,
            None => unreachable!("lease used after drop"),
        }
    }
}

impl<D: TerminalDriver> Drop for Lease<D> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let max_age = Duration::from_secs(self.pool.config.max_age_seconds);
            if handle.created_at.elapsed() > max_age {
                self.pool.counters.lock().recycled += 1;
            } else {
                self.pool.available.lock().push(handle);
            }
        }
        // The permit releases as `_permit` drops, waking one waiter.
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
