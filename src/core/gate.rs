//! Admission control for in-flight generation calls.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::{ConfigError, ConfigResult};

/// Counting admission gate bounding concurrent upstream generation calls.
///
/// Backed by a tokio semaphore, which wakes waiters in FIFO order, so
/// requests are admitted in arrival order and none are starved under load.
/// Applied uniformly to streaming and non-streaming paths.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl ConcurrencyGate {
    /// Create a gate with the given slot count. Zero is a configuration
    /// error and is rejected here, never at request time.
    pub fn new(limit: usize) -> ConfigResult<Self> {
        if limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent_generations".to_string(),
                value: limit.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        })
    }

    /// Wait for a free slot and occupy it.
    ///
    /// The returned ticket frees the slot when released or dropped.
    pub async fn acquire(&self) -> GateTicket {
        // The semaphore is never closed, so acquisition can only fail if the
        // gate itself were dropped while waiting, which the Arc prevents.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("gate semaphore closed");
        GateTicket {
            permit: Some(permit),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Handle for one occupied concurrency slot.
///
/// The slot is freed exactly once: either by an explicit [`release`] or when
/// the ticket is dropped, whichever comes first. Releasing twice is a no-op,
/// so cleanup paths can call it unconditionally.
///
/// [`release`]: GateTicket::release
#[derive(Debug)]
pub struct GateTicket {
    permit: Option<OwnedSemaphorePermit>,
}

impl GateTicket {
    /// Free the slot. Idempotent.
    pub fn release(&mut self) {
        self.permit.take();
    }
}
