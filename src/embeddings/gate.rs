// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounded admission around the shared inference backend

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Inference queue is full")]
    Busy,

    #[error("Server is shutting down")]
    ShuttingDown,
}

/// Semaphore of inference slots plus a cap on callers waiting for one
#[derive(Debug)]
pub struct InferenceGate {
    permits: Arc<Semaphore>,
    waiting: AtomicUsize,
    max_waiting: usize,
}

/// Decrements the waiting count when the acquire future completes or is dropped
struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InferenceGate {
    pub fn new(max_concurrent: usize, max_waiting: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            waiting: AtomicUsize::new(0),
            max_waiting,
        }
    }

    /// Waits for an inference slot, failing fast when the queue is full
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, GateError> {
        if self.permits.is_closed() {
            return Err(GateError::ShuttingDown);
        }

        // Uncontended path does not count against the queue
        if let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() {
            return Ok(permit);
        }

        let queued = self.waiting.fetch_add(1, Ordering::SeqCst);
        let _guard = WaitingGuard(&self.waiting);
        if queued >= self.max_waiting {
            return Err(GateError::Busy);
        }

        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| GateError::ShuttingDown)
    }

    /// Rejects all current waiters and future callers
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}
