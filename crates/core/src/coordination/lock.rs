// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process lock table keyed by chain id

use crate::cancel::CancelToken;
use crate::error::StoreError;
use crate::id::ChainId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Lock state for one chain
struct ChainLock {
    semaphore: Arc<Semaphore>,
    /// Permit owned on behalf of the current holder
    held: Option<OwnedSemaphorePermit>,
}

impl ChainLock {
    fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            held: None,
        }
    }
}

/// Per-chain exclusive locks that suspend waiters instead of spinning
///
/// A lock is not tied to the task that took it: whoever calls `release`
/// frees it, which lets a processor hand a locked chain to a script run.
#[derive(Default)]
pub struct LockTable {
    locks: Mutex<HashMap<ChainId, ChainLock>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn semaphore(&self, id: ChainId) -> Arc<Semaphore> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&locks.entry(id).or_insert_with(ChainLock::new).semaphore)
    }

    fn store_permit(&self, id: ChainId, permit: OwnedSemaphorePermit) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(id).or_insert_with(ChainLock::new).held = Some(permit);
    }

    /// Acquire the chain's lock, waiting up to `timeout`
    ///
    /// A zero timeout only probes. Fails with `Timeout` or `Cancelled`.
    pub async fn acquire(
        &self,
        id: ChainId,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), StoreError> {
        let semaphore = self.semaphore(id);

        let permit = if timeout.is_zero() {
            semaphore
                .try_acquire_owned()
                .map_err(|_| StoreError::Timeout(id))?
        } else {
            tokio::select! {
                acquired = tokio::time::timeout(timeout, semaphore.acquire_owned()) => match acquired {
                    Ok(Ok(permit)) => permit,
                    // Semaphores in the table are never closed
                    Ok(Err(_)) | Err(_) => return Err(StoreError::Timeout(id)),
                },
                _ = cancel.cancelled() => return Err(StoreError::Cancelled(id)),
            }
        };

        self.store_permit(id, permit);
        tracing::trace!(chain = %id, "lock acquired");
        Ok(())
    }

    /// Like `acquire`, reporting timeout or cancellation as `false`
    pub async fn try_acquire(
        &self,
        id: ChainId,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<bool, StoreError> {
        match self.acquire(id, timeout, cancel).await {
            Ok(()) => Ok(true),
            Err(StoreError::Timeout(_)) | Err(StoreError::Cancelled(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Release the chain's lock. Releasing a lock that is not held is an error.
    pub fn release(&self, id: ChainId) -> Result<(), StoreError> {
        let permit = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.get_mut(&id).and_then(|lock| lock.held.take())
        };
        match permit {
            Some(permit) => {
                drop(permit);
                tracing::trace!(chain = %id, "lock released");
                Ok(())
            }
            None => Err(StoreError::NotLocked(id)),
        }
    }

    /// Probe without changing the lock's state
    pub fn is_locked(&self, id: ChainId) -> bool {
        let semaphore = {
            let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            match locks.get(&id) {
                Some(lock) => Arc::clone(&lock.semaphore),
                None => return false,
            }
        };
        // A successful probe drops its permit immediately
        semaphore.try_acquire_owned().is_err()
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
