// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference revision store
//!
//! Chains live in memory; with a WAL configured, every commit and saved state
//! blob is logged before it becomes visible, and the log is replayed on open.

use crate::state::MaterializedState;
use crate::wal::{Operation, Wal, WalError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use wr_core::{
    CancelToken, ChainId, Clock, CommitBus, CommitFilter, ExpiryScheduler, LockTable, Query,
    RevisionNumber, StateStore, Status, Store, StoreConfig, StoreError, SystemClock,
    TransactionData, TransactionRevision, TransactionStore,
};

/// In-memory chains with optional write-ahead durability
pub struct RevisionStore<C: Clock = SystemClock> {
    clock: C,
    state: RwLock<MaterializedState>,
    /// Per-chain critical sections around check-then-append
    gates: Mutex<HashMap<ChainId, Arc<Mutex<()>>>>,
    wal: Option<Mutex<Wal>>,
    locks: LockTable,
    expiry: ExpiryScheduler<C>,
    bus: CommitBus,
}

impl RevisionStore<SystemClock> {
    /// Build a store from configuration using the system clock
    pub fn from_config(config: &StoreConfig) -> Result<Self, WalError> {
        match &config.wal_path {
            Some(path) => Self::open(path, config.sync_writes, SystemClock),
            None => Ok(Self::in_memory(SystemClock)),
        }
    }
}

impl<C: Clock> RevisionStore<C> {
    /// A store with no durability
    pub fn in_memory(clock: C) -> Self {
        Self::with_state(clock, MaterializedState::default(), None)
    }

    /// Open or create a WAL-backed store, replaying what the log holds
    pub fn open(path: &Path, sync_writes: bool, clock: C) -> Result<Self, WalError> {
        let (wal, operations) = Wal::open(path, sync_writes)?;

        let mut state = MaterializedState::default();
        let replayed = operations.len();
        for op in operations {
            if let Err(e) = state.apply(op) {
                tracing::warn!(error = %e, "skipping WAL entry during replay");
            }
        }
        tracing::info!(
            path = %path.display(),
            entries = replayed,
            chains = state.chain_count(),
            "revision store opened"
        );

        Ok(Self::with_state(clock, state, Some(wal)))
    }

    fn with_state(clock: C, state: MaterializedState, wal: Option<Wal>) -> Self {
        let expiry = ExpiryScheduler::new(clock.clone());
        for head in state.heads() {
            expiry.on_commit(None, head);
        }
        Self {
            clock,
            state: RwLock::new(state),
            gates: Mutex::new(HashMap::new()),
            wal: wal.map(Mutex::new),
            locks: LockTable::new(),
            expiry,
            bus: CommitBus::new(),
        }
    }

    /// Wrap into the shared caller-facing handle
    pub fn into_store(self) -> Store {
        Store::new(Arc::new(self))
    }

    pub fn bus(&self) -> &CommitBus {
        &self.bus
    }

    pub fn expiry(&self) -> &ExpiryScheduler<C> {
        &self.expiry
    }

    fn gate(&self, id: ChainId) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(gates.entry(id).or_default())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MaterializedState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Log (when durable) and apply one operation
    fn persist(&self, op: Operation) -> Result<(), StoreError> {
        if let Some(wal) = &self.wal {
            let mut wal = wal.lock().unwrap_or_else(|e| e.into_inner());
            wal.append(&op).map_err(StoreError::storage)?;
        }
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.apply(op).map_err(StoreError::storage)
    }

    fn create(&self, mut initial: TransactionData) -> Result<TransactionData, StoreError> {
        let id = initial.chain_id;
        initial.revision = 1;
        initial.validate()?;

        let gate = self.gate(id);
        let _serialized = gate.lock().unwrap_or_else(|e| e.into_inner());

        if self.read().contains(&id) {
            return Err(StoreError::ChainExists(id));
        }

        initial.created_at = self.clock.now();
        self.persist(Operation::Commit {
            revision: initial.clone(),
        })?;
        self.expiry.on_commit(None, &initial);
        self.bus.publish(&initial);

        tracing::info!(chain = %id, status = %initial.status, "chain created");
        Ok(initial)
    }

    fn append(
        &self,
        original: &TransactionData,
        mut next: TransactionData,
    ) -> Result<TransactionData, StoreError> {
        let id = original.chain_id;
        if next.chain_id != id {
            return Err(StoreError::ChainMismatch {
                expected: id,
                actual: next.chain_id,
            });
        }

        let gate = self.gate(id);
        let _serialized = gate.lock().unwrap_or_else(|e| e.into_inner());

        let previous = self
            .read()
            .head(&id)
            .cloned()
            .ok_or(StoreError::ChainMissing(id))?;
        let head = previous.revision;

        if next.revision > 0 && next.revision <= head {
            tracing::debug!(chain = %id, revision = next.revision, head, "optimistic commit lost");
            return Err(StoreError::RevisionAlreadyExists {
                chain_id: id,
                revision: next.revision,
            });
        }
        if next.revision <= 0 || next.revision > head + 1 {
            return Err(StoreError::InvalidRevision {
                chain_id: id,
                revision: next.revision,
                head,
            });
        }
        next.validate()?;
        next.validate_successor_of(&previous)?;

        next.created_at = self.clock.now();
        self.persist(Operation::Commit {
            revision: next.clone(),
        })?;
        self.expiry.on_commit(Some(&previous), &next);
        self.bus.publish(&next);

        tracing::debug!(chain = %id, revision = next.revision, status = %next.status, "delta committed");
        Ok(next)
    }

    fn ensure_known(&self, id: ChainId, create_if_missing: bool) -> Result<(), StoreError> {
        if create_if_missing || self.read().contains(&id) {
            Ok(())
        } else {
            Err(StoreError::ChainMissing(id))
        }
    }
}

#[async_trait]
impl<C: Clock> TransactionStore for RevisionStore<C> {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn create_chain(&self, initial: TransactionData) -> Result<TransactionData, StoreError> {
        self.create(initial)
    }

    async fn commit_delta(
        &self,
        original: &TransactionData,
        next: TransactionData,
    ) -> Result<TransactionData, StoreError> {
        self.append(original, next)
    }

    async fn fetch_head(&self, id: ChainId) -> Result<TransactionData, StoreError> {
        self.read()
            .head(&id)
            .cloned()
            .ok_or(StoreError::ChainMissing(id))
    }

    async fn fetch_revision(
        &self,
        id: ChainId,
        revision: RevisionNumber,
    ) -> Result<TransactionData, StoreError> {
        let state = self.read();
        if !state.contains(&id) {
            return Err(StoreError::ChainMissing(id));
        }
        state
            .revision(&id, revision)
            .cloned()
            .ok_or(StoreError::RevisionMissing {
                chain_id: id,
                revision,
            })
    }

    async fn fetch_chain(&self, id: ChainId) -> Result<Vec<TransactionData>, StoreError> {
        self.read()
            .chain(&id)
            .map(<[TransactionData]>::to_vec)
            .ok_or(StoreError::ChainMissing(id))
    }

    async fn fetch_children(
        &self,
        parent: ChainId,
        statuses: &[Status],
    ) -> Result<Vec<TransactionData>, StoreError> {
        Ok(self
            .read()
            .heads()
            .filter(|h| h.parent.is_some_and(|p| p.chain_id == parent))
            .filter(|h| statuses.contains(&h.status))
            .cloned()
            .collect())
    }

    async fn chain_exists(&self, id: ChainId) -> Result<bool, StoreError> {
        Ok(self.read().contains(&id))
    }

    async fn query(&self) -> Result<Query, StoreError> {
        Ok(Query::new(self.read().heads().cloned().collect()))
    }

    async fn lock(
        &self,
        id: ChainId,
        create_if_missing: bool,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), StoreError> {
        self.ensure_known(id, create_if_missing)?;
        self.locks.acquire(id, timeout, cancel).await
    }

    async fn try_lock(
        &self,
        id: ChainId,
        create_if_missing: bool,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<bool, StoreError> {
        self.ensure_known(id, create_if_missing)?;
        self.locks.try_acquire(id, timeout, cancel).await
    }

    async fn free(&self, id: ChainId) -> Result<(), StoreError> {
        self.locks.release(id)
    }

    async fn is_locked(&self, id: ChainId) -> Result<bool, StoreError> {
        Ok(self.locks.is_locked(id))
    }

    async fn due_chains(&self, cancel: &CancelToken) -> Result<Vec<TransactionData>, StoreError> {
        if !self.expiry.await_due(cancel).await {
            return Ok(Vec::new());
        }

        let due = self.expiry.scan();
        let now = self.clock.now();
        let state = self.read();
        // A head may have moved between the index scan and this read
        Ok(due
            .iter()
            .filter_map(|id| state.head(id))
            .filter(|head| head.is_due(now))
            .cloned()
            .collect())
    }

    async fn wait_for(
        &self,
        filter: CommitFilter,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Option<TransactionData>, StoreError> {
        Ok(self.bus.wait_for(filter, timeout, cancel).await)
    }
}

#[async_trait]
impl<C: Clock> StateStore for RevisionStore<C> {
    async fn save_state(
        &self,
        revision: TransactionRevision,
        state: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.persist(Operation::SaveState { revision, state })
    }

    async fn load_state(&self, revision: TransactionRevision) -> Result<Vec<u8>, StoreError> {
        Ok(self
            .read()
            .state(&revision)
            .map(<[u8]>::to_vec)
            .unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
