// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend contracts for revision and script-state storage

use crate::cancel::CancelToken;
use crate::error::StoreError;
use crate::id::ChainId;
use crate::transaction::{RevisionNumber, Status, TransactionData, TransactionRevision};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Predicate over committed revisions, used by subscriptions and `wait_for`
pub type CommitFilter = Arc<dyn Fn(&TransactionData) -> bool + Send + Sync>;

/// The revision store contract every backend implements
///
/// Backends deal in plain [`TransactionData`]; callers normally go through
/// [`crate::Store`], which wraps results into [`crate::Transaction`] handles.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// The clock revisions are stamped with
    fn now(&self) -> DateTime<Utc>;

    /// Append revision 1 of a new chain. Fails with `ChainExists` for a known id.
    async fn create_chain(&self, initial: TransactionData) -> Result<TransactionData, StoreError>;

    /// Optimistically append `next` as the successor of the chain's head.
    ///
    /// `RevisionAlreadyExists` when `next.revision` is already taken,
    /// `InvalidRevision` when it is non-positive or skips ahead of `head + 1`.
    async fn commit_delta(
        &self,
        original: &TransactionData,
        next: TransactionData,
    ) -> Result<TransactionData, StoreError>;

    async fn fetch_head(&self, id: ChainId) -> Result<TransactionData, StoreError>;

    async fn fetch_revision(
        &self,
        id: ChainId,
        revision: RevisionNumber,
    ) -> Result<TransactionData, StoreError>;

    /// Every revision of the chain, ascending
    async fn fetch_chain(&self, id: ChainId) -> Result<Vec<TransactionData>, StoreError>;

    /// Heads whose parent lives on `parent` and whose status is one of `statuses`
    async fn fetch_children(
        &self,
        parent: ChainId,
        statuses: &[Status],
    ) -> Result<Vec<TransactionData>, StoreError>;

    async fn chain_exists(&self, id: ChainId) -> Result<bool, StoreError>;

    /// Point-in-time snapshot of every chain head
    async fn query(&self) -> Result<Query, StoreError>;

    /// Block until the chain's application lock is held, `timeout` elapses or `cancel` fires
    async fn lock(
        &self,
        id: ChainId,
        create_if_missing: bool,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), StoreError>;

    /// Like `lock`, but reports a timeout or cancellation as `false`. A zero timeout only probes.
    async fn try_lock(
        &self,
        id: ChainId,
        create_if_missing: bool,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<bool, StoreError>;

    async fn free(&self, id: ChainId) -> Result<(), StoreError>;

    /// Non-destructive probe of the chain's application lock
    async fn is_locked(&self, id: ChainId) -> Result<bool, StoreError>;

    /// Wait until some deadline is due, then return every head due as of the scan.
    /// Cancellation yields an empty list.
    async fn due_chains(&self, cancel: &CancelToken) -> Result<Vec<TransactionData>, StoreError>;

    /// First commit made after this call that satisfies `filter`, or `None` on
    /// timeout or cancellation
    async fn wait_for(
        &self,
        filter: CommitFilter,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Option<TransactionData>, StoreError>;
}

/// Resumable script state, keyed by the revision it was captured at
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_state(
        &self,
        revision: TransactionRevision,
        state: Vec<u8>,
    ) -> Result<(), StoreError>;

    /// Saved bytes, or an empty buffer when nothing was saved
    async fn load_state(&self, revision: TransactionRevision) -> Result<Vec<u8>, StoreError>;
}

/// Owned, read-only snapshot of chain heads
#[derive(Clone, Debug, Default)]
pub struct Query {
    heads: Vec<TransactionData>,
}

impl Query {
    pub fn new(heads: Vec<TransactionData>) -> Self {
        Self { heads }
    }

    pub fn filter(self, predicate: impl Fn(&TransactionData) -> bool) -> Self {
        Self {
            heads: self.heads.into_iter().filter(|h| predicate(h)).collect(),
        }
    }

    pub fn with_status(self, statuses: &[Status]) -> Self {
        self.filter(|h| statuses.contains(&h.status))
    }

    pub fn children_of(self, parent: ChainId) -> Self {
        self.filter(|h| h.parent.is_some_and(|p| p.chain_id == parent))
    }

    pub fn due_at(self, now: DateTime<Utc>) -> Self {
        self.filter(|h| h.is_due(now))
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionData> {
        self.heads.iter()
    }

    pub fn into_vec(self) -> Vec<TransactionData> {
        self.heads
    }
}
