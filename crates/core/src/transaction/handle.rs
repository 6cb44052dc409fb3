// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Store` and `Transaction`: the caller-facing surface over a backend

use super::{RevisionNumber, Status, TransactionData, TransactionRevision};
use crate::cancel::CancelToken;
use crate::error::StoreError;
use crate::id::ChainId;
use crate::store::{Query, TransactionStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to a store backend
///
/// Every value it returns is a [`Transaction`] bound back to this handle.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn TransactionStore>,
}

impl Store {
    pub fn new(backend: Arc<dyn TransactionStore>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn TransactionStore> {
        &self.backend
    }

    fn bind(&self, data: TransactionData) -> Transaction {
        Transaction {
            data,
            store: self.clone(),
        }
    }

    fn bind_all(&self, data: Vec<TransactionData>) -> Vec<Transaction> {
        data.into_iter().map(|d| self.bind(d)).collect()
    }

    pub async fn create_chain(&self, initial: TransactionData) -> Result<Transaction, StoreError> {
        let data = self.backend.create_chain(initial).await?;
        Ok(self.bind(data))
    }

    pub async fn commit_delta(
        &self,
        original: &Transaction,
        next: TransactionData,
    ) -> Result<Transaction, StoreError> {
        let data = self.backend.commit_delta(&original.data, next).await?;
        Ok(self.bind(data))
    }

    pub async fn fetch_head(&self, id: ChainId) -> Result<Transaction, StoreError> {
        let data = self.backend.fetch_head(id).await?;
        Ok(self.bind(data))
    }

    pub async fn fetch_revision(
        &self,
        id: ChainId,
        revision: RevisionNumber,
    ) -> Result<Transaction, StoreError> {
        let data = self.backend.fetch_revision(id, revision).await?;
        Ok(self.bind(data))
    }

    pub async fn fetch_chain(&self, id: ChainId) -> Result<Vec<Transaction>, StoreError> {
        let data = self.backend.fetch_chain(id).await?;
        Ok(self.bind_all(data))
    }

    pub async fn fetch_children(
        &self,
        parent: ChainId,
        statuses: &[Status],
    ) -> Result<Vec<Transaction>, StoreError> {
        let data = self.backend.fetch_children(parent, statuses).await?;
        Ok(self.bind_all(data))
    }

    pub async fn chain_exists(&self, id: ChainId) -> Result<bool, StoreError> {
        self.backend.chain_exists(id).await
    }

    pub async fn query(&self) -> Result<Query, StoreError> {
        self.backend.query().await
    }

    pub async fn lock(
        &self,
        id: ChainId,
        create_if_missing: bool,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<(), StoreError> {
        self.backend
            .lock(id, create_if_missing, timeout, cancel)
            .await
    }

    pub async fn try_lock(
        &self,
        id: ChainId,
        create_if_missing: bool,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<bool, StoreError> {
        self.backend
            .try_lock(id, create_if_missing, timeout, cancel)
            .await
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.backend.now()
    }

    pub async fn free(&self, id: ChainId) -> Result<(), StoreError> {
        self.backend.free(id).await
    }

    pub async fn is_locked(&self, id: ChainId) -> Result<bool, StoreError> {
        self.backend.is_locked(id).await
    }

    pub async fn due_chains(&self, cancel: &CancelToken) -> Result<Vec<Transaction>, StoreError> {
        let data = self.backend.due_chains(cancel).await?;
        Ok(self.bind_all(data))
    }

    pub async fn wait_for(
        &self,
        filter: impl Fn(&TransactionData) -> bool + Send + Sync + 'static,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Option<Transaction>, StoreError> {
        let data = self
            .backend
            .wait_for(Arc::new(filter), timeout, cancel)
            .await?;
        Ok(data.map(|d| self.bind(d)))
    }
}

/// An immutable revision snapshot bound to the store it came from
///
/// Equality ignores the store binding.
#[derive(Clone)]
pub struct Transaction {
    data: TransactionData,
    store: Store,
}

impl Transaction {
    pub fn data(&self) -> &TransactionData {
        &self.data
    }

    pub fn into_data(self) -> TransactionData {
        self.data
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Build the successor snapshot from a mutable copy of this one
    pub fn delta(&self, mutate: impl FnOnce(&mut TransactionData)) -> TransactionData {
        let mut next = self.data.successor();
        mutate(&mut next);
        next
    }

    /// Build and commit the successor snapshot
    pub async fn commit_delta(
        &self,
        mutate: impl FnOnce(&mut TransactionData),
    ) -> Result<Transaction, StoreError> {
        let next = self.delta(mutate);
        self.store.commit_delta(self, next).await
    }

    /// Successor that marks the current deadline as consumed
    pub fn consume_delta(&self, now: DateTime<Utc>) -> TransactionData {
        self.delta(|next| {
            if next.expires_at.take().is_some() {
                next.expired_at = Some(now);
            }
        })
    }

    pub async fn lock(&self, timeout: Duration, cancel: &CancelToken) -> Result<(), StoreError> {
        self.store
            .lock(self.data.chain_id, false, timeout, cancel)
            .await
    }

    pub async fn try_lock(
        &self,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<bool, StoreError> {
        self.store
            .try_lock(self.data.chain_id, false, timeout, cancel)
            .await
    }

    pub async fn free(&self) -> Result<(), StoreError> {
        self.store.free(self.data.chain_id).await
    }

    pub async fn is_locked(&self) -> Result<bool, StoreError> {
        self.store.is_locked(self.data.chain_id).await
    }

    /// Current head of this chain, which may be newer than `self`
    pub async fn fetch_next(&self) -> Result<Transaction, StoreError> {
        self.store.fetch_head(self.data.chain_id).await
    }

    pub async fn fetch_chain(&self) -> Result<Vec<Transaction>, StoreError> {
        self.store.fetch_chain(self.data.chain_id).await
    }

    pub async fn children(&self, statuses: &[Status]) -> Result<Vec<Transaction>, StoreError> {
        self.store.fetch_children(self.data.chain_id, statuses).await
    }

    pub async fn authorize(&self) -> Result<Transaction, StoreError> {
        self.transition(Status::Authorized, None).await
    }

    pub async fn complete(&self) -> Result<Transaction, StoreError> {
        self.transition(Status::Completed, None).await
    }

    pub async fn cancel(&self) -> Result<Transaction, StoreError> {
        self.transition(Status::Cancelled, None).await
    }

    pub async fn fail(&self, error: serde_json::Value) -> Result<Transaction, StoreError> {
        self.transition(Status::Failed, Some(error)).await
    }

    async fn transition(
        &self,
        status: Status,
        error: Option<serde_json::Value>,
    ) -> Result<Transaction, StoreError> {
        let now = self.store.now();
        self.commit_delta(|next| {
            next.status = status;
            if next.expires_at.take().is_some() {
                next.expired_at = Some(now);
            }
            if error.is_some() {
                next.error = error;
            }
        })
        .await
    }
}

impl std::ops::Deref for Transaction {
    type Target = TransactionData;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Transaction").field(&self.data).finish()
    }
}

impl From<&Transaction> for TransactionRevision {
    fn from(tx: &Transaction) -> Self {
        tx.data.revision_ref()
    }
}
