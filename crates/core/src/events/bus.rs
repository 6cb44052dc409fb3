// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commit bus routing appended revisions to matching subscribers

use crate::cancel::CancelToken;
use crate::store::CommitFilter;
use crate::transaction::TransactionData;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;
use tokio::sync::mpsc;

/// Handle identifying one subscription
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

type Subscribers = HashMap<SubscriberId, (CommitFilter, mpsc::UnboundedSender<TransactionData>)>;

/// Multicasts every committed revision to the subscribers whose filter accepts it
///
/// Publishing never blocks: each subscriber has an unbounded queue, so a
/// slow listener cannot stall a commit.
#[derive(Clone, Default)]
pub struct CommitBus {
    subscribers: Arc<RwLock<Subscribers>>,
    next_id: Arc<AtomicU64>,
}

impl CommitBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to commits accepted by `filter`
    pub fn subscribe(&self, filter: CommitFilter) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.insert(id, (filter, tx));

        Subscription {
            id,
            rx,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Subscribe to every commit
    pub fn subscribe_all(&self) -> Subscription {
        self.subscribe(Arc::new(|_: &TransactionData| true))
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.remove(&id);
    }

    /// Deliver a committed revision to every matching subscriber
    pub fn publish(&self, committed: &TransactionData) {
        let mut closed = Vec::new();
        {
            let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            for (id, (filter, tx)) in subs.iter() {
                if filter(committed) && tx.send(committed.clone()).is_err() {
                    closed.push(*id);
                }
            }
        }

        if !closed.is_empty() {
            let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
            for id in closed {
                subs.remove(&id);
            }
        }
    }

    /// Wait for the first commit after this call that satisfies `filter`
    ///
    /// Returns `None` when `timeout` elapses or `cancel` fires. The listener is
    /// removed on every path.
    pub async fn wait_for(
        &self,
        filter: CommitFilter,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Option<TransactionData> {
        let mut subscription = self.subscribe(filter);
        tokio::select! {
            result = tokio::time::timeout(timeout, subscription.recv()) => result.ok().flatten(),
            _ = cancel.cancelled() => None,
        }
    }

    /// Get count of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// A live subscription; dropping it unsubscribes
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<TransactionData>,
    subscribers: Weak<RwLock<Subscribers>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next matching commit, in publish order
    pub async fn recv(&mut self) -> Option<TransactionData> {
        self.rx.recv().await
    }

    /// Next matching commit if one is already queued
    pub fn try_recv(&mut self) -> Option<TransactionData> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            let mut subs = subscribers.write().unwrap_or_else(|e| e.into_inner());
            subs.remove(&self.id);
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
