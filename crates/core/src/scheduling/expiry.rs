// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expiry scheduler: which chain heads are due, and when to look next
//!
//! Backends embed one scheduler and report every commit to it. The scheduler
//! keeps a deadline-ordered index of heads that carry `expires_at`, and a
//! watch channel holding the nearest pending deadline. Waiters park on the
//! channel, so a commit with an earlier deadline re-arms them immediately.

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::id::ChainId;
use crate::transaction::TransactionData;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::Mutex;
use tokio::sync::watch;

const MAX_CHAIN: ChainId = ChainId(uuid::Uuid::from_u128(u128::MAX));

/// Tracks head deadlines across all chains and wakes waiters when one is due
pub struct ExpiryScheduler<C: Clock> {
    clock: C,
    /// `(deadline, chain)` for every head with `expires_at`, ascending
    index: Mutex<BTreeSet<(DateTime<Utc>, ChainId)>>,
    next_deadline: watch::Sender<Option<DateTime<Utc>>>,
}

impl<C: Clock> ExpiryScheduler<C> {
    pub fn new(clock: C) -> Self {
        let (next_deadline, _) = watch::channel(None);
        Self {
            clock,
            index: Mutex::new(BTreeSet::new()),
            next_deadline,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The cached nearest deadline
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        *self.next_deadline.borrow()
    }

    /// Number of heads currently carrying a deadline
    pub fn tracked(&self) -> usize {
        self.index.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Record that `committed` replaced `previous` as its chain's head
    ///
    /// Arms the wake signal when the new deadline is earlier than the cached one.
    pub fn on_commit(&self, previous: Option<&TransactionData>, committed: &TransactionData) {
        let mut index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(at) = previous.and_then(|p| p.expires_at) {
            index.remove(&(at, committed.chain_id));
        }
        if let Some(at) = committed.expires_at {
            index.insert((at, committed.chain_id));
            // The watch lock is a leaf: nothing is called while it is held.
            self.next_deadline.send_if_modified(|next| match next {
                Some(current) if *current <= at => false,
                _ => {
                    *next = Some(at);
                    true
                }
            });
        }
    }

    /// Replace the cached deadline with one computed from authoritative data
    pub fn set_next_deadline(&self, deadline: Option<DateTime<Utc>>) {
        self.next_deadline.send_if_modified(|next| {
            if *next == deadline {
                return false;
            }
            *next = deadline;
            true
        });
    }

    /// Chains whose head deadline is at or before now
    ///
    /// Due entries stay indexed until a commit clears or moves their deadline,
    /// so a chain skipped under lock contention is offered again on the next
    /// wake. The cached deadline is re-armed to the nearest one still in the future.
    pub fn scan(&self) -> Vec<ChainId> {
        let now = self.clock.now();
        let index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        let due: Vec<ChainId> = index.range(..=(now, MAX_CHAIN)).map(|(_, id)| *id).collect();
        let upcoming = index
            .range((Bound::Excluded((now, MAX_CHAIN)), Bound::Unbounded))
            .next()
            .map(|(at, _)| *at);
        self.set_next_deadline(upcoming);

        tracing::debug!(due = due.len(), next = ?upcoming, "expiry scan");
        due
    }

    /// Block until the nearest deadline passes
    ///
    /// With no deadline pending this parks until one is armed. A deadline that
    /// moves earlier while waiting restarts the wait against the new value.
    /// Returns `false` only when cancelled.
    pub async fn await_due(&self, cancel: &CancelToken) -> bool {
        let mut rx = self.next_deadline.subscribe();
        loop {
            if cancel.is_cancelled() {
                return false;
            }

            let next = *rx.borrow_and_update();
            let Some(deadline) = next else {
                tokio::select! {
                    changed = rx.changed() => {
                        // The sender is owned by `self`; it cannot be dropped while we wait.
                        if changed.is_err() {
                            return false;
                        }
                    }
                    _ = cancel.cancelled() => return false,
                }
                continue;
            };

            let remaining = match (deadline - self.clock.now()).to_std() {
                Ok(remaining) if !remaining.is_zero() => remaining,
                _ => return true,
            };

            tokio::select! {
                _ = tokio::time::sleep(remaining) => return true,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
                _ = cancel.cancelled() => return false,
            }
        }
    }
}

#[cfg(test)]
#[path = "expiry_tests.rs"]
mod tests;
