// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every store backend

use crate::id::ChainId;
use crate::transaction::RevisionNumber;
use thiserror::Error;

/// Errors surfaced by store, lock and scheduling operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chain already exists: {0}")]
    ChainExists(ChainId),
    #[error("chain not found: {0}")]
    ChainMissing(ChainId),
    #[error("revision not found: {chain_id}@{revision}")]
    RevisionMissing {
        chain_id: ChainId,
        revision: RevisionNumber,
    },
    /// Lost an optimistic race: the target revision was committed by someone else
    #[error("revision already exists: {chain_id}@{revision}")]
    RevisionAlreadyExists {
        chain_id: ChainId,
        revision: RevisionNumber,
    },
    #[error("invalid revision {revision} for chain {chain_id} (head is {head})")]
    InvalidRevision {
        chain_id: ChainId,
        revision: RevisionNumber,
        head: RevisionNumber,
    },
    #[error("delta for chain {expected} targets chain {actual}")]
    ChainMismatch { expected: ChainId, actual: ChainId },
    #[error("invalid delta for chain {chain_id}: {reason}")]
    InvalidDelta { chain_id: ChainId, reason: String },
    #[error("timed out waiting for lock on {0}")]
    Timeout(ChainId),
    #[error("cancelled while waiting for lock on {0}")]
    Cancelled(ChainId),
    #[error("lock not held: {0}")]
    NotLocked(ChainId),
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap a backend-specific failure
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }

    /// True for the optimistic-concurrency loss callers may retry after refetching
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::RevisionAlreadyExists { .. })
    }
}
