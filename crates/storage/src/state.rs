// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized chains and state blobs built from WAL operations

use crate::wal::Operation;
use std::collections::HashMap;
use thiserror::Error;
use wr_core::{ChainId, RevisionNumber, TransactionData, TransactionRevision};

/// An operation that does not extend its chain by exactly one revision
#[derive(Debug, Error, PartialEq)]
pub enum ApplyError {
    #[error("revision {revision} does not follow head {head} of chain {chain_id}")]
    OutOfOrder {
        chain_id: ChainId,
        revision: RevisionNumber,
        head: RevisionNumber,
    },
}

/// Every chain's revisions in order, plus saved script state
#[derive(Debug, Default)]
pub struct MaterializedState {
    chains: HashMap<ChainId, Vec<TransactionData>>,
    states: HashMap<TransactionRevision, Vec<u8>>,
}

impl MaterializedState {
    /// Apply an operation to update the state
    pub fn apply(&mut self, op: Operation) -> Result<(), ApplyError> {
        match op {
            Operation::Commit { revision } => {
                let chain = self.chains.entry(revision.chain_id).or_default();
                let head = chain.last().map_or(0, |h| h.revision);
                if revision.revision != head + 1 {
                    let err = ApplyError::OutOfOrder {
                        chain_id: revision.chain_id,
                        revision: revision.revision,
                        head,
                    };
                    if chain.is_empty() {
                        self.chains.remove(&revision.chain_id);
                    }
                    return Err(err);
                }
                chain.push(revision);
            }

            Operation::SaveState { revision, state } => {
                self.states.insert(revision, state);
            }
        }
        Ok(())
    }

    pub fn contains(&self, id: &ChainId) -> bool {
        self.chains.contains_key(id)
    }

    pub fn head(&self, id: &ChainId) -> Option<&TransactionData> {
        self.chains.get(id).and_then(|chain| chain.last())
    }

    /// Revisions are gap-free from 1, so revision `n` sits at index `n - 1`
    pub fn revision(&self, id: &ChainId, revision: RevisionNumber) -> Option<&TransactionData> {
        let index = usize::try_from(revision.checked_sub(1)?).ok()?;
        self.chains.get(id)?.get(index)
    }

    pub fn chain(&self, id: &ChainId) -> Option<&[TransactionData]> {
        self.chains.get(id).map(Vec::as_slice)
    }

    pub fn heads(&self) -> impl Iterator<Item = &TransactionData> {
        self.chains.values().filter_map(|chain| chain.last())
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn state(&self, revision: &TransactionRevision) -> Option<&[u8]> {
        self.states.get(revision).map(Vec::as_slice)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
