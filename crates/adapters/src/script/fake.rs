// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake script runner for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ScriptError, ScriptRunner};
use crate::context::ScriptContext;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wr_core::{ChainId, RevisionNumber, Script, Status};

/// Recorded script run
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCall {
    pub chain_id: ChainId,
    pub revision: RevisionNumber,
    pub fingerprint: u64,
    pub state: Vec<u8>,
}

/// What the fake does when it runs a chain's script
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    /// Return without touching the chain
    Succeed,
    /// Commit a `Completed` revision through the context
    Complete,
    /// Save the given state at the current revision
    SaveState(Vec<u8>),
    Fail(ScriptError),
    /// Advance the chain behind the context's back, then fail
    AdvanceThenFail(ScriptError),
}

/// Fake script runner for testing
#[derive(Clone, Default)]
pub struct FakeScriptRunner {
    outcomes: Arc<Mutex<HashMap<ChainId, FakeOutcome>>>,
    calls: Arc<Mutex<Vec<ScriptCall>>>,
}

impl FakeScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outcome for runs of `chain_id`; unset chains succeed
    pub fn set_outcome(&self, chain_id: ChainId, outcome: FakeOutcome) {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(chain_id, outcome);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ScriptCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls_for(&self, chain_id: ChainId) -> Vec<ScriptCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.chain_id == chain_id)
            .collect()
    }
}

#[async_trait]
impl ScriptRunner for FakeScriptRunner {
    async fn run(&self, script: &Script, ctx: &mut ScriptContext) -> Result<(), ScriptError> {
        let chain_id = ctx.transaction().chain_id;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ScriptCall {
                chain_id,
                revision: ctx.transaction().revision,
                fingerprint: script.fingerprint(),
                state: ctx.state().to_vec(),
            });

        let outcome = self
            .outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&chain_id)
            .cloned()
            .unwrap_or(FakeOutcome::Succeed);

        match outcome {
            FakeOutcome::Succeed => Ok(()),
            FakeOutcome::Complete => {
                ctx.commit_delta(|next| {
                    next.status = Status::Completed;
                    next.expires_at = None;
                })
                .await?;
                Ok(())
            }
            FakeOutcome::SaveState(state) => Ok(ctx.save_state(state).await?),
            FakeOutcome::Fail(err) => Err(err),
            FakeOutcome::AdvanceThenFail(err) => {
                // Commits through the snapshot, leaving the context's view stale
                ctx.transaction().commit_delta(|_| {}).await?;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
