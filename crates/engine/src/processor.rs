// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transaction processor: the loop that runs due chains
//!
//! Each iteration waits for due chains, then for every one it can lock: runs
//! the chain's handler or script, records a failure on the chain if the work
//! raised one, and frees the lock.

use crate::error::ProcessError;
use crate::handlers::HandlerRegistry;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::Instrument;
use wr_adapters::{ScriptContext, ScriptError, ScriptRunner, Services};
use wr_core::{
    CancelToken, Clock, IdGen, ProcessorConfig, Script, StateStore, Status, Store, StoreError,
    Transaction, TransactionData, TransactionRevision,
};

/// What happened to one due chain
#[derive(Clone, Debug, PartialEq)]
pub enum ProcessOutcome {
    /// Another worker holds the lock
    Skipped,
    /// The deadline was consumed before the lock was taken
    Stale,
    /// No work to run; the deadline was consumed
    Consumed,
    /// Work succeeded; holds the chain's resulting head
    Ran(TransactionRevision),
    /// Work failed; holds the revision the failure was recorded at
    Failed(TransactionRevision),
    /// Work failed and neither the chain nor a failure record accepted it
    Unrecorded,
}

/// Processor dependencies
pub struct ProcessorDeps {
    pub store: Store,
    pub state_store: Arc<dyn StateStore>,
    /// Runs chains without a handler
    pub runner: Arc<dyn ScriptRunner>,
    pub handlers: HandlerRegistry,
    pub services: Services,
}

impl ProcessorDeps {
    pub fn new(
        store: Store,
        state_store: Arc<dyn StateStore>,
        runner: Arc<dyn ScriptRunner>,
    ) -> Self {
        Self {
            store,
            state_store,
            runner,
            handlers: HandlerRegistry::new(),
            services: Services::new(),
        }
    }

    pub fn with_handler(mut self, name: impl Into<String>, runner: Arc<dyn ScriptRunner>) -> Self {
        self.handlers.register(name, runner);
        self
    }

    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }
}

/// Work chosen for a locked chain
enum Work<'a> {
    Run(&'a Arc<dyn ScriptRunner>, Script),
    Reject(ScriptError),
    Consume,
}

pub struct Processor<C: Clock, I: IdGen> {
    store: Store,
    state_store: Arc<dyn StateStore>,
    runner: Arc<dyn ScriptRunner>,
    handlers: HandlerRegistry,
    services: Services,
    clock: C,
    id_gen: I,
    config: ProcessorConfig,
}

impl<C: Clock, I: IdGen> Processor<C, I> {
    pub fn new(deps: ProcessorDeps, clock: C, id_gen: I, config: ProcessorConfig) -> Self {
        Self {
            store: deps.store,
            state_store: deps.state_store,
            runner: deps.runner,
            handlers: deps.handlers,
            services: deps.services,
            clock,
            id_gen,
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Start `workers` loops sharing this processor
    ///
    /// Workers contend for the same due chains; losing a lock is the normal
    /// skip path.
    pub fn spawn(
        self: &Arc<Self>,
        workers: usize,
        cancel: &CancelToken,
    ) -> JoinSet<Result<(), ProcessError>> {
        let mut set = JoinSet::new();
        for worker in 0..workers.max(1) {
            let processor = Arc::clone(self);
            let cancel = cancel.clone();
            set.spawn(
                async move { processor.run(&cancel).await }
                    .instrument(tracing::info_span!("processor", worker)),
            );
        }
        set
    }

    /// Run the configured number of workers until cancelled
    pub async fn run_workers(self: &Arc<Self>, cancel: &CancelToken) -> Result<(), ProcessError> {
        let mut set = self.spawn(self.config.workers, cancel);
        while let Some(joined) = set.join_next().await {
            joined??;
        }
        Ok(())
    }

    /// Loop until cancelled
    pub async fn run(&self, cancel: &CancelToken) -> Result<(), ProcessError> {
        tracing::info!("processor started");
        while !cancel.is_cancelled() {
            self.process_due(cancel).await?;
            tokio::task::yield_now().await;
        }
        tracing::info!("processor stopped");
        Ok(())
    }

    /// One iteration: wait for due chains and process each
    pub async fn process_due(
        &self,
        cancel: &CancelToken,
    ) -> Result<Vec<ProcessOutcome>, ProcessError> {
        let due = self.store.due_chains(cancel).await?;
        if due.is_empty() {
            tracing::debug!("woke with nothing due");
        }

        let mut outcomes = Vec::with_capacity(due.len());
        for head in due {
            if cancel.is_cancelled() {
                break;
            }
            let id = head.chain_id;
            match self.process_one(head, cancel).await {
                Ok(outcome) => outcomes.push(outcome),
                // One chain's store trouble must not stop the others
                Err(e) => tracing::error!(chain = %id, error = %e, "processing failed"),
            }
        }
        Ok(outcomes)
    }

    /// Lock, run and free one due chain. Cancelling while waiting for the lock skips it.
    pub async fn process_one(
        &self,
        due: Transaction,
        cancel: &CancelToken,
    ) -> Result<ProcessOutcome, ProcessError> {
        let span = tracing::info_span!("process", chain = %due.chain_id, revision = due.revision);
        async {
            match due.try_lock(self.config.lock_timeout, cancel).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!("lock held elsewhere, skipping");
                    return Ok(ProcessOutcome::Skipped);
                }
                Err(StoreError::ChainMissing(_)) => return Ok(ProcessOutcome::Skipped),
                Err(e) => return Err(e.into()),
            }

            let result = self.execute(&due).await;

            if let Err(e) = due.free().await {
                tracing::warn!(error = %e, "failed to free chain lock");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, due: &Transaction) -> Result<ProcessOutcome, ProcessError> {
        // The scan's snapshot may predate a commit made before we took the lock
        let current = due.fetch_next().await?;
        let now = self.clock.now();
        if !current.is_due(now) {
            tracing::debug!(head = current.revision, "deadline already consumed");
            return Ok(ProcessOutcome::Stale);
        }

        let work = match (&current.handler, &current.script) {
            (Some(name), script) => match self.handlers.get(name) {
                Some(runner) => {
                    Work::Run(runner, script.clone().unwrap_or_else(|| Script::new("")))
                }
                None => Work::Reject(ScriptError::runtime(format!("unknown handler: {name}"))),
            },
            (None, Some(script)) => Work::Run(&self.runner, script.clone()),
            (None, None) => Work::Consume,
        };

        let result = match work {
            Work::Consume => {
                return match self.consume(&current, now).await? {
                    Some(consumed) => {
                        tracing::debug!(revision = consumed.revision, "wake consumed");
                        Ok(ProcessOutcome::Consumed)
                    }
                    None => Ok(ProcessOutcome::Stale),
                };
            }
            Work::Reject(err) => Err((current, err)),
            Work::Run(runner, script) => {
                let state_store = Arc::clone(&self.state_store);
                match ScriptContext::load(current.clone(), state_store, self.services.clone()).await {
                    Ok(mut ctx) => match runner.run(&script, &mut ctx).await {
                        Ok(()) => Ok(ctx),
                        Err(err) => Err((ctx.into_transaction(), err)),
                    },
                    Err(e) => Err((current, ScriptError::from(e))),
                }
            }
        };

        match result {
            Ok(ctx) => {
                let head = if ctx.has_committed() {
                    ctx.transaction().revision_ref()
                } else {
                    self.consume_after_run(ctx.transaction(), now).await?
                };
                Ok(ProcessOutcome::Ran(head))
            }
            Err((snapshot, err)) => Ok(self.record_failure(&snapshot, &err).await),
        }
    }

    /// Commit the no-op delta that clears a consumed deadline
    async fn consume(
        &self,
        current: &Transaction,
        now: DateTime<Utc>,
    ) -> Result<Option<Transaction>, StoreError> {
        match self.store.commit_delta(current, current.consume_delta(now)).await {
            Ok(consumed) => Ok(Some(consumed)),
            Err(e) if e.is_conflict() => {
                tracing::debug!("chain advanced while consuming its deadline");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Successful work that committed nothing still consumes the wake
    async fn consume_after_run(
        &self,
        snapshot: &Transaction,
        now: DateTime<Utc>,
    ) -> Result<TransactionRevision, ProcessError> {
        match self.consume(snapshot, now).await? {
            Some(consumed) => Ok(consumed.revision_ref()),
            None => Ok(snapshot.fetch_next().await?.revision_ref()),
        }
    }

    /// Commit `Failed` on the chain, or on a new record chain if that loses a race
    async fn record_failure(&self, snapshot: &Transaction, err: &ScriptError) -> ProcessOutcome {
        let cause = err.to_payload();
        let now = self.clock.now();
        let failed = snapshot.delta(|next| {
            if next.expires_at.take().is_some() {
                next.expired_at = Some(now);
            }
            next.status = Status::Failed;
            next.error = Some(cause.clone());
        });

        let commit_err = match self.store.commit_delta(snapshot, failed).await {
            Ok(recorded) => {
                tracing::warn!(kind = err.kind(), error = %err, revision = recorded.revision, "work failed");
                return ProcessOutcome::Failed(recorded.revision_ref());
            }
            Err(e) => e,
        };

        tracing::error!(
            kind = err.kind(),
            error = %err,
            commit_error = %commit_err,
            "could not record failure on chain, creating a failure record"
        );
        let record = TransactionData::new(self.id_gen.next())
            .with_parent(snapshot.revision_ref())
            .with_status(Status::Failed)
            .with_payload(json!({
                "kind": "double_failure",
                "chain_id": snapshot.chain_id,
                "revision": snapshot.revision,
            }))
            .with_error(unrecorded_failure_error(&commit_err, cause));

        match self.store.create_chain(record).await {
            Ok(created) => {
                tracing::warn!(record = %created.chain_id, "failure recorded on a new chain");
                ProcessOutcome::Failed(created.revision_ref())
            }
            Err(e) => {
                tracing::error!(error = %e, "failure record could not be created");
                ProcessOutcome::Unrecorded
            }
        }
    }
}

/// Error payload for a failure that could not be committed on its own chain
fn unrecorded_failure_error(
    commit_err: &StoreError,
    cause: serde_json::Value,
) -> serde_json::Value {
    let kind = if commit_err.is_conflict() {
        "optimistic_concurrency"
    } else {
        "failure_commit_failed"
    };
    json!({
        "kind": kind,
        "message": commit_err.to_string(),
        "cause": cause,
    })
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
