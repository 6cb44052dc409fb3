// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution context handed to a script run

use crate::script::ScriptError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use wr_core::{StateStore, StoreError, Transaction, TransactionData};

/// Shared dependencies a script can resolve by type
#[derive(Clone, Default)]
pub struct Services {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value, replacing any earlier one of the same type
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| Arc::clone(entry).downcast::<T>().ok())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A locked chain's snapshot plus what a script needs to resume and advance it
pub struct ScriptContext {
    transaction: Transaction,
    state: Vec<u8>,
    state_store: Arc<dyn StateStore>,
    services: Services,
    committed: bool,
}

impl ScriptContext {
    pub fn new(
        transaction: Transaction,
        state: Vec<u8>,
        state_store: Arc<dyn StateStore>,
        services: Services,
    ) -> Self {
        Self {
            transaction,
            state,
            state_store,
            services,
            committed: false,
        }
    }

    /// Build a context, loading whatever state was saved at this exact revision
    pub async fn load(
        transaction: Transaction,
        state_store: Arc<dyn StateStore>,
        services: Services,
    ) -> Result<Self, StoreError> {
        let state = state_store.load_state(transaction.revision_ref()).await?;
        Ok(Self::new(transaction, state, state_store, services))
    }

    /// The newest snapshot this context has seen or committed
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn into_transaction(self) -> Transaction {
        self.transaction
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Raw state bytes; empty when nothing was saved
    pub fn state(&self) -> &[u8] {
        &self.state
    }

    /// Decode saved state, or `None` when nothing was saved
    pub fn state_as<T: DeserializeOwned>(&self) -> Result<Option<T>, ScriptError> {
        if self.state.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&self.state)
            .map(Some)
            .map_err(|e| ScriptError::runtime(format!("undecodable script state: {e}")))
    }

    /// Persist state against the current revision
    pub async fn save_state(&mut self, state: Vec<u8>) -> Result<(), StoreError> {
        self.state_store
            .save_state(self.transaction.revision_ref(), state.clone())
            .await?;
        self.state = state;
        Ok(())
    }

    pub async fn save_state_as<T: Serialize + Sync>(&mut self, value: &T) -> Result<(), ScriptError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ScriptError::runtime(format!("unencodable script state: {e}")))?;
        Ok(self.save_state(bytes).await?)
    }

    /// Commit a delta on the current snapshot and advance to the result
    pub async fn commit_delta(
        &mut self,
        mutate: impl FnOnce(&mut TransactionData) + Send,
    ) -> Result<&Transaction, StoreError> {
        let next = self.transaction.commit_delta(mutate).await?;
        tracing::debug!(chain = %next.chain_id, revision = next.revision, "script committed");
        self.transaction = next;
        self.committed = true;
        Ok(&self.transaction)
    }

    /// Whether any delta was committed through this context
    pub fn has_committed(&self) -> bool {
        self.committed
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
