// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Revision snapshot types

use crate::error::StoreError;
use crate::fingerprint::fnv1_64;
use crate::id::ChainId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position of a revision within its chain; the first revision is 1
pub type RevisionNumber = i64;

/// A stable reference to one snapshot of one chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionRevision {
    pub chain_id: ChainId,
    pub revision: RevisionNumber,
}

impl TransactionRevision {
    pub fn new(chain_id: ChainId, revision: RevisionNumber) -> Self {
        Self { chain_id, revision }
    }
}

impl std::fmt::Display for TransactionRevision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.chain_id, self.revision)
    }
}

/// Lifecycle status of a chain's head
///
/// Transitions are not enforced by the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Initialized,
    Authorized,
    Completed,
    Cancelled,
    Failed,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Cancelled | Status::Failed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Status::Initialized => "initialized",
            Status::Authorized => "authorized",
            Status::Completed => "completed",
            Status::Cancelled => "cancelled",
            Status::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Opaque work descriptor handed to a script runner
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script(pub String);

impl Script {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable FNV-1 hash of the script text
    pub fn fingerprint(&self) -> u64 {
        fnv1_64(self.0.as_bytes())
    }
}

/// One snapshot of a chain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionData {
    pub chain_id: ChainId,
    pub revision: RevisionNumber,
    /// Stamped by the store when the revision is appended
    pub created_at: DateTime<Utc>,
    /// Next wake deadline
    pub expires_at: Option<DateTime<Utc>>,
    /// When a deadline was consumed
    pub expired_at: Option<DateTime<Utc>>,
    pub payload: serde_json::Value,
    pub script: Option<Script>,
    pub parent: Option<TransactionRevision>,
    pub status: Status,
    /// Name of an alternate executor for this chain
    pub handler: Option<String>,
    pub error: Option<serde_json::Value>,
}

impl TransactionData {
    /// A revision-1 snapshot with an empty payload
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            revision: 1,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            expires_at: None,
            expired_at: None,
            payload: serde_json::Value::Null,
            script: None,
            parent: None,
            status: Status::Initialized,
            handler: None,
            error: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(Script::new(script));
        self
    }

    pub fn with_parent(mut self, parent: TransactionRevision) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_error(mut self, error: serde_json::Value) -> Self {
        self.error = Some(error);
        self
    }

    /// Reference to this exact snapshot
    pub fn revision_ref(&self) -> TransactionRevision {
        TransactionRevision::new(self.chain_id, self.revision)
    }

    /// Whether the wake deadline has passed as of `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// A copy positioned as the immediate successor of this snapshot
    pub fn successor(&self) -> Self {
        Self {
            revision: self.revision + 1,
            ..self.clone()
        }
    }

    /// Snapshot-local checks, independent of what the store holds
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.revision <= 0 {
            return Err(StoreError::InvalidRevision {
                chain_id: self.chain_id,
                revision: self.revision,
                head: 0,
            });
        }
        if let Some(parent) = &self.parent {
            if parent.chain_id == self.chain_id {
                return Err(self.invalid("a chain cannot be its own parent"));
            }
            if parent.revision <= 0 {
                return Err(self.invalid(format!(
                    "parent revision {} is not positive",
                    parent.revision
                )));
            }
        }
        Ok(())
    }

    /// Checks that only make sense relative to the revision this one succeeds
    pub fn validate_successor_of(&self, previous: &TransactionData) -> Result<(), StoreError> {
        if self.chain_id != previous.chain_id {
            return Err(StoreError::ChainMismatch {
                expected: previous.chain_id,
                actual: self.chain_id,
            });
        }
        let stamps_new_expiry = self.expired_at.is_some() && self.expired_at != previous.expired_at;
        if stamps_new_expiry && previous.expires_at.is_none() {
            return Err(self.invalid("expired_at set without a prior expires_at"));
        }
        Ok(())
    }

    fn invalid(&self, reason: impl Into<String>) -> StoreError {
        StoreError::InvalidDelta {
            chain_id: self.chain_id,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
