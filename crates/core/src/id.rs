// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chain identifiers and their generation

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Opaque 128-bit identity shared by every revision of one chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub Uuid);

impl ChainId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChainId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Generates unique chain identifiers
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next(&self) -> ChainId;
}

/// UUID-based ID generator for production use
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> ChainId {
        ChainId::new_v4()
    }
}

/// Sequential ID generator for testing
///
/// The high 64 bits carry a fixed namespace so ids from different
/// generators never collide in a shared store.
#[derive(Clone)]
pub struct SequentialIdGen {
    namespace: u64,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(namespace: u64) -> Self {
        Self {
            namespace,
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new(0)
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> ChainId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        ChainId::from_u128(((self.namespace as u128) << 64) | n as u128)
    }
}
