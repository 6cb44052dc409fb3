// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wr-core: the workflow-record revision model and its coordination primitives
//!
//! This crate provides:
//! - Transaction chains: immutable, optimistically appended revision snapshots
//! - The `TransactionStore` / `StateStore` contracts backends implement
//! - A per-chain lock table, an expiry scheduler and a commit bus that
//!   backends embed by composition
//! - Clock, id and cancellation abstractions for deterministic tests

pub mod cancel;
pub mod clock;
pub mod config;
pub mod coordination;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod id;
pub mod scheduling;
pub mod store;
pub mod transaction;

// Re-exports
pub use cancel::CancelToken;
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError, ProcessorConfig, StoreConfig};
pub use coordination::LockTable;
pub use error::StoreError;
pub use events::{CommitBus, SubscriberId, Subscription};
pub use id::{ChainId, IdGen, SequentialIdGen, UuidIdGen};
pub use scheduling::ExpiryScheduler;
pub use store::{CommitFilter, Query, StateStore, TransactionStore};
pub use transaction::{
    RevisionNumber, Script, Status, Store, Transaction, TransactionData, TransactionRevision,
};
