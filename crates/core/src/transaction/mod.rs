// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transaction chains: immutable revision snapshots and the handle callers use
//! to read, lock and extend them

mod data;
mod handle;

pub use data::{RevisionNumber, Script, Status, TransactionData, TransactionRevision};
pub use handle::{Store, Transaction};
