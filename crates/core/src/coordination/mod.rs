// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application-level mutual exclusion per chain
//!
//! The lock table guards read-modify-write sequences that callers run against
//! a chain. Stores never take these locks themselves; their revision check is
//! the second line of defense when a caller skips locking.

mod lock;

pub use lock::LockTable;
