// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wr-storage: the reference revision store backend

mod state;
mod store;
mod wal;

pub use state::{ApplyError, MaterializedState};
pub use store::RevisionStore;
pub use wal::{Operation, Wal, WalError};
