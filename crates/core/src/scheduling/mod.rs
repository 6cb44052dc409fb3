// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline tracking for chains waiting to be re-processed

mod expiry;

pub use expiry::ExpiryScheduler;
