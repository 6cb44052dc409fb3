// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commit notifications
//!
//! Every revision a store appends is published on a [`CommitBus`]. Listeners
//! subscribe with a predicate and unsubscribe by dropping their
//! [`Subscription`]; `wait_for` is the one-shot form used as a barrier.

mod bus;

pub use bus::{CommitBus, SubscriberId, Subscription};
