// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for script execution

pub mod context;
pub mod script;
pub mod traced;

pub use context::{ScriptContext, Services};
pub use script::{NoOpScriptRunner, ScriptError, ScriptRunner};
pub use traced::TracedScriptRunner;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use script::{FakeOutcome, FakeScriptRunner, ScriptCall};
