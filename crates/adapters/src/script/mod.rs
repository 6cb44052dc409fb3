// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script runner adapters

mod noop;

pub use noop::NoOpScriptRunner;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeOutcome, FakeScriptRunner, ScriptCall};

use crate::context::ScriptContext;
use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use wr_core::{Script, StoreError};

/// Errors raised by a script run
///
/// The two kinds are kept apart so failure records say whether the script
/// never ran or failed while running.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("compilation failed: {message}")]
    Compilation {
        message: String,
        diagnostics: Vec<String>,
    },
    #[error("runtime failure: {message}")]
    Runtime { message: String },
}

impl ScriptError {
    pub fn compilation(message: impl Into<String>, diagnostics: Vec<String>) -> Self {
        Self::Compilation {
            message: message.into(),
            diagnostics,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Compilation { .. } => "compilation",
            Self::Runtime { .. } => "runtime",
        }
    }

    /// Structured form stored in a failed revision's `error`
    pub fn to_payload(&self) -> serde_json::Value {
        match self {
            Self::Compilation {
                message,
                diagnostics,
            } => json!({
                "kind": self.kind(),
                "message": message,
                "diagnostics": diagnostics,
            }),
            Self::Runtime { message } => json!({
                "kind": self.kind(),
                "message": message,
            }),
        }
    }
}

impl From<StoreError> for ScriptError {
    fn from(err: StoreError) -> Self {
        Self::runtime(err.to_string())
    }
}

/// Executes a chain's script against an execution context
///
/// The runner owns script semantics entirely; callers never inspect the
/// script text. Work the script does to the chain goes through
/// [`ScriptContext::commit_delta`].
#[async_trait]
pub trait ScriptRunner: Send + Sync + 'static {
    async fn run(&self, script: &Script, ctx: &mut ScriptContext) -> Result<(), ScriptError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
