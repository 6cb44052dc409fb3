// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op script runner for deployments without a script engine.

use super::{ScriptError, ScriptRunner};
use crate::context::ScriptContext;
use async_trait::async_trait;
use wr_core::Script;

/// Script runner that accepts every script and does nothing.
///
/// A processor using it still consumes each wake, so deadlines do not re-fire.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpScriptRunner;

impl NoOpScriptRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScriptRunner for NoOpScriptRunner {
    async fn run(&self, _script: &Script, _ctx: &mut ScriptContext) -> Result<(), ScriptError> {
        Ok(())
    }
}
