// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::context::ScriptContext;
use crate::script::{ScriptError, ScriptRunner};
use async_trait::async_trait;
use tracing::Instrument;
use wr_core::Script;

/// Wrapper that adds tracing to any ScriptRunner
#[derive(Clone)]
pub struct TracedScriptRunner<R> {
    inner: R,
}

impl<R> TracedScriptRunner<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: ScriptRunner> ScriptRunner for TracedScriptRunner<R> {
    async fn run(&self, script: &Script, ctx: &mut ScriptContext) -> Result<(), ScriptError> {
        let (chain, revision) = (ctx.transaction().chain_id, ctx.transaction().revision);
        let fingerprint = format!("{:016x}", script.fingerprint());
        let span = tracing::info_span!("script.run", chain = %chain, revision, fingerprint = %fingerprint);
        async move {
            tracing::info!(
                script_len = script.as_str().len(),
                state_len = ctx.state().len(),
                "starting"
            );

            let start = std::time::Instant::now();
            let result = self.inner.run(script, ctx).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    committed = ctx.has_committed(),
                    "script finished"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    kind = e.kind(),
                    error = %e,
                    "script failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
