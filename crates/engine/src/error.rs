// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the transaction processor

use thiserror::Error;
use wr_core::StoreError;

/// Errors that stop a processor worker
///
/// Script failures never appear here: they are recorded on the chain.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
