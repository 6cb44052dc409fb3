// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wr-engine: the transaction processor

mod error;
mod handlers;
mod processor;

pub use error::ProcessError;
pub use handlers::HandlerRegistry;
pub use processor::{ProcessOutcome, Processor, ProcessorDeps};
