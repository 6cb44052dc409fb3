//! Shared setup for specs

#![allow(dead_code)]

pub use chrono::Duration as ChronoDuration;
pub use serde_json::json;
pub use std::sync::Arc;
pub use std::time::Duration;
pub use wr_adapters::{FakeOutcome, FakeScriptRunner, ScriptError, TracedScriptRunner};
pub use wr_core::{
    CancelToken, ChainId, Clock, Config, FakeClock, ProcessorConfig, SequentialIdGen, StateStore,
    Status, Store, StoreError, Transaction, TransactionData, TransactionRevision,
};
pub use wr_engine::{ProcessOutcome, Processor, ProcessorDeps};
pub use wr_storage::RevisionStore;

/// Install a test subscriber honoring `RUST_LOG`; repeated calls are harmless
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn id(n: u128) -> ChainId {
    ChainId::from_u128(n)
}

/// A store, a scriptable runner and a processor over them
pub struct Stack {
    pub clock: FakeClock,
    pub backend: Arc<RevisionStore<FakeClock>>,
    pub store: Store,
    pub runner: FakeScriptRunner,
    pub processor: Arc<Processor<FakeClock, SequentialIdGen>>,
}

impl Stack {
    pub fn new() -> Self {
        Self::with_backend(FakeClock::new(), |clock| RevisionStore::in_memory(clock))
    }

    pub fn durable(path: &std::path::Path) -> Self {
        Self::with_backend(FakeClock::new(), |clock| {
            RevisionStore::open(path, true, clock).unwrap()
        })
    }

    pub fn with_backend(
        clock: FakeClock,
        build: impl FnOnce(FakeClock) -> RevisionStore<FakeClock>,
    ) -> Self {
        init_tracing();
        let backend = Arc::new(build(clock.clone()));
        let store = Store::new(backend.clone());
        let runner = FakeScriptRunner::new();
        let deps = ProcessorDeps::new(
            store.clone(),
            backend.clone(),
            Arc::new(TracedScriptRunner::new(runner.clone())),
        );
        let processor = Processor::new(
            deps,
            clock.clone(),
            SequentialIdGen::new(0xdead),
            ProcessorConfig::default(),
        );
        Self {
            clock,
            backend,
            store,
            runner,
            processor: Arc::new(processor),
        }
    }

    /// A deadline one second in the past
    pub fn overdue(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now() - ChronoDuration::seconds(1)
    }
}
