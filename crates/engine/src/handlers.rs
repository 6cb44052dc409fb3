// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named runners that take over chains with a `handler` set

use std::collections::HashMap;
use std::sync::Arc;
use wr_adapters::ScriptRunner;

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ScriptRunner>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `runner` under `name`, replacing any earlier registration
    pub fn register(&mut self, name: impl Into<String>, runner: Arc<dyn ScriptRunner>) {
        self.handlers.insert(name.into(), runner);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ScriptRunner>> {
        self.handlers.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
