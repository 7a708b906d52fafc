// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Migration registry for flow serialization (spec §6), grounded on
//! `routilux/core/migration.py`'s `MigrationRegistry` singleton.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

type MigrationFn = Box<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration must move forward: from={from} to={to}")]
    NotForward { from: u32, to: u32 },
    #[error("migration from={from} to={to} already registered")]
    Duplicate { from: u32, to: u32 },
    #[error("no migration path from version {from} to {to}")]
    NoPath { from: u32, to: u32 },
}

/// Maps `(from_version, to_version)` to a pure function on the
/// serialized dictionary. Deserialization walks single-version hops to
/// the target version.
#[derive(Default)]
pub struct MigrationRegistry {
    steps: HashMap<(u32, u32), MigrationFn>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        from: u32,
        to: u32,
        f: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Result<(), MigrationError> {
        if from >= to {
            return Err(MigrationError::NotForward { from, to });
        }
        if self.steps.contains_key(&(from, to)) {
            return Err(MigrationError::Duplicate { from, to });
        }
        self.steps.insert((from, to), Box::new(f));
        Ok(())
    }

    /// Walk single-version hops from `from` to `target`, applying each
    /// registered step in turn.
    pub fn migrate(&self, mut doc: Value, mut from: u32, target: u32) -> Result<Value, MigrationError> {
        while from < target {
            let step = self
                .steps
                .get(&(from, from + 1))
                .ok_or(MigrationError::NoPath { from, to: target })?;
            doc = step(doc);
            from += 1;
        }
        Ok(doc)
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
