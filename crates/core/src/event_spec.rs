// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named output port on a routine (spec §4.2).
//!
//! Named `EventSpec` (not `Event`) to avoid colliding with the engine's
//! own execution-history vocabulary.

use std::collections::HashMap;

use serde_json::Value;

use crate::connection::Connection;
use crate::error::CoreError;
use crate::slot::Slot;

/// Whether a mismatch between declared `params` and the emitted keys is
/// rejected or coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaMode {
    Strict,
    #[default]
    Lenient,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EventSpec {
    pub name: String,
    pub params: Vec<String>,
}

impl EventSpec {
    pub fn new(name: impl Into<String>, params: Vec<String>) -> Self {
        Self { name: name.into(), params }
    }

    /// Validate and, in lenient mode, normalize an emission against the
    /// declared parameter list.
    pub fn validate(
        &self,
        kwargs: HashMap<String, Value>,
        mode: SchemaMode,
    ) -> Result<HashMap<String, Value>, CoreError> {
        let missing: Vec<&str> = self
            .params
            .iter()
            .filter(|p| !kwargs.contains_key(p.as_str()))
            .map(|p| p.as_str())
            .collect();
        let extra: Vec<String> = kwargs
            .keys()
            .filter(|k| !self.params.contains(k))
            .map(|k| k.to_string())
            .collect();

        if mode == SchemaMode::Strict && (!missing.is_empty() || !extra.is_empty()) {
            return Err(CoreError::SchemaError {
                routine_id: String::new(),
                event: self.name.clone(),
                detail: format!("missing={missing:?} extra={extra:?}"),
            });
        }

        let mut normalized = kwargs;
        for p in &missing {
            normalized.insert((*p).to_string(), Value::Null);
        }
        for e in &extra {
            normalized.remove(e.as_str());
        }
        Ok(normalized)
    }

    /// Walk `connections` in registration order, mapping and delivering to
    /// each target slot. Returns the first backpressure error encountered,
    /// after attempting delivery to every connection (spec: "returns only
    /// once every target has accepted or rejected").
    pub fn emit<'a>(
        &self,
        connections: &[&Connection],
        kwargs: HashMap<String, Value>,
        job_id: crate::job::JobId,
        target_slots: impl Fn(&Connection) -> Option<&'a Slot>,
    ) -> Result<(), CoreError> {
        let mut first_err = None;
        for conn in connections {
            let mapped = conn.apply_mapping(&kwargs);
            let Some(slot) = target_slots(conn) else {
                continue;
            };
            let item = Value::Object(mapped.into_iter().collect());
            if let Err(e) = slot.receive(job_id, item) {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "event_spec_tests.rs"]
mod tests;
