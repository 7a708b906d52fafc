// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed directed edge from an event on one routine to a slot on another
//! (spec §4.3).

use std::collections::HashMap;

use crate::routine::RoutineId;

/// Immutable once built into a [`crate::flow::Flow`]. `param_mapping` is
/// static: a map from source parameter name to target key name. Unmapped
/// parameters pass through unchanged.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Connection {
    pub source_routine: RoutineId,
    pub source_event: String,
    pub target_routine: RoutineId,
    pub target_slot: String,
    pub param_mapping: Option<HashMap<String, String>>,
}

impl Connection {
    pub fn new(
        source_routine: RoutineId,
        source_event: impl Into<String>,
        target_routine: RoutineId,
        target_slot: impl Into<String>,
    ) -> Self {
        Self {
            source_routine,
            source_event: source_event.into(),
            target_routine,
            target_slot: target_slot.into(),
            param_mapping: None,
        }
    }

    pub fn with_mapping(mut self, mapping: HashMap<String, String>) -> Self {
        self.param_mapping = Some(mapping);
        self
    }

    /// Rename keys per `param_mapping`; pass unmapped keys through.
    pub fn apply_mapping(
        &self,
        kwargs: &HashMap<String, serde_json::Value>,
    ) -> HashMap<String, serde_json::Value> {
        let Some(mapping) = &self.param_mapping else {
            return kwargs.clone();
        };
        kwargs
            .iter()
            .map(|(k, v)| {
                let renamed = mapping.get(k).cloned().unwrap_or_else(|| k.clone());
                (renamed, v.clone())
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
