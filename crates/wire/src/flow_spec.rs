// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned flow serialization format (spec §6 "Flow serialization
//! format"). Structural only: `class`/`config`/connections round-trip;
//! `RoutineLogic` is re-resolved through `RoutineFactory::build_flow` by
//! `class` name on load, in `flowengine` (this crate cannot depend on
//! `flowengine`, so the inverse of `from_flow` lives there).

use std::collections::HashMap;

use flowcore::{ErrorStrategy, ExecutionStrategy, Flow, FlowId};
use serde_json::Value;

/// Current format version this crate emits. Older versions are migrated
/// up to this one by [`crate::migration::MigrationRegistry`] before
/// being parsed into a `FlowSpec`.
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RoutineSpec {
    pub class: String,
    #[serde(default)]
    pub config: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handler: Option<ErrorStrategy>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConnectionSpec {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<HashMap<String, String>>,
}

impl ConnectionSpec {
    pub fn source_parts(&self) -> Option<(&str, &str)> {
        self.from.split_once('.')
    }

    pub fn target_parts(&self) -> Option<(&str, &str)> {
        self.to.split_once('.')
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExecutionSpec {
    pub strategy: ExecutionStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FlowSpec {
    pub version: u32,
    pub flow_id: FlowId,
    pub routines: HashMap<String, RoutineSpec>,
    pub connections: Vec<ConnectionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionSpec>,
}

impl FlowSpec {
    /// Structural projection of a live `Flow`; does not capture
    /// `RoutineLogic`.
    pub fn from_flow(flow: &Flow) -> Self {
        let routines = flow
            .routines()
            .map(|r| {
                (
                    r.id.to_string(),
                    RoutineSpec {
                        class: r.class_name.clone(),
                        config: r.config.clone(),
                        error_handler: if matches!(r.error_strategy, ErrorStrategy::Stop) {
                            None
                        } else {
                            Some(r.error_strategy.clone())
                        },
                    },
                )
            })
            .collect();
        let connections = flow
            .connections()
            .map(|c| ConnectionSpec {
                from: format!("{}.{}", c.source_routine, c.source_event),
                to: format!("{}.{}", c.target_routine, c.target_slot),
                mapping: c.param_mapping.clone(),
            })
            .collect();
        Self {
            version: CURRENT_VERSION,
            flow_id: flow.id,
            routines,
            connections,
            execution: Some(ExecutionSpec {
                strategy: flow.execution.strategy,
                max_workers: flow.execution.max_workers,
            }),
        }
    }
}

#[cfg(test)]
#[path = "flow_spec_tests.rs"]
mod tests;
