// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Name -> constructor registry so flows can be built by class name
//! without reflection (spec §9 "Runtime assembly of routines from
//! strings"), grounded on `routilux/tools/factory`.

use std::collections::HashMap;
use std::sync::Arc;

use flowcore::{ExecutionStrategyHint, Flow, Routine, RoutineId};
use flowwire::FlowSpec;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

type Constructor = Arc<dyn Fn(RoutineId, &HashMap<String, Value>) -> Routine + Send + Sync>;

/// Maps a short class name (as written in a `FlowSpec`'s `routines.*.class`)
/// to a constructor callback. The DSL loader and all adapters go through
/// this factory; there is no dynamic reflection in the core.
#[derive(Default, Clone)]
pub struct RoutineFactory {
    constructors: HashMap<String, Constructor>,
}

impl RoutineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        class_name: impl Into<String>,
        constructor: impl Fn(RoutineId, &HashMap<String, Value>) -> Routine + Send + Sync + 'static,
    ) {
        self.constructors.insert(class_name.into(), Arc::new(constructor));
    }

    pub fn is_registered(&self, class_name: &str) -> bool {
        self.constructors.contains_key(class_name)
    }

    pub fn build(
        &self,
        class_name: &str,
        id: RoutineId,
        config: &HashMap<String, Value>,
    ) -> EngineResult<Routine> {
        let ctor = self
            .constructors
            .get(class_name)
            .ok_or_else(|| EngineError::UnknownRoutineClass(class_name.to_string()))?;
        let mut routine = ctor(id, config);
        routine.set_config(config.clone());
        Ok(routine)
    }

    /// Rebuild a live `Flow` from a `FlowSpec`, re-resolving each
    /// routine's `RoutineLogic` through this factory by `class` name
    /// (spec §6 "Flow serialization format"). The inverse of
    /// `FlowSpec::from_flow`.
    pub fn build_flow(&self, spec: &FlowSpec) -> EngineResult<Flow> {
        let mut flow = Flow::new(None);
        flow.id = spec.flow_id;

        for (id_str, routine_spec) in &spec.routines {
            let id = RoutineId::from_string(id_str);
            let mut routine = self.build(&routine_spec.class, id, &routine_spec.config)?;
            if let Some(strategy) = &routine_spec.error_handler {
                routine.set_error_strategy(strategy.clone());
            }
            flow.add_routine(routine)?;
        }

        for conn in &spec.connections {
            let (source_id, source_event) = conn
                .source_parts()
                .ok_or_else(|| EngineError::Internal(format!("malformed connection source: {}", conn.from)))?;
            let (target_id, target_slot) = conn
                .target_parts()
                .ok_or_else(|| EngineError::Internal(format!("malformed connection target: {}", conn.to)))?;
            flow.connect(
                RoutineId::from_string(source_id),
                source_event,
                RoutineId::from_string(target_id),
                target_slot,
                conn.mapping.clone(),
            )?;
        }

        if let Some(exec) = &spec.execution {
            flow.execution = ExecutionStrategyHint { strategy: exec.strategy, max_workers: exec.max_workers };
        }

        Ok(flow)
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
