// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named directed graph of routines and connections (spec §4.6).

use indexmap::IndexMap;

use crate::connection::Connection;
use crate::define_id;
use crate::error::CoreError;
use crate::routine::{Routine, RoutineId};

define_id! {
    /// Identifies a registered flow.
    pub struct FlowId("flw-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    Sequential,
    Parallel,
}

impl Default for ExecutionStrategy {
    fn default() -> Self {
        ExecutionStrategy::Sequential
    }
}

/// Carried on `Flow` and consulted by `WorkerState` to pick serialized vs.
/// opt-in parallel per-job firing (spec §9 Open Questions: defaults to
/// serialized per job).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionStrategyHint {
    pub strategy: ExecutionStrategy,
    pub max_workers: Option<usize>,
}

/// Owns the graph; does not execute anything. A flow may contain cycles
/// (loops are first-class) but every connection targets exactly one slot.
#[derive(Debug)]
pub struct Flow {
    pub id: FlowId,
    pub name: Option<String>,
    pub routines: IndexMap<RoutineId, Routine>,
    pub connections: Vec<Connection>,
    pub execution: ExecutionStrategyHint,
}

impl Flow {
    pub fn new(name: Option<String>) -> Self {
        Self {
            id: FlowId::new(),
            name,
            routines: IndexMap::new(),
            connections: Vec::new(),
            execution: ExecutionStrategyHint::default(),
        }
    }

    /// Auto-assigns a random id if `routine.id` collides or the caller
    /// wants a fresh one; enforces unique ids.
    pub fn add_routine(&mut self, routine: Routine) -> Result<RoutineId, CoreError> {
        if self.routines.contains_key(&routine.id) {
            return Err(CoreError::DuplicateRoutineId(routine.id.to_string()));
        }
        let id = routine.id;
        self.routines.insert(id, routine);
        Ok(id)
    }

    pub fn get_routine(&self, id: RoutineId) -> Result<&Routine, CoreError> {
        self.routines.get(&id).ok_or_else(|| CoreError::RoutineNotFound(id.to_string()))
    }

    pub fn get_routine_mut(&mut self, id: RoutineId) -> Result<&mut Routine, CoreError> {
        self.routines.get_mut(&id).ok_or_else(|| CoreError::RoutineNotFound(id.to_string()))
    }

    /// Validates that `source_event` and `target_slot` exist before
    /// appending the connection.
    pub fn connect(
        &mut self,
        source_routine: RoutineId,
        source_event: &str,
        target_routine: RoutineId,
        target_slot: &str,
        mapping: Option<std::collections::HashMap<String, String>>,
    ) -> Result<(), CoreError> {
        self.get_routine(source_routine)?.event(source_event)?;
        self.get_routine(target_routine)?.slot(target_slot)?;
        let mut conn = Connection::new(source_routine, source_event, target_routine, target_slot);
        if let Some(m) = mapping {
            conn = conn.with_mapping(m);
        }
        self.connections.push(conn);
        Ok(())
    }

    pub fn connections_from(&self, source_routine: RoutineId, source_event: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.source_routine == source_routine && c.source_event == source_event)
            .collect()
    }

    pub fn routines(&self) -> impl Iterator<Item = &Routine> {
        self.routines.values()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
