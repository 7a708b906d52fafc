// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stateful compute unit: slots, events, config, activation policy, logic
//! (spec §4.4).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::Value;

use crate::define_id;
use crate::error::CoreError;
use crate::event_spec::EventSpec;
use crate::job::JobId;
use crate::policy::ActivationPolicy;
use crate::slot::Slot;
use crate::worker::WorkerId;

define_id! {
    /// Identifies a routine within a flow.
    pub struct RoutineId("rtn-");
}

/// Per-routine error strategy, consulted by the executor per spec §7.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ErrorStrategy {
    /// First error transitions the job to `failed`.
    Stop,
    /// Record the error, skip the emission, continue scheduling.
    Continue,
    /// Re-invoke logic with the same data slice after `backoff`; falls
    /// through to `fallback` on exhaustion.
    Retry {
        max_attempts: u32,
        backoff: Duration,
        fallback: Box<ErrorStrategy>,
    },
}

impl Default for ErrorStrategy {
    fn default() -> Self {
        ErrorStrategy::Stop
    }
}

/// Capability surface given to `RoutineLogic`: current job/routine/worker
/// identity, config access, per-routine job-scoped state, and emission.
/// Passed as an explicit parameter rather than a hidden global, per spec
/// §9 "Context propagation to logic" — the only scope-local exception is
/// routed stdout.
pub struct LogicFrame<'a> {
    job_id: JobId,
    routine_id: RoutineId,
    worker_id: WorkerId,
    config: &'a HashMap<String, Value>,
    job_data: &'a mut HashMap<String, Value>,
    emit_fn: &'a mut dyn FnMut(&str, HashMap<String, Value>) -> Result<(), CoreError>,
}

impl<'a> LogicFrame<'a> {
    pub fn new(
        job_id: JobId,
        routine_id: RoutineId,
        worker_id: WorkerId,
        config: &'a HashMap<String, Value>,
        job_data: &'a mut HashMap<String, Value>,
        emit_fn: &'a mut dyn FnMut(&str, HashMap<String, Value>) -> Result<(), CoreError>,
    ) -> Self {
        Self { job_id, routine_id, worker_id, config, job_data, emit_fn }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn routine_id(&self) -> RoutineId {
        self.routine_id
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id.clone()
    }

    pub fn get_config(&self, key: &str, default: Value) -> Value {
        self.config.get(key).cloned().unwrap_or(default)
    }

    pub fn get_job_data(&self, key: &str) -> Option<&Value> {
        self.job_data.get(key)
    }

    pub fn set_job_data(&mut self, key: impl Into<String>, value: Value) {
        self.job_data.insert(key.into(), value);
    }

    /// Emit from within logic execution. Must not be called outside a
    /// logic-execution frame, which this type's lifetime enforces.
    pub fn emit(&mut self, event_name: &str, kwargs: HashMap<String, Value>) -> Result<(), CoreError> {
        (self.emit_fn)(event_name, kwargs)
    }
}

/// Boxed logic function: scripted routines supply this at runtime,
/// built-in routines supply a fixed function pointer — both stored the
/// same way.
pub type RoutineLogic = Arc<dyn Fn(&mut LogicFrame<'_>, HashMap<String, Value>) -> Result<(), CoreError> + Send + Sync>;

/// A computational unit with named input slots, named output events, a
/// configuration map, an activation policy, and a logic function.
pub struct Routine {
    pub id: RoutineId,
    pub class_name: String,
    pub slots: IndexMap<String, Slot>,
    pub events: IndexMap<String, EventSpec>,
    pub config: HashMap<String, Value>,
    pub policy: Box<dyn ActivationPolicy>,
    pub logic: RoutineLogic,
    pub error_strategy: ErrorStrategy,
    original_policy: Option<Box<dyn ActivationPolicy>>,
}

impl fmt::Debug for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routine")
            .field("id", &self.id)
            .field("class_name", &self.class_name)
            .field("slots", &self.slots.keys().collect::<Vec<_>>())
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Routine {
    pub fn new(
        id: RoutineId,
        class_name: impl Into<String>,
        policy: Box<dyn ActivationPolicy>,
        logic: RoutineLogic,
    ) -> Self {
        Self {
            id,
            class_name: class_name.into(),
            slots: IndexMap::new(),
            events: IndexMap::new(),
            config: HashMap::new(),
            policy,
            logic,
            error_strategy: ErrorStrategy::default(),
            original_policy: None,
        }
    }

    pub fn add_slot(&mut self, name: impl Into<String>, max_queue: Option<usize>) -> &mut Self {
        let name = name.into();
        self.slots.insert(name.clone(), Slot::new(name, max_queue));
        self
    }

    pub fn add_event(&mut self, name: impl Into<String>, params: Vec<String>) -> &mut Self {
        let name = name.into();
        self.events.insert(name.clone(), EventSpec::new(name, params));
        self
    }

    pub fn set_config(&mut self, kwargs: HashMap<String, Value>) -> &mut Self {
        self.config.extend(kwargs);
        self
    }

    pub fn get_config(&self, key: &str, default: Value) -> Value {
        self.config.get(key).cloned().unwrap_or(default)
    }

    pub fn set_error_strategy(&mut self, strategy: ErrorStrategy) -> &mut Self {
        self.error_strategy = strategy;
        self
    }

    /// Override the policy with [`crate::policy::Breakpointed`], stashing
    /// the original for restoration. No-op if already overridden.
    pub fn install_breakpoint(&mut self) {
        if self.original_policy.is_some() {
            return;
        }
        let current = std::mem::replace(&mut self.policy, Box::new(crate::policy::Breakpointed));
        self.original_policy = Some(current);
    }

    /// Atomically restore the policy stashed by `install_breakpoint`.
    pub fn remove_breakpoint(&mut self) {
        if let Some(original) = self.original_policy.take() {
            self.policy = original;
        }
    }

    pub fn is_breakpointed(&self) -> bool {
        self.original_policy.is_some()
    }

    pub fn slot(&self, name: &str) -> Result<&Slot, CoreError> {
        self.slots
            .get(name)
            .ok_or_else(|| CoreError::SlotNotFound { routine_id: self.id.to_string(), slot: name.to_string() })
    }

    pub fn event(&self, name: &str) -> Result<&EventSpec, CoreError> {
        self.events
            .get(name)
            .ok_or_else(|| CoreError::EventNotFound { routine_id: self.id.to_string(), event: name.to_string() })
    }
}

#[cfg(test)]
#[path = "routine_tests.rs"]
mod tests;
