// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opens a logic-execution frame for an approved firing, invokes the
//! routine's logic, and applies its `ErrorStrategy` (spec §4.8 step 3,
//! §7), the way the teacher's `Executor::execute` logs a structured
//! before/after span around each effect.

use std::collections::HashMap;

use flowcore::{
    Activation, Clock, CoreError, ErrorStrategy, EventSpec, ExecutionRecord, Flow, JobContext, JobId, LogicFrame,
    Routine, RoutineId, SchemaMode, WorkerId,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::EngineResult;
use crate::scheduler;

/// Collapse a slot-keyed activation data slice into logic kwargs: a
/// single consumed item passes through as itself; a batch passes through
/// as a JSON array, matching how `batch_size`/`n_of_m` hand a routine
/// several items at once.
fn build_kwargs(data: &HashMap<String, Vec<Value>>) -> HashMap<String, Value> {
    data.iter()
        .map(|(slot, items)| {
            let value = match items.len() {
                1 => items[0].clone(),
                _ => Value::Array(items.clone()),
            };
            (slot.clone(), value)
        })
        .collect()
}

/// Outcome of one firing attempt. On `Failed`, the caller consults
/// `Executor::apply_error_strategy` against the routine's `ErrorStrategy`
/// to decide whether to fail the job, keep scheduling, or retry.
pub enum FiringOutcome {
    Ok,
    Failed(String),
}

/// Fire `routine_id` for `job_id` once its policy has approved
/// `activation`. `emit` resolves the routine's outgoing connections and
/// delivers to target slots, recording `slot_receive`/`event_emit`
/// history as it goes.
///
/// Synchronous by design: the caller (the per-worker scheduling loop in
/// `worker_runtime`) wraps the call in `RoutedStdout::scoped` so writes
/// made by `routine.logic` during the call attribute to `job_id`.
pub struct Executor<C: Clock> {
    pub clock: C,
    pub schema_mode: SchemaMode,
}

impl<C: Clock> Executor<C> {
    pub fn new(clock: C, schema_mode: SchemaMode) -> Self {
        Self { clock, schema_mode }
    }

    /// Runs one firing of `routine_id` against `flow`/`job`, honoring the
    /// routine's `ErrorStrategy` on failure. Returns the outcome without
    /// mutating `job.status` itself; the caller applies status
    /// transitions.
    pub fn fire(
        &self,
        flow: &Flow,
        job: &mut JobContext,
        worker_id: WorkerId,
        routine_id: RoutineId,
        activation: Activation,
    ) -> EngineResult<FiringOutcome> {
        let routine = flow.get_routine(routine_id)?;
        scheduler::commit_firing(routine, job.job_id, &activation);

        let started = self.clock.epoch_ms();
        job.push_history(ExecutionRecord::RoutineStart { routine_id, timestamp: started });
        debug!(job_id = %job.job_id, %routine_id, reason = activation.reason, "routine firing started");

        let kwargs = build_kwargs(&activation.data);
        let job_id = job.job_id;
        let result = self.invoke_logic(flow, routine, job, worker_id, job_id, kwargs);

        let ended = self.clock.epoch_ms();
        match result {
            Ok(payload) => {
                job.push_history(ExecutionRecord::RoutineEnd { routine_id, timestamp: ended, payload });
                info!(job_id = %job_id, %routine_id, elapsed_ms = ended.saturating_sub(started), "routine firing completed");
                Ok(FiringOutcome::Ok)
            }
            Err(err) => self.handle_error(job, routine_id, ended, err),
        }
    }

    fn invoke_logic(
        &self,
        flow: &Flow,
        routine: &Routine,
        job: &mut JobContext,
        worker_id: WorkerId,
        job_id: JobId,
        kwargs: HashMap<String, Value>,
    ) -> Result<Value, CoreError> {
        let config = routine.config.clone();
        let mut job_data = job.routine_states.entry(routine.id).or_default().clone();
        let schema_mode = self.schema_mode;
        let mut first_emit_err: Option<CoreError> = None;
        let mut emit_history: Vec<(String, Value)> = Vec::new();

        let mut emit_fn = |event_name: &str, emitted: HashMap<String, Value>| -> Result<(), CoreError> {
            let event: &EventSpec = routine.event(event_name)?;
            let validated = event.validate(emitted, schema_mode)?;
            let connections = flow.connections_from(routine.id, event_name);
            let payload = Value::Object(validated.clone().into_iter().collect());
            emit_history.push((event_name.to_string(), payload));
            let result = event.emit(&connections, validated, job_id, |conn| {
                flow.get_routine(conn.target_routine).ok().and_then(|r| r.slots.get(&conn.target_slot))
            });
            if let Err(e) = &result {
                if first_emit_err.is_none() {
                    first_emit_err = Some(clone_core_error(e));
                }
            }
            result
        };

        let mut frame = LogicFrame::new(job_id, routine.id, worker_id, &config, &mut job_data, &mut emit_fn);
        let logic_result = (routine.logic)(&mut frame, kwargs);
        job.routine_states.insert(routine.id, job_data);

        let now = self.clock.epoch_ms();
        for (event_name, payload) in emit_history {
            job.push_history(ExecutionRecord::EventEmit { routine_id: routine.id, event: event_name, timestamp: now, payload });
        }

        logic_result?;
        if let Some(err) = first_emit_err {
            return Err(err);
        }
        Ok(Value::Null)
    }

    fn handle_error(
        &self,
        job: &mut JobContext,
        routine_id: RoutineId,
        timestamp: u64,
        err: CoreError,
    ) -> EngineResult<FiringOutcome> {
        let message = err.to_string();
        job.push_history(ExecutionRecord::Error { routine_id: Some(routine_id), timestamp, message: message.clone() });
        warn!(%routine_id, error = %message, "routine logic error");
        Ok(FiringOutcome::Failed(message))
    }

    /// Apply `strategy` to a firing's error, returning whether the job
    /// should transition to `failed`, keep scheduling, or retry.
    pub fn apply_error_strategy(
        &self,
        job: &mut JobContext,
        routine_id: RoutineId,
        strategy: &ErrorStrategy,
        message: &str,
    ) -> StrategyDecision {
        match strategy {
            ErrorStrategy::Stop => {
                error!(%routine_id, error = %message, "routine error strategy=stop, failing job");
                StrategyDecision::Fail
            }
            ErrorStrategy::Continue => StrategyDecision::Continue,
            ErrorStrategy::Retry { max_attempts, backoff, fallback } => {
                let attempt = job.increment_retry(routine_id);
                if attempt < *max_attempts {
                    StrategyDecision::Retry(*backoff)
                } else {
                    self.apply_error_strategy(job, routine_id, fallback, message)
                }
            }
        }
    }
}

pub enum StrategyDecision {
    Fail,
    Continue,
    Retry(std::time::Duration),
}

fn clone_core_error(err: &CoreError) -> CoreError {
    match err {
        CoreError::SlotBackpressureExceeded { routine_id, slot, max_queue } => {
            CoreError::SlotBackpressureExceeded { routine_id: routine_id.clone(), slot: slot.clone(), max_queue: *max_queue }
        }
        CoreError::SchemaError { routine_id, event, detail } => {
            CoreError::SchemaError { routine_id: routine_id.clone(), event: event.clone(), detail: detail.clone() }
        }
        CoreError::RoutineNotFound(s) => CoreError::RoutineNotFound(s.clone()),
        CoreError::SlotNotFound { routine_id, slot } => CoreError::SlotNotFound { routine_id: routine_id.clone(), slot: slot.clone() },
        CoreError::EventNotFound { routine_id, event } => CoreError::EventNotFound { routine_id: routine_id.clone(), event: event.clone() },
        CoreError::DuplicateRoutineId(s) => CoreError::DuplicateRoutineId(s.clone()),
        CoreError::InvalidTransition { from, to } => CoreError::InvalidTransition { from: from.clone(), to: to.clone() },
        CoreError::RoutineLogicError(s) => CoreError::RoutineLogicError(s.clone()),
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
