// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One execution of a flow by a worker (spec §4.7).

use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::Value;

use crate::breakpoint::BreakpointId;
use crate::define_id;
use crate::error::CoreError;
use crate::flow::FlowId;
use crate::routine::RoutineId;
use crate::worker::WorkerId;

define_id! {
    /// Identifies one execution instance of a flow.
    pub struct JobId("job-");
}

/// Status DAG from spec §3: `pending -> running -> (paused <-> running)* ->
/// {completed | failed | cancelled}`. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    fn allows(&self, to: JobStatus) -> bool {
        use JobStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, to),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Pending, Failed)
                | (Running, Paused)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
                | (Paused, Running)
                | (Paused, Completed)
                | (Paused, Failed)
                | (Paused, Cancelled)
        )
    }

    /// Validate and apply a transition, matching the teacher's
    /// `StepStatus`/`CrewStatus` absorbing-terminal-state guard,
    /// generalized to the full DAG above.
    pub fn transition(self, to: JobStatus) -> Result<JobStatus, CoreError> {
        if self.allows(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidTransition { from: self.to_string(), to: to.to_string() })
        }
    }
}

/// Discriminated kind of one entry in a job's execution history.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionRecord {
    RoutineStart { routine_id: RoutineId, timestamp: u64 },
    RoutineEnd { routine_id: RoutineId, timestamp: u64, payload: Value },
    SlotReceive { routine_id: RoutineId, slot: String, timestamp: u64, payload: Value },
    EventEmit { routine_id: RoutineId, event: String, timestamp: u64, payload: Value },
    BreakpointHit { routine_id: Option<RoutineId>, timestamp: u64, payload: Value },
    Error { routine_id: Option<RoutineId>, timestamp: u64, message: String },
}

impl ExecutionRecord {
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::RoutineStart { timestamp, .. }
            | Self::RoutineEnd { timestamp, .. }
            | Self::SlotReceive { timestamp, .. }
            | Self::EventEmit { timestamp, .. }
            | Self::BreakpointHit { timestamp, .. }
            | Self::Error { timestamp, .. } => *timestamp,
        }
    }
}

/// Everything per-job that is mutable during execution. Only the
/// scheduler thread for this job mutates `routine_states` and
/// `execution_history` (spec §4.7 "Mutation rules").
pub struct JobContext {
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub flow_id: FlowId,
    pub status: JobStatus,
    pub error: Option<String>,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub metadata: HashMap<String, Value>,
    pub routine_states: HashMap<RoutineId, HashMap<String, Value>>,
    execution_history: VecDeque<ExecutionRecord>,
    history_cap: usize,
    pub shared_data: HashMap<String, Value>,
    pub active_breakpoints: HashSet<BreakpointId>,
    pub retry_attempts: HashMap<RoutineId, u32>,
}

impl JobContext {
    pub fn new(job_id: JobId, worker_id: WorkerId, flow_id: FlowId, created_at_ms: u64, history_cap: usize) -> Self {
        Self {
            job_id,
            worker_id,
            flow_id,
            status: JobStatus::Pending,
            error: None,
            created_at: created_at_ms,
            started_at: None,
            completed_at: None,
            metadata: HashMap::new(),
            routine_states: HashMap::new(),
            execution_history: VecDeque::new(),
            history_cap,
            shared_data: HashMap::new(),
            active_breakpoints: HashSet::new(),
            retry_attempts: HashMap::new(),
        }
    }

    pub fn transition(&mut self, to: JobStatus) -> Result<(), CoreError> {
        self.status = self.status.transition(to)?;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append a record, dropping the oldest entry once `history_cap` is
    /// exceeded.
    pub fn push_history(&mut self, record: ExecutionRecord) {
        if self.execution_history.len() >= self.history_cap {
            self.execution_history.pop_front();
        }
        self.execution_history.push_back(record);
    }

    pub fn history(&self) -> &VecDeque<ExecutionRecord> {
        &self.execution_history
    }

    pub fn job_data(&mut self, routine_id: RoutineId) -> &mut HashMap<String, Value> {
        self.routine_states.entry(routine_id).or_default()
    }

    pub fn increment_retry(&mut self, routine_id: RoutineId) -> u32 {
        let counter = self.retry_attempts.entry(routine_id).or_insert(0);
        *counter += 1;
        *counter
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobContext {
    pub fn builder() -> JobContextBuilder {
        JobContextBuilder::default()
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct JobContextBuilder {
    job_id: JobId,
    worker_id: WorkerId,
    flow_id: FlowId,
    status: JobStatus,
    created_at: u64,
    history_cap: usize,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for JobContextBuilder {
    fn default() -> Self {
        Self {
            job_id: JobId::new(),
            worker_id: WorkerId::generate(),
            flow_id: FlowId::new(),
            status: JobStatus::Pending,
            created_at: 0,
            history_cap: 1_000,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobContextBuilder {
    crate::setters! {
        set { job_id: JobId, worker_id: WorkerId, flow_id: FlowId, status: JobStatus, created_at: u64, history_cap: usize }
    }

    pub fn build(self) -> JobContext {
        let mut ctx = JobContext::new(self.job_id, self.worker_id, self.flow_id, self.created_at, self.history_cap);
        ctx.status = self.status;
        ctx
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
