// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-worker scheduling loop (spec §4.8): owns one instantiated flow
//! graph and drives every job attached to it toward quiescence — any
//! number of jobs run concurrently, but a single job's routines fire
//! one at a time on the owning task.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use flowcore::{
    Activation, ActivationPolicy, Breakpoint, BreakpointId, BreakpointKind, Clock, ExecutionRecord, Flow, FlowId,
    JobContext, JobId, JobStatus, RoutineId, WorkerId, WorkerLocalState,
};
use flowwire::WorkerStatus;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::warn;

use crate::error::{EngineError, EngineResult};
use crate::executor::{Executor, FiringOutcome, StrategyDecision};
use crate::scheduler;
use crate::stdout::RoutedStdout;

/// How a job decides it is finished absent an explicit `complete_job`
/// call (spec §4.8 step 6, §9 Open Questions — defaults to first
/// quiescence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    #[default]
    FirstQuiescence,
    Explicit,
}

struct JobSlot {
    ctx: JobContext,
    timers: WorkerLocalState,
    completion: CompletionMode,
}

/// Outcome of one scheduling pass over a job's routines, consulted by
/// the driving task to decide whether to loop immediately, wait for a
/// wake signal, or retire the job.
enum DriveStep {
    FiredMore,
    Quiescent,
    Paused,
    Terminal,
    Gone,
}

/// One instantiated copy of a flow's routine graph plus the jobs
/// currently attached to it. Every field is an `Arc` (or a cheap value
/// type) so a clone is a handle, not a copy of the state — the driving
/// task for each job holds one.
pub struct WorkerState<C: Clock> {
    worker_id: WorkerId,
    flow_id: FlowId,
    flow: Arc<RwLock<Flow>>,
    status: Arc<Mutex<WorkerStatus>>,
    jobs: Arc<Mutex<HashMap<JobId, JobSlot>>>,
    driving: Arc<Mutex<HashSet<JobId>>>,
    breakpoints: Arc<Mutex<HashMap<JobId, Vec<Breakpoint>>>>,
    jobs_processed: Arc<AtomicU64>,
    jobs_failed: Arc<AtomicU64>,
    executor: Arc<Executor<C>>,
    stdout: Arc<RoutedStdout>,
    wake: Arc<Notify>,
}

impl<C: Clock> Clone for WorkerState<C> {
    fn clone(&self) -> Self {
        Self {
            worker_id: self.worker_id.clone(),
            flow_id: self.flow_id,
            flow: self.flow.clone(),
            status: self.status.clone(),
            jobs: self.jobs.clone(),
            driving: self.driving.clone(),
            breakpoints: self.breakpoints.clone(),
            jobs_processed: self.jobs_processed.clone(),
            jobs_failed: self.jobs_failed.clone(),
            executor: self.executor.clone(),
            stdout: self.stdout.clone(),
            wake: self.wake.clone(),
        }
    }
}

/// Does an enabled slot/event/connection breakpoint intercept a firing
/// of `routine_id` this pass? Approximated as blocking the routine's
/// entire firing rather than a true mid-fire suspension, since
/// `Executor::fire` commits atomically (spec §4.10; see DESIGN.md).
fn blocks_routine(kind: &BreakpointKind, routine_id: RoutineId) -> bool {
    match kind {
        BreakpointKind::Routine(_) => false,
        BreakpointKind::Slot { routine_id: r, .. } => *r == routine_id,
        BreakpointKind::Event { routine_id: r, .. } => *r == routine_id,
        BreakpointKind::Connection { from, .. } => *from == routine_id,
    }
}

impl<C: Clock + 'static> WorkerState<C> {
    pub fn new(worker_id: WorkerId, flow: Flow, executor: Executor<C>, stdout: Arc<RoutedStdout>) -> Self {
        Self {
            worker_id,
            flow_id: flow.id,
            flow: Arc::new(RwLock::new(flow)),
            status: Arc::new(Mutex::new(WorkerStatus::Running)),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            driving: Arc::new(Mutex::new(HashSet::new())),
            breakpoints: Arc::new(Mutex::new(HashMap::new())),
            jobs_processed: Arc::new(AtomicU64::new(0)),
            jobs_failed: Arc::new(AtomicU64::new(0)),
            executor: Arc::new(executor),
            stdout,
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.lock().clone()
    }

    pub fn active_job_count(&self) -> usize {
        self.jobs.lock().values().filter(|j| !j.ctx.is_terminal()).count()
    }

    pub fn jobs_processed(&self) -> u64 {
        self.jobs_processed.load(Ordering::Relaxed)
    }

    pub fn jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Relaxed)
    }

    /// Reject pausing a worker that is not currently running (spec §8
    /// edge cases: "explicit rejection, not silent no-op").
    pub fn pause(&self) -> EngineResult<()> {
        let mut status = self.status.lock();
        if *status != WorkerStatus::Running {
            return Err(EngineError::WorkerNotRunning(self.worker_id.clone()));
        }
        *status = WorkerStatus::Paused;
        Ok(())
    }

    pub fn resume(&self) -> EngineResult<()> {
        {
            let mut status = self.status.lock();
            if *status != WorkerStatus::Paused {
                return Err(EngineError::WorkerNotRunning(self.worker_id.clone()));
            }
            *status = WorkerStatus::Running;
        }
        self.wake.notify_waiters();
        Ok(())
    }

    pub fn stop(&self) {
        *self.status.lock() = WorkerStatus::Stopped;
        self.wake.notify_waiters();
    }

    /// Inject the entry item into `entry_slot` on `entry_routine`,
    /// create a new job, and start driving it.
    pub fn submit_job(
        &self,
        entry_routine: RoutineId,
        entry_slot: &str,
        initial_item: Value,
        created_at_ms: u64,
        history_cap: usize,
        completion: CompletionMode,
    ) -> EngineResult<JobId> {
        let job_id = JobId::new();
        {
            let flow = self.flow.read();
            let routine = flow.get_routine(entry_routine)?;
            routine.slot(entry_slot)?.receive(job_id, initial_item)?;
        }
        let mut ctx = JobContext::new(job_id, self.worker_id.clone(), self.flow_id, created_at_ms, history_cap);
        ctx.transition(JobStatus::Running)?;
        self.jobs
            .lock()
            .insert(job_id, JobSlot { ctx, timers: WorkerLocalState::default(), completion });
        self.schedule(job_id);
        Ok(job_id)
    }

    /// Transition a job finished under [`CompletionMode::Explicit`] to
    /// `completed`.
    pub fn complete_job(&self, job_id: JobId) -> EngineResult<()> {
        let mut jobs = self.jobs.lock();
        let slot = jobs.get_mut(&job_id).ok_or(EngineError::JobNotFound(job_id))?;
        slot.ctx.transition(JobStatus::Completed)?;
        self.jobs_processed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn pause_job(&self, job_id: JobId) -> EngineResult<()> {
        let mut jobs = self.jobs.lock();
        let slot = jobs.get_mut(&job_id).ok_or(EngineError::JobNotFound(job_id))?;
        slot.ctx.transition(JobStatus::Paused)?;
        Ok(())
    }

    pub fn resume_job(&self, job_id: JobId) -> EngineResult<()> {
        {
            let mut jobs = self.jobs.lock();
            let slot = jobs.get_mut(&job_id).ok_or(EngineError::JobNotFound(job_id))?;
            slot.ctx.transition(JobStatus::Running)?;
        }
        self.wake.notify_waiters();
        Ok(())
    }

    pub fn cancel_job(&self, job_id: JobId) -> EngineResult<()> {
        {
            let mut jobs = self.jobs.lock();
            let slot = jobs.get_mut(&job_id).ok_or(EngineError::JobNotFound(job_id))?;
            slot.ctx.transition(JobStatus::Cancelled)?;
        }
        self.wake.notify_waiters();
        Ok(())
    }

    pub fn job_status(&self, job_id: JobId) -> EngineResult<JobStatus> {
        let jobs = self.jobs.lock();
        Ok(jobs.get(&job_id).ok_or(EngineError::JobNotFound(job_id))?.ctx.status)
    }

    pub fn job_history_len(&self, job_id: JobId) -> EngineResult<usize> {
        let jobs = self.jobs.lock();
        Ok(jobs.get(&job_id).ok_or(EngineError::JobNotFound(job_id))?.ctx.history().len())
    }

    /// `getJobHistory` (spec §6): a snapshot clone of every record pushed
    /// so far, oldest first.
    pub fn job_history(&self, job_id: JobId) -> EngineResult<Vec<ExecutionRecord>> {
        let jobs = self.jobs.lock();
        Ok(jobs
            .get(&job_id)
            .ok_or(EngineError::JobNotFound(job_id))?
            .ctx
            .history()
            .iter()
            .cloned()
            .collect())
    }

    /// Wire-layer snapshot of every job currently attached to this
    /// worker, consulted by `Runtime::list_jobs`.
    pub fn job_snapshots(&self) -> Vec<flowwire::JobInfo> {
        self.jobs
            .lock()
            .values()
            .map(|slot| flowwire::JobInfo {
                job_id: slot.ctx.job_id,
                worker_id: slot.ctx.worker_id.clone(),
                flow_id: slot.ctx.flow_id,
                status: slot.ctx.status,
                error: slot.ctx.error.clone(),
                created_at: slot.ctx.created_at,
                started_at: slot.ctx.started_at,
                completed_at: slot.ctx.completed_at,
            })
            .collect()
    }

    pub fn breakpoint_snapshots(&self, job_id: JobId) -> EngineResult<Vec<flowwire::BreakpointInfo>> {
        if !self.jobs.lock().contains_key(&job_id) {
            return Err(EngineError::JobNotFound(job_id));
        }
        let guard = self.breakpoints.lock();
        Ok(guard
            .get(&job_id)
            .map(|list| {
                list.iter()
                    .map(|bp| flowwire::BreakpointInfo {
                        breakpoint_id: bp.id.to_string(),
                        job_id,
                        enabled: bp.enabled,
                        hit_count: bp.hit_count,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Install a breakpoint. Routine-kind breakpoints additionally
    /// override the target routine's activation policy (spec §4.10).
    pub fn install_breakpoint(
        &self,
        job_id: JobId,
        kind: BreakpointKind,
        condition: Option<String>,
    ) -> EngineResult<BreakpointId> {
        if !self.jobs.lock().contains_key(&job_id) {
            return Err(EngineError::JobNotFound(job_id));
        }
        let mut bp = Breakpoint::new(job_id, kind.clone());
        if let Some(condition) = condition {
            bp = bp.with_condition(condition);
        }
        let id = bp.id;
        if let BreakpointKind::Routine(routine_id) = kind {
            self.flow.write().get_routine_mut(routine_id)?.install_breakpoint();
        }
        self.breakpoints.lock().entry(job_id).or_default().push(bp);
        self.wake.notify_waiters();
        Ok(id)
    }

    /// Remove a breakpoint, atomically restoring the original policy
    /// for routine-kind breakpoints.
    pub fn remove_breakpoint(&self, job_id: JobId, breakpoint_id: BreakpointId) -> EngineResult<()> {
        let mut guard = self.breakpoints.lock();
        let list = guard.get_mut(&job_id).ok_or(EngineError::JobNotFound(job_id))?;
        let pos = list
            .iter()
            .position(|b| b.id == breakpoint_id)
            .ok_or_else(|| EngineError::Internal(format!("breakpoint {breakpoint_id} not found")))?;
        let bp = list.remove(pos);
        drop(guard);
        if let BreakpointKind::Routine(routine_id) = bp.kind {
            self.flow.write().get_routine_mut(routine_id)?.remove_breakpoint();
        }
        self.wake.notify_waiters();
        Ok(())
    }

    /// `setBreakpointEnabled` is idempotent for equal `enabled` (spec
    /// §8).
    pub fn set_breakpoint_enabled(&self, job_id: JobId, breakpoint_id: BreakpointId, enabled: bool) -> EngineResult<()> {
        let mut guard = self.breakpoints.lock();
        let list = guard.get_mut(&job_id).ok_or(EngineError::JobNotFound(job_id))?;
        let bp = list
            .iter_mut()
            .find(|b| b.id == breakpoint_id)
            .ok_or_else(|| EngineError::Internal(format!("breakpoint {breakpoint_id} not found")))?;
        bp.set_enabled(enabled);
        drop(guard);
        self.wake.notify_waiters();
        Ok(())
    }

    /// Spawn the driving task for `job_id` if one is not already
    /// running; otherwise just wake it.
    fn schedule(&self, job_id: JobId) {
        let mut driving = self.driving.lock();
        if driving.contains(&job_id) {
            drop(driving);
            self.wake.notify_waiters();
            return;
        }
        driving.insert(job_id);
        drop(driving);
        let handle = self.clone();
        tokio::spawn(async move { handle.drive(job_id).await });
    }

    async fn drive(&self, job_id: JobId) {
        loop {
            match self.drive_once(job_id) {
                DriveStep::FiredMore => continue,
                DriveStep::Quiescent | DriveStep::Paused => self.wake.notified().await,
                DriveStep::Terminal | DriveStep::Gone => break,
            }
        }
        self.driving.lock().remove(&job_id);
    }

    /// One scheduling pass: at most one routine fires (spec §4.8 steps
    /// 1-3). Synchronous — the worker's pool thread does the actual
    /// firing work, `.await` only happens between passes in [`drive`].
    fn drive_once(&self, job_id: JobId) -> DriveStep {
        match *self.status.lock() {
            WorkerStatus::Stopped => return DriveStep::Terminal,
            WorkerStatus::Paused => return DriveStep::Paused,
            WorkerStatus::Running => {}
        }

        let flow = self.flow.read();
        let mut jobs = self.jobs.lock();
        let Some(job_slot) = jobs.get_mut(&job_id) else {
            return DriveStep::Gone;
        };

        if job_slot.ctx.is_terminal() {
            return DriveStep::Terminal;
        }
        if job_slot.ctx.status == JobStatus::Paused {
            return DriveStep::Paused;
        }

        let mut breakpoints = self.breakpoints.lock();
        let job_breakpoints = breakpoints.entry(job_id).or_default();
        let mut fired_any = false;

        let routine_ids: Vec<RoutineId> = flow.routines().map(|r| r.id).collect();
        for routine_id in routine_ids {
            let Ok(routine) = flow.get_routine(routine_id) else {
                continue;
            };
            let pending = routine.slots.values().any(|s| !s.peek_new(job_id).is_empty());

            if pending {
                if let Some(bp) = job_breakpoints
                    .iter_mut()
                    .find(|bp| bp.enabled && blocks_routine(&bp.kind, routine.id))
                {
                    bp.record_hit();
                    let now = self.executor.clock.epoch_ms();
                    job_slot.ctx.push_history(ExecutionRecord::BreakpointHit {
                        routine_id: Some(routine.id),
                        timestamp: now,
                        payload: Value::Null,
                    });
                    let _ = job_slot.ctx.transition(JobStatus::Paused);
                    return DriveStep::Paused;
                }
            }

            let activation: Activation = scheduler::evaluate(routine, job_id, &job_slot.timers);
            if !activation.should_fire {
                if pending && activation.reason == "breakpointed" {
                    if let Some(bp) = job_breakpoints.iter_mut().find(|bp| {
                        bp.enabled && matches!(&bp.kind, BreakpointKind::Routine(r) if *r == routine.id)
                    }) {
                        bp.record_hit();
                        let now = self.executor.clock.epoch_ms();
                        job_slot.ctx.push_history(ExecutionRecord::BreakpointHit {
                            routine_id: Some(routine.id),
                            timestamp: now,
                            payload: Value::Null,
                        });
                        let _ = job_slot.ctx.transition(JobStatus::Paused);
                        return DriveStep::Paused;
                    }
                }
                continue;
            }

            let timer_key = routine.policy.timer_key().map(str::to_string);
            if let Some(key) = &timer_key {
                job_slot.timers.first_item_at.entry(key.clone()).or_insert_with(Instant::now);
            }

            let retry_data = activation.data.clone();
            let worker_id = self.worker_id.clone();
            let routine_id = routine.id;
            let ctx_ptr = &mut job_slot.ctx;
            let outcome = self.stdout.scoped(job_id, || self.executor.fire(&flow, ctx_ptr, worker_id, routine_id, activation));

            if let Some(key) = &timer_key {
                job_slot.timers.last_fired_at.insert(key.clone(), Instant::now());
                job_slot.timers.first_item_at.remove(key);
            }

            match outcome {
                Ok(FiringOutcome::Ok) => {
                    fired_any = true;
                }
                Ok(FiringOutcome::Failed(message)) => {
                    let decision = self.executor.apply_error_strategy(&mut job_slot.ctx, routine_id, &routine.error_strategy, &message);
                    match decision {
                        StrategyDecision::Fail => {
                            job_slot.ctx.error = Some(message.clone());
                            let _ = job_slot.ctx.transition(JobStatus::Failed);
                            self.jobs_failed.fetch_add(1, Ordering::Relaxed);
                            return DriveStep::Terminal;
                        }
                        StrategyDecision::Continue => {
                            fired_any = true;
                        }
                        StrategyDecision::Retry(backoff) => {
                            drop(breakpoints);
                            drop(jobs);
                            drop(flow);
                            self.schedule_retry(job_id, routine_id, retry_data, backoff);
                            return DriveStep::Quiescent;
                        }
                    }
                }
                Err(err) => {
                    warn!(%job_id, %routine_id, error = %err, "firing raised an engine error");
                    job_slot.ctx.error = Some(err.to_string());
                    let _ = job_slot.ctx.transition(JobStatus::Failed);
                    self.jobs_failed.fetch_add(1, Ordering::Relaxed);
                    return DriveStep::Terminal;
                }
            }
        }
        drop(breakpoints);

        if job_slot.ctx.is_terminal() {
            return DriveStep::Terminal;
        }
        if fired_any {
            return DriveStep::FiredMore;
        }
        if job_slot.completion == CompletionMode::FirstQuiescence {
            let _ = job_slot.ctx.transition(JobStatus::Completed);
            self.jobs_processed.fetch_add(1, Ordering::Relaxed);
            return DriveStep::Terminal;
        }
        DriveStep::Quiescent
    }

    /// Re-inject `data` into the slots it was consumed from after
    /// `backoff`, approximating `ErrorStrategy::Retry`'s "same data
    /// slice" by treating the retried items as freshly arrived rather
    /// than literally replaying in place (see DESIGN.md).
    fn schedule_retry(&self, job_id: JobId, routine_id: RoutineId, data: HashMap<String, Vec<Value>>, backoff: Duration) {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            {
                let flow = handle.flow.read();
                if let Ok(routine) = flow.get_routine(routine_id) {
                    for (slot_name, items) in &data {
                        if let Some(slot) = routine.slots.get(slot_name) {
                            for item in items.iter().cloned() {
                                if let Err(err) = slot.receive(job_id, item) {
                                    warn!(%job_id, %routine_id, error = %err, "retry re-injection dropped an item");
                                }
                            }
                        }
                    }
                }
            }
            handle.schedule(job_id);
        });
    }
}

#[cfg(test)]
#[path = "worker_runtime_tests.rs"]
mod tests;
