// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide coordinator: flow registry, worker registry, job
//! submission, idempotency (spec §4.9), grounded on the teacher's
//! `Runtime<S,A,N,C>` coordinator shape in
//! `examples/alfredjeanlab-oddjobs/crates/engine/src/runtime/monitor.rs`.

use std::collections::HashMap;
use std::sync::Arc;

use flowcore::{BreakpointId, BreakpointKind, Clock, Flow, FlowId, JobId, RoutineId, WorkerId};
use flowwire::{BreakpointInfo, JobFilters, JobInfo, Page, WorkerFilters, WorkerInfo};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::executor::Executor;
use crate::idempotency::IdempotencyStore;
use crate::stdout::{Fallback, RoutedStdout};
use crate::worker_runtime::{CompletionMode, WorkerState};

struct FlowEntry {
    flow: Arc<Flow>,
}

/// Coordinates every registered flow and every live worker. Cheap to
/// clone: every field is an `Arc`, so handing a `Runtime` to an adapter
/// (HTTP handler, CLI command) is a handle copy, not a deep clone.
pub struct Runtime<C: Clock> {
    clock: C,
    flows_by_id: Arc<RwLock<HashMap<FlowId, FlowEntry>>>,
    flows_by_name: Arc<RwLock<HashMap<String, FlowId>>>,
    workers: Arc<RwLock<HashMap<WorkerId, WorkerState<C>>>>,
    idempotency: Arc<IdempotencyStore<C>>,
    stdout: Arc<RoutedStdout>,
    history_cap: usize,
    shutting_down: Arc<std::sync::atomic::AtomicBool>,
}

impl<C: Clock> Clone for Runtime<C> {
    fn clone(&self) -> Self {
        Self {
            clock: self.clock.clone(),
            flows_by_id: self.flows_by_id.clone(),
            flows_by_name: self.flows_by_name.clone(),
            workers: self.workers.clone(),
            idempotency: self.idempotency.clone(),
            stdout: self.stdout.clone(),
            history_cap: self.history_cap,
            shutting_down: self.shutting_down.clone(),
        }
    }
}

impl<C: Clock + 'static> Runtime<C> {
    pub fn new(clock: C, config: &flowcore::RuntimeConfig) -> Self {
        Self {
            clock: clock.clone(),
            flows_by_id: Arc::new(RwLock::new(HashMap::new())),
            flows_by_name: Arc::new(RwLock::new(HashMap::new())),
            workers: Arc::new(RwLock::new(HashMap::new())),
            idempotency: Arc::new(IdempotencyStore::new(clock, config.idempotency_ttl)),
            stdout: RoutedStdout::new(config.default_stdout_buffer_cap, Fallback::Discard),
            history_cap: config.default_history_cap,
            shutting_down: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    pub fn register_flow(&self, flow: Flow) -> FlowId {
        let id = flow.id;
        if let Some(name) = &flow.name {
            self.flows_by_name.write().insert(name.clone(), id);
        }
        self.flows_by_id.write().insert(id, FlowEntry { flow: Arc::new(flow) });
        info!(flow_id = %id, "flow registered");
        id
    }

    /// Resolve a flow by id, falling back to a name lookup (spec §4.9
    /// `lookup_flow(id_or_name)`).
    pub fn lookup_flow(&self, id_or_name: &str) -> EngineResult<Arc<Flow>> {
        let by_id_key = FlowId::from_string(id_or_name);
        if let Some(entry) = self.flows_by_id.read().get(&by_id_key) {
            return Ok(entry.flow.clone());
        }
        let by_name = self.flows_by_name.read();
        let id = *by_name.get(id_or_name).ok_or(EngineError::FlowNotFound(by_id_key))?;
        drop(by_name);
        self.flows_by_id
            .read()
            .get(&id)
            .map(|e| e.flow.clone())
            .ok_or(EngineError::FlowNotFound(id))
    }

    fn resolve_flow(&self, flow_name: &str) -> EngineResult<Arc<Flow>> {
        self.lookup_flow(flow_name)
    }

    fn reject_if_shutting_down(&self) -> EngineResult<()> {
        if self.shutting_down.load(std::sync::atomic::Ordering::Acquire) {
            return Err(EngineError::RuntimeShutdown);
        }
        Ok(())
    }

    /// Instantiate a fresh worker for `flow_name`, schema-cloning its
    /// routine graph so each worker owns an independent copy of slot
    /// queues and breakpoint state.
    pub fn exec(&self, flow_name: &str, worker_id: Option<WorkerId>) -> EngineResult<WorkerId> {
        self.reject_if_shutting_down()?;
        let flow_arc = self.resolve_flow(flow_name)?;
        let worker_id = worker_id.unwrap_or_else(WorkerId::generate);
        if self.workers.read().contains_key(&worker_id) {
            return Err(EngineError::WorkerAlreadyExists(worker_id));
        }
        let flow = clone_flow_graph(&flow_arc)?;
        let executor = Executor::new(self.clock.clone(), flowcore::SchemaMode::Lenient);
        let worker = WorkerState::new(worker_id.clone(), flow, executor, self.stdout.clone());
        self.workers.write().insert(worker_id.clone(), worker);
        info!(%worker_id, flow = flow_name, "worker started");
        Ok(worker_id)
    }

    /// Attach a job to `worker_id` if given, otherwise spin up an
    /// implicit worker for `flow_name` first (spec §4.9 `post`).
    /// Idempotent: a repeated call with the same `idempotency_key`
    /// returns the previously recorded response without re-enqueuing.
    #[allow(clippy::too_many_arguments)]
    pub fn post(
        &self,
        flow_name: &str,
        entry_routine: RoutineId,
        entry_slot: &str,
        data: Value,
        worker_id: Option<WorkerId>,
        idempotency_key: Option<String>,
    ) -> EngineResult<JobInfo> {
        self.reject_if_shutting_down()?;
        if let Some(key) = &idempotency_key {
            if let Some(cached) = self.idempotency.lookup(key) {
                return Ok(cached);
            }
        }

        let worker_id = match worker_id {
            Some(id) => id,
            None => self.exec(flow_name, None)?,
        };
        let workers = self.workers.read();
        let worker = workers.get(&worker_id).ok_or_else(|| EngineError::WorkerNotFound(worker_id.clone()))?;
        let now = self.clock.epoch_ms();
        let job_id = worker.submit_job(entry_routine, entry_slot, data, now, self.history_cap, CompletionMode::FirstQuiescence)?;
        let status = worker.job_status(job_id)?;
        drop(workers);

        let info = JobInfo {
            job_id,
            worker_id: worker_id.clone(),
            flow_id: self.resolve_flow(flow_name)?.id,
            status,
            error: None,
            created_at: now,
            started_at: Some(now),
            completed_at: None,
        };
        if let Some(key) = idempotency_key {
            self.idempotency.record(key, info.clone());
        }
        Ok(info)
    }

    pub fn list_workers(&self, filters: &WorkerFilters) -> Page<WorkerInfo> {
        let workers = self.workers.read();
        let items = workers
            .values()
            .map(|w| WorkerInfo {
                worker_id: w.worker_id().clone(),
                flow_id: w.flow_id(),
                status: w.status(),
                jobs_processed: w.jobs_processed(),
                jobs_failed: w.jobs_failed(),
                active_jobs: w.active_job_count(),
            })
            .filter(|info| filters.flow_id.map(|f| f == info.flow_id).unwrap_or(true))
            .filter(|info| filters.status.as_ref().map(|s| *s == info.status).unwrap_or(true))
            .collect();
        Page::single(items)
    }

    pub fn list_jobs(&self, filters: &JobFilters) -> Page<JobInfo> {
        let workers = self.workers.read();
        let mut items = Vec::new();
        for worker in workers.values() {
            if let Some(wid) = &filters.worker_id {
                if wid != worker.worker_id() {
                    continue;
                }
            }
            if let Some(flow_id) = filters.flow_id {
                if flow_id != worker.flow_id() {
                    continue;
                }
            }
            for job in worker.job_snapshots() {
                if filters.status.map(|s| s == job.status).unwrap_or(true) {
                    items.push(job);
                }
            }
        }
        Page::single(items)
    }

    pub fn job_breakpoints(&self, worker_id: &WorkerId, job_id: JobId) -> EngineResult<Vec<BreakpointInfo>> {
        self.with_worker(worker_id, |w| w.breakpoint_snapshots(job_id))
    }

    pub fn job_history(&self, worker_id: &WorkerId, job_id: JobId) -> EngineResult<Vec<flowcore::ExecutionRecord>> {
        self.with_worker(worker_id, |w| w.job_history(job_id))
    }

    /// `getJobOutput(job_id, incremental?)` (spec §6): `incremental`
    /// drains only the chunks written since the last call, otherwise
    /// returns the full retained buffer.
    pub fn job_output(&self, job_id: JobId, incremental: bool) -> String {
        if incremental {
            self.stdout.pop_chunks(job_id).concat()
        } else {
            self.stdout.get_buffer(job_id)
        }
    }

    /// The routed-stdout sink this runtime's workers write through.
    /// Routine logic that wants to emit progress text captures this
    /// handle at flow-construction time (spec §9 "Context propagation to
    /// logic" — the one permitted scope-local exception).
    pub fn routed_stdout(&self) -> Arc<RoutedStdout> {
        self.stdout.clone()
    }

    pub fn pause_worker(&self, worker_id: &WorkerId) -> EngineResult<()> {
        self.with_worker(worker_id, |w| w.pause())
    }

    pub fn resume_worker(&self, worker_id: &WorkerId) -> EngineResult<()> {
        self.with_worker(worker_id, |w| w.resume())
    }

    pub fn stop_worker(&self, worker_id: &WorkerId) -> EngineResult<()> {
        self.with_worker(worker_id, |w| {
            w.stop();
            Ok(())
        })
    }

    pub fn get_job(&self, worker_id: &WorkerId, job_id: JobId) -> EngineResult<JobInfo> {
        self.with_worker(worker_id, |w| {
            w.job_snapshots().into_iter().find(|j| j.job_id == job_id).ok_or(EngineError::JobNotFound(job_id))
        })
    }

    pub fn cancel_job(&self, worker_id: &WorkerId, job_id: JobId) -> EngineResult<()> {
        self.with_worker(worker_id, |w| w.cancel_job(job_id))
    }

    pub fn pause_job(&self, worker_id: &WorkerId, job_id: JobId) -> EngineResult<()> {
        self.with_worker(worker_id, |w| w.pause_job(job_id))
    }

    /// Resume a job paused either explicitly or by a breakpoint hit.
    pub fn resume_job(&self, worker_id: &WorkerId, job_id: JobId) -> EngineResult<()> {
        self.with_worker(worker_id, |w| w.resume_job(job_id))
    }

    /// Transition an [`flowengine::CompletionMode::Explicit`] job to
    /// `completed`.
    pub fn complete_job(&self, worker_id: &WorkerId, job_id: JobId) -> EngineResult<()> {
        self.with_worker(worker_id, |w| w.complete_job(job_id))
    }

    pub fn create_breakpoint(
        &self,
        worker_id: &WorkerId,
        job_id: JobId,
        kind: BreakpointKind,
        condition: Option<String>,
    ) -> EngineResult<BreakpointId> {
        self.with_worker(worker_id, |w| w.install_breakpoint(job_id, kind, condition))
    }

    pub fn delete_breakpoint(&self, worker_id: &WorkerId, job_id: JobId, breakpoint_id: BreakpointId) -> EngineResult<()> {
        self.with_worker(worker_id, |w| w.remove_breakpoint(job_id, breakpoint_id))
    }

    pub fn set_breakpoint_enabled(
        &self,
        worker_id: &WorkerId,
        job_id: JobId,
        breakpoint_id: BreakpointId,
        enabled: bool,
    ) -> EngineResult<()> {
        self.with_worker(worker_id, |w| w.set_breakpoint_enabled(job_id, breakpoint_id, enabled))
    }

    fn with_worker<T>(&self, worker_id: &WorkerId, f: impl FnOnce(&WorkerState<C>) -> EngineResult<T>) -> EngineResult<T> {
        let workers = self.workers.read();
        let worker = workers.get(worker_id).ok_or_else(|| EngineError::WorkerNotFound(worker_id.clone()))?;
        f(worker)
    }

    /// Stop accepting new work and halt every worker. Jobs already
    /// mid-firing on a pool thread still finish that single firing; the
    /// worker's driving task then observes `Stopped` and retires.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, std::sync::atomic::Ordering::Release);
        for worker in self.workers.read().values() {
            worker.stop();
        }
        info!("runtime shutdown initiated");
    }
}

/// Build a worker-private copy of a registered flow's routine graph.
/// Slots, events, and connections are data; only the shared `Arc<Flow>`
/// registration is immutable, each worker instance gets its own mutable
/// routine/slot state to mutate during scheduling. Errors here would mean
/// the registered flow was already invalid, which `register_flow` cannot
/// happen given `Flow::add_routine`/`connect` validate eagerly — still
/// propagated rather than assumed, since nothing enforces that at the
/// type level.
fn clone_flow_graph(flow: &Flow) -> EngineResult<Flow> {
    let mut copy = Flow::new(flow.name.clone());
    copy.execution = flow.execution.clone();
    for routine in flow.routines() {
        let mut new_routine =
            flowcore::Routine::new(routine.id, routine.class_name.clone(), clone_policy(routine), routine.logic.clone());
        for (name, slot) in &routine.slots {
            new_routine.add_slot(name.clone(), slot.max_queue);
        }
        for (name, event) in &routine.events {
            new_routine.add_event(name.clone(), event.params.clone());
        }
        new_routine.set_config(routine.config.clone());
        new_routine.set_error_strategy(routine.error_strategy.clone());
        copy.add_routine(new_routine)?;
    }
    for conn in flow.connections() {
        copy.connect(
            conn.source_routine,
            &conn.source_event,
            conn.target_routine,
            &conn.target_slot,
            conn.param_mapping.clone(),
        )?;
    }
    Ok(copy)
}

fn clone_policy(routine: &flowcore::Routine) -> Box<dyn flowcore::ActivationPolicy> {
    routine.policy.clone_box()
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
