// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flowcore::{FakeClock, Flow, Immediate, Routine, RoutineId, SchemaMode};
use std::sync::Arc as StdArc;

/// Incoming logic kwargs are keyed by slot name, not by the event
/// param name an `emit` call validates against; a value delivered
/// through a connection also arrives wrapped as `{"data": value}`
/// (the upstream event's own kwargs). Unwrap one level before reuse.
fn unwrap_payload(v: &Value) -> Value {
    match v.get("data") {
        Some(inner) => inner.clone(),
        None => v.clone(),
    }
}

fn echo_to_printer() -> (Flow, RoutineId, RoutineId) {
    let mut flow = Flow::new(None);
    let mut echo = Routine::new(RoutineId::new(), "echo", Box::new(Immediate), StdArc::new(|frame, kwargs| {
        let data = kwargs.get("trigger").map(unwrap_payload).unwrap_or(Value::Null);
        let mut out = HashMap::new();
        out.insert("data".to_string(), data);
        frame.emit("out", out)
    }));
    echo.add_slot("trigger", None);
    echo.add_event("out", vec!["data".into()]);
    let echo_id = flow.add_routine(echo).unwrap();

    let mut printer = Routine::new(RoutineId::new(), "printer", Box::new(Immediate), StdArc::new(|frame, kwargs| {
        let data = kwargs.get("in").map(unwrap_payload).unwrap_or(Value::Null);
        frame.set_job_data("received", data);
        Ok(())
    }));
    printer.add_slot("in", None);
    let printer_id = flow.add_routine(printer).unwrap();

    flow.connect(echo_id, "out", printer_id, "in", None).unwrap();
    (flow, echo_id, printer_id)
}

fn state(flow: Flow) -> WorkerState<FakeClock> {
    let executor = Executor::new(FakeClock::new(), SchemaMode::Lenient);
    let stdout = RoutedStdout::new(1_000, crate::stdout::Fallback::Discard);
    WorkerState::new(WorkerId::generate(), flow, executor, stdout)
}

/// `submit_job` spawns the per-job driving task; tests observe its
/// progress by yielding back to the runtime rather than calling
/// `drive_once` themselves, since the two would otherwise race on
/// the same job.
async fn wait_for_status(worker: &WorkerState<FakeClock>, job_id: JobId, target: JobStatus) {
    for _ in 0..500 {
        if worker.job_status(job_id).unwrap() == target {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("job {job_id} never reached {target:?}");
}

async fn settle(worker: &WorkerState<FakeClock>, job_id: JobId) {
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(1)).await;
        if worker.job_status(job_id).unwrap().is_terminal() {
            return;
        }
    }
}

#[tokio::test]
async fn submit_job_fires_entry_routine_and_propagates_to_completion() {
    let (flow, echo_id, printer_id) = echo_to_printer();
    let worker = state(flow);
    let job_id = worker.submit_job(echo_id, "trigger", Value::from("hello"), 0, 1_000, CompletionMode::FirstQuiescence).unwrap();
    wait_for_status(&worker, job_id, JobStatus::Completed).await;

    let jobs = worker.jobs.lock();
    let slot = &jobs[&job_id];
    assert_eq!(slot.ctx.routine_states[&printer_id].get("received"), Some(&Value::from("hello")));
    assert!(slot.ctx.history().iter().any(|r| matches!(r, ExecutionRecord::EventEmit { .. })));
}

#[tokio::test]
async fn explicit_completion_mode_does_not_auto_complete() {
    let (flow, echo_id, _printer_id) = echo_to_printer();
    let worker = state(flow);
    let job_id = worker.submit_job(echo_id, "trigger", Value::from(1), 0, 1_000, CompletionMode::Explicit).unwrap();
    settle(&worker, job_id).await;

    assert_eq!(worker.job_status(job_id).unwrap(), JobStatus::Running);
    worker.complete_job(job_id).unwrap();
    assert_eq!(worker.job_status(job_id).unwrap(), JobStatus::Completed);
}

#[tokio::test]
async fn routine_breakpoint_blocks_firing_until_removed() {
    let mut flow = Flow::new(None);
    let mut echo = Routine::new(RoutineId::new(), "echo", Box::new(Immediate), StdArc::new(|frame, kwargs| {
        let data = kwargs.get("trigger").map(unwrap_payload).unwrap_or(Value::Null);
        let mut out = HashMap::new();
        out.insert("data".to_string(), data);
        frame.emit("out", out)
    }));
    echo.add_slot("trigger", None);
    echo.add_event("out", vec!["data".into()]);
    let echo_id = flow.add_routine(echo).unwrap();

    let mut processor = Routine::new(RoutineId::new(), "processor", Box::new(Immediate), StdArc::new(|frame, kwargs| {
        let data = kwargs.get("in").map(unwrap_payload).unwrap_or(Value::Null);
        let mut out = HashMap::new();
        out.insert("data".to_string(), data);
        frame.emit("out", out)
    }));
    processor.add_slot("in", None);
    processor.add_event("out", vec!["data".into()]);
    let processor_id = flow.add_routine(processor).unwrap();

    let mut printer = Routine::new(RoutineId::new(), "printer", Box::new(Immediate), StdArc::new(|frame, kwargs| {
        let data = kwargs.get("in").map(unwrap_payload).unwrap_or(Value::Null);
        frame.set_job_data("received", data);
        Ok(())
    }));
    printer.add_slot("in", None);
    let printer_id = flow.add_routine(printer).unwrap();

    flow.connect(echo_id, "out", processor_id, "in", None).unwrap();
    flow.connect(processor_id, "out", printer_id, "in", None).unwrap();

    let worker = state(flow);
    let job_id = worker.submit_job(echo_id, "trigger", Value::from("x"), 0, 1_000, CompletionMode::FirstQuiescence).unwrap();
    let bp_id = worker.install_breakpoint(job_id, BreakpointKind::Routine(processor_id), None).unwrap();
    wait_for_status(&worker, job_id, JobStatus::Paused).await;

    {
        let jobs = worker.jobs.lock();
        assert!(!jobs[&job_id].ctx.routine_states.contains_key(&printer_id));
        assert!(jobs[&job_id].ctx.history().iter().any(|r| matches!(r, ExecutionRecord::BreakpointHit { .. })));
    }

    worker.remove_breakpoint(job_id, bp_id).unwrap();
    worker.resume_job(job_id).unwrap();
    wait_for_status(&worker, job_id, JobStatus::Completed).await;

    let jobs = worker.jobs.lock();
    assert_eq!(jobs[&job_id].ctx.routine_states[&printer_id].get("received"), Some(&Value::from("x")));
}

#[test]
fn pausing_a_non_running_worker_is_rejected() {
    let (flow, _, _) = echo_to_printer();
    let worker = state(flow);
    worker.pause().unwrap();
    assert!(worker.pause().is_err());
    worker.resume().unwrap();
    assert!(worker.resume().is_err());
}

#[tokio::test]
async fn retry_strategy_reinjects_data_after_backoff() {
    let mut flow = Flow::new(None);
    let attempts = StdArc::new(AtomicU64::new(0));
    let attempts_in_logic = attempts.clone();
    let mut flaky = Routine::new(RoutineId::new(), "flaky", Box::new(Immediate), StdArc::new(move |_frame, _kwargs| {
        let n = attempts_in_logic.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            Err(flowcore::CoreError::RoutineLogicError("first attempt fails".into()))
        } else {
            Ok(())
        }
    }));
    flaky.add_slot("in", None);
    flaky.set_error_strategy(flowcore::ErrorStrategy::Retry {
        max_attempts: 3,
        backoff: Duration::from_millis(10),
        fallback: Box::new(flowcore::ErrorStrategy::Stop),
    });
    let flaky_id = flow.add_routine(flaky).unwrap();

    let worker = state(flow);
    let job_id = worker
        .submit_job(flaky_id, "in", Value::from(1), 0, 1_000, CompletionMode::FirstQuiescence)
        .unwrap();

    wait_for_status(&worker, job_id, JobStatus::Completed).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn stop_strategy_failure_surfaces_error_message() {
    let mut flow = Flow::new(None);
    let mut doomed = Routine::new(RoutineId::new(), "doomed", Box::new(Immediate), StdArc::new(|_frame, _kwargs| {
        Err(flowcore::CoreError::RoutineLogicError("boom".into()))
    }));
    doomed.add_slot("in", None);
    doomed.set_error_strategy(flowcore::ErrorStrategy::Stop);
    let doomed_id = flow.add_routine(doomed).unwrap();

    let worker = state(flow);
    let job_id = worker
        .submit_job(doomed_id, "in", Value::from(1), 0, 1_000, CompletionMode::FirstQuiescence)
        .unwrap();
    wait_for_status(&worker, job_id, JobStatus::Failed).await;

    let snapshot = worker.job_snapshots().into_iter().find(|j| j.job_id == job_id).unwrap();
    assert_eq!(snapshot.error.as_deref(), Some("routine logic error: boom"));
}
