// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flowcore::{FakeClock, Flow, Immediate, JobContext, Routine, RoutineId};
use std::sync::Arc as StdArc;

fn flow_with_echo() -> (Flow, RoutineId) {
    let mut flow = Flow::new(None);
    let mut echo = Routine::new(RoutineId::new(), "echo", Box::new(Immediate), StdArc::new(|frame, kwargs| {
        frame.emit("out", kwargs)
    }));
    echo.add_slot("trigger", None);
    echo.add_event("out", vec!["data".into()]);
    let id = flow.add_routine(echo).unwrap();
    (flow, id)
}

#[test]
fn fire_runs_logic_and_records_history() {
    let (flow, routine_id) = flow_with_echo();
    let routine = flow.get_routine(routine_id).unwrap();
    let job_id = JobId::new();
    routine.slots["trigger"].receive(job_id, Value::from("hello")).unwrap();

    let mut job = JobContext::new(job_id, flowcore::WorkerId::generate(), flow.id, 0, 1_000);
    let activation = scheduler::evaluate(routine, job_id, &Default::default());
    assert!(activation.should_fire);

    let executor = Executor::new(FakeClock::new(), SchemaMode::Lenient);
    let outcome = executor.fire(&flow, &mut job, flowcore::WorkerId::generate(), routine_id, activation).unwrap();
    assert!(matches!(outcome, FiringOutcome::Ok));
    assert!(job.history().iter().any(|r| matches!(r, ExecutionRecord::RoutineStart { .. })));
    assert!(job.history().iter().any(|r| matches!(r, ExecutionRecord::EventEmit { .. })));
}

#[test]
fn stop_strategy_fails_job() {
    let executor = Executor::new(FakeClock::new(), SchemaMode::Lenient);
    let mut job = JobContext::new(JobId::new(), flowcore::WorkerId::generate(), flowcore::FlowId::new(), 0, 1_000);
    let decision = executor.apply_error_strategy(&mut job, RoutineId::new(), &ErrorStrategy::Stop, "boom");
    assert!(matches!(decision, StrategyDecision::Fail));
}

#[test]
fn continue_strategy_keeps_scheduling() {
    let executor = Executor::new(FakeClock::new(), SchemaMode::Lenient);
    let mut job = JobContext::new(JobId::new(), flowcore::WorkerId::generate(), flowcore::FlowId::new(), 0, 1_000);
    let decision = executor.apply_error_strategy(&mut job, RoutineId::new(), &ErrorStrategy::Continue, "boom");
    assert!(matches!(decision, StrategyDecision::Continue));
}

#[test]
fn retry_falls_through_to_fallback_after_exhaustion() {
    let executor = Executor::new(FakeClock::new(), SchemaMode::Lenient);
    let mut job = JobContext::new(JobId::new(), flowcore::WorkerId::generate(), flowcore::FlowId::new(), 0, 1_000);
    let routine_id = RoutineId::new();
    let strategy = ErrorStrategy::Retry {
        max_attempts: 2,
        backoff: std::time::Duration::from_millis(1),
        fallback: Box::new(ErrorStrategy::Stop),
    };
    let first = executor.apply_error_strategy(&mut job, routine_id, &strategy, "boom");
    assert!(matches!(first, StrategyDecision::Retry(_)));
    let second = executor.apply_error_strategy(&mut job, routine_id, &strategy, "boom");
    assert!(matches!(second, StrategyDecision::Fail));
}
