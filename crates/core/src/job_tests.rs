// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn ctx() -> JobContext {
    JobContext::builder().build()
}

#[test]
fn status_monotonicity_terminal_never_transitions() {
    for terminal in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
        assert!(terminal.transition(JobStatus::Running).is_err());
        assert!(terminal.transition(JobStatus::Paused).is_err());
    }
}

#[test]
fn pending_to_running_to_completed_is_valid() {
    let mut c = ctx();
    assert!(c.transition(JobStatus::Running).is_ok());
    assert!(c.transition(JobStatus::Completed).is_ok());
    assert_eq!(c.status, JobStatus::Completed);
}

#[test]
fn pause_resume_cycle_is_valid() {
    let mut c = ctx();
    c.transition(JobStatus::Running).unwrap();
    assert!(c.transition(JobStatus::Paused).is_ok());
    assert!(c.transition(JobStatus::Running).is_ok());
    assert!(c.transition(JobStatus::Paused).is_ok());
}

#[test]
fn pending_cannot_jump_to_completed() {
    let mut c = ctx();
    assert!(c.transition(JobStatus::Completed).is_err());
}

#[test]
fn history_drops_oldest_when_over_cap() {
    let mut c = JobContext::builder().history_cap(2usize).build();
    let rid = RoutineId::new();
    for i in 0..3u64 {
        c.push_history(ExecutionRecord::RoutineStart { routine_id: rid, timestamp: i });
    }
    assert_eq!(c.history().len(), 2);
    assert_eq!(c.history().front().unwrap().timestamp(), 1);
    assert_eq!(c.history().back().unwrap().timestamp(), 2);
}

#[test]
fn job_data_is_isolated_per_routine() {
    let mut c = ctx();
    let a = RoutineId::new();
    let b = RoutineId::new();
    c.job_data(a).insert("k".into(), Value::from(1));
    c.job_data(b).insert("k".into(), Value::from(2));
    assert_eq!(c.job_data(a).get("k"), Some(&Value::from(1)));
    assert_eq!(c.job_data(b).get("k"), Some(&Value::from(2)));
}

#[test]
fn retry_attempts_increment_per_routine() {
    let mut c = ctx();
    let rid = RoutineId::new();
    assert_eq!(c.increment_retry(rid), 1);
    assert_eq!(c.increment_retry(rid), 2);
}

#[test]
fn builder_sets_explicit_status() {
    let c = JobContext::builder().status(JobStatus::Running).build();
    assert_eq!(c.status, JobStatus::Running);
}
