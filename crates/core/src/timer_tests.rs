// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn job_timeout_carries_job_id() {
    let job_id = JobId::new();
    let key = TimerKey::job_timeout(job_id);
    assert_eq!(key.job_id(), job_id);
}

#[test]
fn policy_timer_carries_job_id() {
    let job_id = JobId::new();
    let key = TimerKey::policy_timer(WorkerId::generate(), job_id, RoutineId::new());
    assert_eq!(key.job_id(), job_id);
}

#[test]
fn policy_state_key_is_stable_for_same_inputs() {
    let job_id = JobId::new();
    let routine_id = RoutineId::new();
    assert_eq!(
        TimerKey::policy_state_key(job_id, routine_id),
        TimerKey::policy_state_key(job_id, routine_id)
    );
}

#[test]
fn distinct_timer_keys_are_not_equal() {
    let job_a = TimerKey::job_timeout(JobId::new());
    let job_b = TimerKey::job_timeout(JobId::new());
    assert_ne!(job_a, job_b);
}
