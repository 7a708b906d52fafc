// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flowcore::{Immediate, Routine, RoutineId};
use serde_json::Value;
use std::sync::Arc;

fn routine() -> Routine {
    let mut r = Routine::new(RoutineId::new(), "echo", Box::new(Immediate), Arc::new(|_f, _kw| Ok(())));
    r.add_slot("trigger", None);
    r
}

#[test]
fn evaluate_reflects_pending_slot_data() {
    let r = routine();
    let job_id = JobId::new();
    r.slots["trigger"].receive(job_id, Value::from(1)).unwrap();
    let activation = evaluate(&r, job_id, &WorkerLocalState::default());
    assert!(activation.should_fire);
}

#[test]
fn commit_firing_drains_consumed_slots() {
    let r = routine();
    let job_id = JobId::new();
    r.slots["trigger"].receive(job_id, Value::from(1)).unwrap();
    let activation = evaluate(&r, job_id, &WorkerLocalState::default());
    commit_firing(&r, job_id, &activation);
    assert!(r.slots["trigger"].peek_new(job_id).is_empty());
}
