// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the pure-read `SlotsView` a routine's `ActivationPolicy` sees,
//! and commits a firing's consumption once a policy approves it
//! (spec §4.8 steps 1-2).

use std::collections::HashMap;

use flowcore::{Activation, ActivationPolicy, JobId, Routine, SlotsView, WorkerLocalState};

/// Consult `routine`'s policy for `job_id` using a fresh snapshot of its
/// slots. Returns the `Activation` unmodified; callers commit the
/// consumption separately via [`commit_firing`].
pub fn evaluate(routine: &Routine, job_id: JobId, worker_state: &WorkerLocalState) -> Activation {
    let new_items: HashMap<&str, Vec<serde_json::Value>> = routine
        .slots
        .keys()
        .map(|name| (name.as_str(), routine.slots[name].peek_new(job_id)))
        .collect();
    let declared: Vec<&str> = routine.slots.keys().map(String::as_str).collect();
    let view = SlotsView::new(new_items, declared);
    routine.policy.evaluate(&view, worker_state)
}

/// Once a policy has approved firing, atomically drain the consumed
/// items from each named slot (spec: "the scheduler commits by calling
/// `consume_all_new`").
pub fn commit_firing(routine: &Routine, job_id: JobId, activation: &Activation) {
    for slot_name in activation.data.keys() {
        if let Some(slot) = routine.slots.get(slot_name) {
            slot.consume_all_new(job_id);
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
