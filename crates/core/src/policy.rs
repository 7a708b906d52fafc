// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activation policies: pure predicates over slot views deciding when a
//! routine fires (spec §4.5).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Read-only view over a routine's slots for one job, handed to
/// [`ActivationPolicy::evaluate`]. Backed by `peek_new`, never mutates.
pub struct SlotsView<'a> {
    new_items: HashMap<&'a str, Vec<Value>>,
    declared_slots: Vec<&'a str>,
}

impl<'a> SlotsView<'a> {
    pub fn new(new_items: HashMap<&'a str, Vec<Value>>, declared_slots: Vec<&'a str>) -> Self {
        Self { new_items, declared_slots }
    }

    pub fn new_items(&self, slot: &str) -> &[Value] {
        self.new_items.get(slot).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn declared_slots(&self) -> &[&'a str] {
        &self.declared_slots
    }

    pub fn any_has_new(&self) -> bool {
        self.new_items.values().any(|v| !v.is_empty())
    }

    pub fn all_have_new(&self) -> bool {
        self.declared_slots
            .iter()
            .all(|s| !self.new_items(s).is_empty())
    }
}

/// Worker-local timer state a policy may read but never mutate from
/// `evaluate` (the scheduler updates it between evaluations).
#[derive(Debug, Clone, Default)]
pub struct WorkerLocalState {
    /// Wall-clock instant of the last firing, keyed by routine suffix used
    /// by `time_interval`.
    pub last_fired_at: HashMap<String, Instant>,
    /// Instant the first item arrived in the current pending batch, keyed
    /// by routine suffix, consulted by `n_of_m`'s timeout arm.
    pub first_item_at: HashMap<String, Instant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub should_fire: bool,
    pub data: HashMap<String, Vec<Value>>,
    pub reason: &'static str,
}

impl Activation {
    pub fn no_fire(reason: &'static str) -> Self {
        Self { should_fire: false, data: HashMap::new(), reason }
    }
}

/// A pure function of `(slots_view, worker_state) -> Activation`. Must not
/// mutate any state that affects the decision.
pub trait ActivationPolicy: Send + Sync {
    fn evaluate(&self, slots: &SlotsView<'_>, worker_state: &WorkerLocalState) -> Activation;

    /// Stable key into `WorkerLocalState`'s timer maps for this policy
    /// instance; only `TimeInterval`/`NOfM` use it.
    fn timer_key(&self) -> Option<&str> {
        None
    }

    /// Duplicate this policy into a fresh boxed instance, used when the
    /// runtime instantiates a worker-private copy of a registered flow's
    /// routine graph.
    fn clone_box(&self) -> Box<dyn ActivationPolicy>;
}

/// Fires when any slot has ≥1 new item; consumes exactly the new items
/// from all slots.
#[derive(Debug, Default)]
pub struct Immediate;

impl ActivationPolicy for Immediate {
    fn evaluate(&self, slots: &SlotsView<'_>, _worker_state: &WorkerLocalState) -> Activation {
        if !slots.any_has_new() {
            return Activation::no_fire("no_new_items");
        }
        let data = slots
            .declared_slots()
            .iter()
            .map(|s| (s.to_string(), slots.new_items(s).to_vec()))
            .collect();
        Activation { should_fire: true, data, reason: "immediate" }
    }

    fn clone_box(&self) -> Box<dyn ActivationPolicy> {
        Box::new(Immediate)
    }
}

/// Fires when `slot_name` has ≥ `n` new items; consumes exactly `n`.
#[derive(Debug)]
pub struct BatchSize {
    pub slot_name: String,
    pub n: usize,
}

impl ActivationPolicy for BatchSize {
    fn evaluate(&self, slots: &SlotsView<'_>, _worker_state: &WorkerLocalState) -> Activation {
        let items = slots.new_items(&self.slot_name);
        if items.len() < self.n {
            return Activation::no_fire("batch_not_full");
        }
        let mut data = HashMap::new();
        data.insert(self.slot_name.clone(), items[..self.n].to_vec());
        Activation { should_fire: true, data, reason: "batch_size" }
    }

    fn clone_box(&self) -> Box<dyn ActivationPolicy> {
        Box::new(BatchSize { slot_name: self.slot_name.clone(), n: self.n })
    }
}

/// Fires when every declared slot has ≥1 new item; consumes one item per
/// slot.
#[derive(Debug, Default)]
pub struct AllSlotsReady;

impl ActivationPolicy for AllSlotsReady {
    fn evaluate(&self, slots: &SlotsView<'_>, _worker_state: &WorkerLocalState) -> Activation {
        if slots.declared_slots().is_empty() || !slots.all_have_new() {
            return Activation::no_fire("not_all_slots_ready");
        }
        let data = slots
            .declared_slots()
            .iter()
            .map(|s| (s.to_string(), slots.new_items(s)[..1].to_vec()))
            .collect();
        Activation { should_fire: true, data, reason: "all_slots_ready" }
    }

    fn clone_box(&self) -> Box<dyn ActivationPolicy> {
        Box::new(AllSlotsReady)
    }
}

/// Fires at most once per `interval`, if any new item is pending.
#[derive(Debug)]
pub struct TimeInterval {
    pub key: String,
    pub interval: Duration,
}

impl ActivationPolicy for TimeInterval {
    fn timer_key(&self) -> Option<&str> {
        Some(&self.key)
    }

    fn evaluate(&self, slots: &SlotsView<'_>, worker_state: &WorkerLocalState) -> Activation {
        if !slots.any_has_new() {
            return Activation::no_fire("no_new_items");
        }
        if let Some(last) = worker_state.last_fired_at.get(&self.key) {
            if last.elapsed() < self.interval {
                return Activation::no_fire("interval_not_elapsed");
            }
        }
        let data = slots
            .declared_slots()
            .iter()
            .map(|s| (s.to_string(), slots.new_items(s).to_vec()))
            .collect();
        Activation { should_fire: true, data, reason: "time_interval" }
    }

    fn clone_box(&self) -> Box<dyn ActivationPolicy> {
        Box::new(TimeInterval { key: self.key.clone(), interval: self.interval })
    }
}

/// Fires when ≥ `threshold` designated slots have items, or `timeout`
/// elapsed since the first item arrived in the current batch.
#[derive(Debug)]
pub struct NOfM {
    pub key: String,
    pub threshold: usize,
    pub timeout: Duration,
}

impl ActivationPolicy for NOfM {
    fn timer_key(&self) -> Option<&str> {
        Some(&self.key)
    }

    fn evaluate(&self, slots: &SlotsView<'_>, worker_state: &WorkerLocalState) -> Activation {
        let ready_count = slots
            .declared_slots()
            .iter()
            .filter(|s| !slots.new_items(s).is_empty())
            .count();
        let timed_out = worker_state
            .first_item_at
            .get(&self.key)
            .map(|t| t.elapsed() >= self.timeout)
            .unwrap_or(false);
        if ready_count < self.threshold && !(timed_out && ready_count > 0) {
            return Activation::no_fire("threshold_not_met");
        }
        let data = slots
            .declared_slots()
            .iter()
            .filter(|s| !slots.new_items(s).is_empty())
            .map(|s| (s.to_string(), slots.new_items(s).to_vec()))
            .collect();
        let reason = if timed_out && ready_count < self.threshold {
            "n_of_m_timeout"
        } else {
            "n_of_m_threshold"
        };
        Activation { should_fire: true, data, reason }
    }

    fn clone_box(&self) -> Box<dyn ActivationPolicy> {
        Box::new(NOfM { key: self.key.clone(), threshold: self.threshold, timeout: self.timeout })
    }
}

/// Never fires on its own; installed over a routine's own policy while a
/// routine breakpoint is enabled.
#[derive(Debug, Default)]
pub struct Breakpointed;

impl ActivationPolicy for Breakpointed {
    fn evaluate(&self, _slots: &SlotsView<'_>, _worker_state: &WorkerLocalState) -> Activation {
        Activation::no_fire("breakpointed")
    }

    fn clone_box(&self) -> Box<dyn ActivationPolicy> {
        Box::new(Breakpointed)
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
