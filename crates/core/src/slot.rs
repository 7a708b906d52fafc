// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named input port on a routine (spec §4.1).

use std::collections::HashMap;
use std::collections::VecDeque;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::CoreError;
use crate::job::JobId;

/// Backpressure level derived from `usage_ratio`, thresholds at
/// 0.5/0.75/0.9 per spec §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PressureLevel {
    Low,
    Medium,
    High,
    Critical,
}

crate::simple_display! {
    PressureLevel {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pressure {
    pub level: PressureLevel,
    pub usage_ratio: f64,
}

impl Pressure {
    fn from_ratio(usage_ratio: f64) -> Self {
        let level = if usage_ratio >= 0.9 {
            PressureLevel::Critical
        } else if usage_ratio >= 0.75 {
            PressureLevel::High
        } else if usage_ratio >= 0.5 {
            PressureLevel::Medium
        } else {
            PressureLevel::Low
        };
        Self { level, usage_ratio }
    }
}

#[derive(Default)]
struct SlotQueues {
    per_job: HashMap<JobId, VecDeque<Value>>,
}

/// Bounded, per-job FIFO input queue. `max_queue: None` means unbounded.
pub struct Slot {
    pub name: String,
    pub max_queue: Option<usize>,
    queues: Mutex<SlotQueues>,
}

impl Slot {
    pub fn new(name: impl Into<String>, max_queue: Option<usize>) -> Self {
        Self {
            name: name.into(),
            max_queue,
            queues: Mutex::new(SlotQueues::default()),
        }
    }

    /// Append an item to the job's queue. Fails when the queue is already
    /// at `max_queue`.
    pub fn receive(&self, job_id: JobId, item: Value) -> Result<(), CoreError> {
        let mut guard = self.queues.lock();
        let queue = guard.per_job.entry(job_id).or_default();
        if let Some(max) = self.max_queue {
            if queue.len() >= max {
                return Err(CoreError::SlotBackpressureExceeded {
                    routine_id: String::new(),
                    slot: self.name.clone(),
                    max_queue: max,
                });
            }
        }
        queue.push_back(item);
        Ok(())
    }

    /// Read-only snapshot of unconsumed items, oldest first.
    pub fn peek_new(&self, job_id: JobId) -> Vec<Value> {
        let guard = self.queues.lock();
        guard
            .per_job
            .get(&job_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Atomically drains and returns all unconsumed items.
    pub fn consume_all_new(&self, job_id: JobId) -> Vec<Value> {
        let mut guard = self.queues.lock();
        guard
            .per_job
            .get_mut(&job_id)
            .map(|q| q.drain(..).collect())
            .unwrap_or_default()
    }

    /// Atomically drains and returns exactly `n` items, oldest first.
    /// Caller must have already confirmed at least `n` are present.
    pub fn consume_n(&self, job_id: JobId, n: usize) -> Vec<Value> {
        let mut guard = self.queues.lock();
        match guard.per_job.get_mut(&job_id) {
            Some(q) => q.drain(..n.min(q.len())).collect(),
            None => Vec::new(),
        }
    }

    pub fn pressure(&self, job_id: JobId) -> Pressure {
        let Some(max) = self.max_queue else {
            return Pressure::from_ratio(0.0);
        };
        if max == 0 {
            return Pressure::from_ratio(1.0);
        }
        let guard = self.queues.lock();
        let len = guard.per_job.get(&job_id).map(|q| q.len()).unwrap_or(0);
        Pressure::from_ratio(len as f64 / max as f64)
    }

    pub fn clear(&self, job_id: JobId) {
        self.queues.lock().per_job.remove(&job_id);
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
