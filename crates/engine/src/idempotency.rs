// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotency store with TTL, consulted by `Runtime::post` (spec §4.9,
//! modelled on `routilux/server/routes/jobs.py`'s dedup-by-key behaviour).
//!
//! Kept as `parking_lot::Mutex<HashMap<..>>` with explicit sweep-on-access
//! in the teacher's concurrency idiom rather than adding a dependency
//! purely for this concern.

use std::collections::HashMap;
use std::time::Duration;

use flowcore::Clock;
use flowwire::JobInfo;
use parking_lot::Mutex;

struct Entry {
    response: JobInfo,
    recorded_at_ms: u64,
}

pub struct IdempotencyStore<C: Clock> {
    clock: C,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl<C: Clock> IdempotencyStore<C> {
    pub fn new(clock: C, ttl: Duration) -> Self {
        Self { clock, ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// Returns the previously recorded response if `key` is present and
    /// not yet expired, sweeping expired entries as a side effect.
    pub fn lookup(&self, key: &str) -> Option<JobInfo> {
        let now = self.clock.epoch_ms();
        let mut guard = self.entries.lock();
        self.sweep_locked(&mut guard, now);
        guard.get(key).map(|e| e.response.clone())
    }

    pub fn record(&self, key: String, response: JobInfo) {
        let now = self.clock.epoch_ms();
        let mut guard = self.entries.lock();
        self.sweep_locked(&mut guard, now);
        guard.insert(key, Entry { response, recorded_at_ms: now });
    }

    fn sweep_locked(&self, guard: &mut HashMap<String, Entry>, now_ms: u64) {
        let ttl_ms = self.ttl.as_millis() as u64;
        guard.retain(|_, e| now_ms.saturating_sub(e.recorded_at_ms) < ttl_ms);
    }
}

#[cfg(test)]
#[path = "idempotency_tests.rs"]
mod tests;
