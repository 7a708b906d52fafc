// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide routed stdout (spec §4.11), grounded on
//! `routilux/core/output.py`'s `RoutedStdout`.
//!
//! The scope-local "current job" binding set here is the single
//! permitted use of scope-local state (spec §9 "Context propagation to
//! logic"); everything else is passed as an explicit parameter.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use flowcore::JobId;
use parking_lot::Mutex;

tokio::task_local! {
    static CURRENT_JOB: std::cell::Cell<Option<JobId>>;
}

struct JobOutput {
    buffer: String,
    chunks: VecDeque<String>,
    last_write_ms: u64,
}

impl JobOutput {
    fn new() -> Self {
        Self { buffer: String::new(), chunks: VecDeque::new(), last_write_ms: 0 }
    }
}

/// Where an uncaptured write (no job bound) goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    #[default]
    Discard,
    RealStdout,
}

pub struct RoutedStdout {
    jobs: Mutex<HashMap<JobId, JobOutput>>,
    buffer_cap: usize,
    fallback: Fallback,
}

impl RoutedStdout {
    pub fn new(buffer_cap: usize, fallback: Fallback) -> Arc<Self> {
        Arc::new(Self { jobs: Mutex::new(HashMap::new()), buffer_cap, fallback })
    }

    /// Run `f` with `job_id` bound as the "current job" for the duration
    /// of the call; any `write` calls made from within it (directly or
    /// through routine logic) are attributed to `job_id`. The worker loop
    /// wraps each firing in this before invoking the executor, since
    /// `Executor::fire` itself is synchronous.
    pub fn scoped<F, T>(&self, job_id: JobId, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        CURRENT_JOB.sync_scope(std::cell::Cell::new(Some(job_id)), f)
    }

    /// Append `text`, attributing it to the currently bound job if one
    /// exists, otherwise following `fallback`.
    pub fn write(&self, text: &str, now_ms: u64) {
        let current = CURRENT_JOB.try_with(|c| c.get()).ok().flatten();
        let Some(job_id) = current else {
            if self.fallback == Fallback::RealStdout {
                print!("{text}");
            }
            return;
        };
        let mut guard = self.jobs.lock();
        let out = guard.entry(job_id).or_insert_with(JobOutput::new);
        out.buffer.push_str(text);
        if out.buffer.len() > self.buffer_cap {
            let excess = out.buffer.len() - self.buffer_cap;
            out.buffer.drain(..excess);
        }
        out.chunks.push_back(text.to_string());
        out.last_write_ms = now_ms;
    }

    /// Consuming read for incremental streaming.
    pub fn pop_chunks(&self, job_id: JobId) -> Vec<String> {
        let mut guard = self.jobs.lock();
        guard
            .get_mut(&job_id)
            .map(|o| o.chunks.drain(..).collect())
            .unwrap_or_default()
    }

    /// Non-consuming read of the full buffer.
    pub fn get_buffer(&self, job_id: JobId) -> String {
        self.jobs.lock().get(&job_id).map(|o| o.buffer.clone()).unwrap_or_default()
    }

    pub fn clear_job(&self, job_id: JobId) {
        self.jobs.lock().remove(&job_id);
    }

    /// Trims buffers for jobs whose last write is older than `ttl_ms`,
    /// run periodically by a background task.
    pub fn sweep(&self, now_ms: u64, ttl_ms: u64) {
        self.jobs.lock().retain(|_, o| now_ms.saturating_sub(o.last_write_ms) < ttl_ms);
    }
}

#[cfg(test)]
#[path = "stdout_tests.rs"]
mod tests;
