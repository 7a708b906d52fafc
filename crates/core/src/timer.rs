// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer keys for scheduler-tracked wall-clock deadlines: job timeouts
//! (spec §5 "jobs carry an optional wall-clock timeout") and the
//! `time_interval`/`n_of_m` activation-policy timers (spec §4.5).
//!
//! Unlike the `define_id!` ids, these aren't handed to callers or
//! serialized on the wire, so they're a plain enum rather than a packed
//! `IdBuf` — composite keys here would overflow `IdBuf`'s fixed capacity.

use crate::job::JobId;
use crate::routine::RoutineId;
use crate::worker::WorkerId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Job-wide wall-clock timeout; firing cancels the job with reason
    /// `timeout`.
    JobTimeout(JobId),
    /// Backing key for `ActivationPolicy::timer_key` on a `time_interval`
    /// or `n_of_m` policy, scoped to the worker/job/routine it gates.
    PolicyTimer { worker_id: WorkerId, job_id: JobId, routine_id: RoutineId },
}

impl TimerKey {
    pub fn job_timeout(job_id: JobId) -> Self {
        Self::JobTimeout(job_id)
    }

    pub fn policy_timer(worker_id: WorkerId, job_id: JobId, routine_id: RoutineId) -> Self {
        Self::PolicyTimer { worker_id, job_id, routine_id }
    }

    /// The `WorkerLocalState` timer-map key string a policy's
    /// `timer_key()` should return for this job/routine pair.
    pub fn policy_state_key(job_id: JobId, routine_id: RoutineId) -> String {
        format!("{job_id}:{routine_id}")
    }

    pub fn job_id(&self) -> JobId {
        match self {
            Self::JobTimeout(id) => *id,
            Self::PolicyTimer { job_id, .. } => *job_id,
        }
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
