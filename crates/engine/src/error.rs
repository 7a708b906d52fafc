// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling/execution error taxonomy, layered over `CoreError` (spec §7).

use flowcore::{CoreError, FlowId, JobId, WorkerId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("flow {0} not found")]
    FlowNotFound(FlowId),

    #[error("worker {0} not found")]
    WorkerNotFound(WorkerId),

    #[error("worker {0} already exists")]
    WorkerAlreadyExists(WorkerId),

    #[error("worker {0} is not running")]
    WorkerNotRunning(WorkerId),

    #[error("worker {0} already completed")]
    WorkerAlreadyCompleted(WorkerId),

    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("job submission failed: {0}")]
    JobSubmissionFailed(String),

    #[error("job {0} is not pausable in its current status")]
    JobNotPausable(JobId),

    #[error("job {0} is not resumable in its current status")]
    JobNotResumable(JobId),

    #[error("routine factory has no constructor registered for class '{0}'")]
    UnknownRoutineClass(String),

    #[error("runtime is shutting down")]
    RuntimeShutdown,

    #[error("permission denied")]
    PermissionDenied,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
