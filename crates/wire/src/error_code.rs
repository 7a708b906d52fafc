// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport-appropriate error codes (spec §6 "Error codes").

use flowcore::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    FlowNotFound,
    RoutineNotFound,
    SlotNotFound,
    EventNotFound,
    WorkerNotFound,
    WorkerAlreadyExists,
    WorkerNotRunning,
    WorkerAlreadyCompleted,
    JobNotFound,
    JobSubmissionFailed,
    JobNotPausable,
    JobNotResumable,
    BackpressureExceeded,
    RuntimeShutdown,
    InternalError,
    PermissionDenied,
}

flowcore::simple_display! {
    ErrorCode {
        FlowNotFound => "flow_not_found",
        RoutineNotFound => "routine_not_found",
        SlotNotFound => "slot_not_found",
        EventNotFound => "event_not_found",
        WorkerNotFound => "worker_not_found",
        WorkerAlreadyExists => "worker_already_exists",
        WorkerNotRunning => "worker_not_running",
        WorkerAlreadyCompleted => "worker_already_completed",
        JobNotFound => "job_not_found",
        JobSubmissionFailed => "job_submission_failed",
        JobNotPausable => "job_not_pausable",
        JobNotResumable => "job_not_resumable",
        BackpressureExceeded => "backpressure_exceeded",
        RuntimeShutdown => "runtime_shutdown",
        InternalError => "internal_error",
        PermissionDenied => "permission_denied",
    }
}

impl From<&CoreError> for ErrorCode {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::SlotBackpressureExceeded { .. } => ErrorCode::BackpressureExceeded,
            CoreError::SchemaError { .. } | CoreError::RoutineLogicError(_) => ErrorCode::InternalError,
            CoreError::RoutineNotFound(_) => ErrorCode::RoutineNotFound,
            CoreError::SlotNotFound { .. } => ErrorCode::SlotNotFound,
            CoreError::EventNotFound { .. } => ErrorCode::EventNotFound,
            CoreError::DuplicateRoutineId(_) => ErrorCode::JobSubmissionFailed,
            CoreError::InvalidTransition { .. } => ErrorCode::InternalError,
        }
    }
}

#[cfg(test)]
#[path = "error_code_tests.rs"]
mod tests;
