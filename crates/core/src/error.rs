// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core error taxonomy, matching spec §7.

use thiserror::Error;

/// Errors raised by the pure data-model layer (slots, events, flow graph,
/// job status transitions). Scheduling/execution errors live in
/// `flowengine::error::EngineError` and wrap these where relevant.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("slot '{slot}' on routine {routine_id} exceeded max_queue={max_queue}")]
    SlotBackpressureExceeded {
        routine_id: String,
        slot: String,
        max_queue: usize,
    },

    #[error("event '{event}' on routine {routine_id}: {detail}")]
    SchemaError {
        routine_id: String,
        event: String,
        detail: String,
    },

    #[error("routine {0} not found in flow")]
    RoutineNotFound(String),

    #[error("slot '{slot}' not found on routine {routine_id}")]
    SlotNotFound { routine_id: String, slot: String },

    #[error("event '{event}' not found on routine {routine_id}")]
    EventNotFound { routine_id: String, event: String },

    #[error("routine id {0} already present in flow")]
    DuplicateRoutineId(String),

    #[error("invalid job status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("routine logic error: {0}")]
    RoutineLogicError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
