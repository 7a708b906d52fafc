// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport-agnostic control-surface DTOs (spec §6 "Control surface").

use flowcore::{FlowId, JobId, JobStatus, WorkerId};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum WorkerStatus {
    Running,
    Paused,
    Stopped,
}

flowcore::simple_display! {
    WorkerStatus {
        Running => "running",
        Paused => "paused",
        Stopped => "stopped",
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WorkerInfo {
    pub worker_id: WorkerId,
    pub flow_id: FlowId,
    pub status: WorkerStatus,
    pub jobs_processed: u64,
    pub jobs_failed: u64,
    pub active_jobs: usize,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct JobInfo {
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub flow_id: FlowId,
    pub status: JobStatus,
    pub error: Option<String>,
    pub created_at: u64,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BreakpointInfo {
    pub breakpoint_id: String,
    pub job_id: JobId,
    pub enabled: bool,
    pub hit_count: u64,
}

/// Filters accepted by `listWorkers`/`listJobs` (spec §6). Every field is
/// optional and conjunctive.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct WorkerFilters {
    pub flow_id: Option<FlowId>,
    pub status: Option<WorkerStatus>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct JobFilters {
    pub worker_id: Option<WorkerId>,
    pub flow_id: Option<FlowId>,
    pub status: Option<JobStatus>,
}

/// A page of results for `listWorkers`/`listJobs`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn single(items: Vec<T>) -> Self {
        Self { items, next_cursor: None }
    }
}
