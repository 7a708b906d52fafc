// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed runtime configuration (spec §6 "Environment/config").
//!
//! No free-form environment reads happen in this crate; an adapter
//! constructs this record however it likes (env vars, a config file, CLI
//! flags) and passes it in. `auth_required`/`rate_limit_per_minute` are
//! carried as data for an adapter to enforce; the core never reads them.

use std::time::Duration;

/// Process-wide knobs for the runtime, matching spec §6 exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// 0 means "shared ambient pool"; otherwise a dedicated pool of this
    /// size is created per worker.
    pub shared_pool_size: usize,
    pub default_job_ttl: Duration,
    pub default_history_cap: usize,
    pub default_stdout_buffer_cap: usize,
    pub idempotency_ttl: Duration,
    pub auth_required: bool,
    pub rate_limit_per_minute: Option<u32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            shared_pool_size: 0,
            default_job_ttl: Duration::from_secs(60 * 60),
            default_history_cap: 1_000,
            default_stdout_buffer_cap: 200_000,
            idempotency_ttl: Duration::from_secs(24 * 60 * 60),
            auth_required: false,
            rate_limit_per_minute: None,
        }
    }
}

impl RuntimeConfig {
    crate::setters! {
        set {
            shared_pool_size: usize,
            default_history_cap: usize,
            default_stdout_buffer_cap: usize,
            auth_required: bool,
            default_job_ttl: Duration,
            idempotency_ttl: Duration,
        }
        option { rate_limit_per_minute: u32 }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
