// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_match_spec() {
    let cfg = RuntimeConfig::default();
    assert_eq!(cfg.shared_pool_size, 0);
    assert_eq!(cfg.default_job_ttl, Duration::from_secs(3600));
    assert_eq!(cfg.default_history_cap, 1_000);
    assert_eq!(cfg.default_stdout_buffer_cap, 200_000);
    assert_eq!(cfg.idempotency_ttl, Duration::from_secs(86_400));
    assert!(!cfg.auth_required);
    assert_eq!(cfg.rate_limit_per_minute, None);
}

#[test]
fn setters_chain() {
    let cfg = RuntimeConfig::default()
        .shared_pool_size(4)
        .auth_required(true)
        .rate_limit_per_minute(60u32);
    assert_eq!(cfg.shared_pool_size, 4);
    assert!(cfg.auth_required);
    assert_eq!(cfg.rate_limit_per_minute, Some(60));
}
