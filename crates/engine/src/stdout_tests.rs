// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn write_inside_scope_is_attributed_to_bound_job() {
    let sink = RoutedStdout::new(1_000, Fallback::Discard);
    let job_id = JobId::new();
    sink.scoped(job_id, || sink.write("hello", 1));
    assert_eq!(sink.get_buffer(job_id), "hello");
}

#[test]
fn two_concurrent_jobs_stay_isolated() {
    let sink = RoutedStdout::new(1_000, Fallback::Discard);
    let j1 = JobId::new();
    let j2 = JobId::new();
    sink.scoped(j1, || sink.write("from-j1", 1));
    sink.scoped(j2, || sink.write("from-j2", 2));
    assert_eq!(sink.get_buffer(j1), "from-j1");
    assert_eq!(sink.get_buffer(j2), "from-j2");
}

#[test]
fn write_outside_scope_discards_by_default() {
    let sink = RoutedStdout::new(1_000, Fallback::Discard);
    sink.write("lost", 1);
}

#[test]
fn pop_chunks_is_consuming() {
    let sink = RoutedStdout::new(1_000, Fallback::Discard);
    let job_id = JobId::new();
    sink.scoped(job_id, || sink.write("chunk", 1));
    assert_eq!(sink.pop_chunks(job_id), vec!["chunk".to_string()]);
    assert!(sink.pop_chunks(job_id).is_empty());
}

#[test]
fn buffer_trims_oldest_past_cap() {
    let sink = RoutedStdout::new(5, Fallback::Discard);
    let job_id = JobId::new();
    sink.scoped(job_id, || {
        sink.write("abcde", 1);
        sink.write("fgh", 2);
    });
    assert_eq!(sink.get_buffer(job_id), "defgh");
}

#[test]
fn sweep_removes_stale_jobs() {
    let sink = RoutedStdout::new(1_000, Fallback::Discard);
    let job_id = JobId::new();
    sink.jobs.lock().insert(job_id, JobOutput { buffer: "x".into(), chunks: VecDeque::new(), last_write_ms: 0 });
    sink.sweep(10_000, 1_000);
    assert_eq!(sink.get_buffer(job_id), "");
}
