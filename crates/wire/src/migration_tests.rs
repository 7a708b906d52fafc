// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn rejects_backward_or_equal_versions() {
    let mut reg = MigrationRegistry::new();
    assert!(matches!(reg.register(2, 1, |d| d), Err(MigrationError::NotForward { .. })));
    assert!(matches!(reg.register(1, 1, |d| d), Err(MigrationError::NotForward { .. })));
}

#[test]
fn rejects_duplicate_registration() {
    let mut reg = MigrationRegistry::new();
    reg.register(1, 2, |d| d).unwrap();
    assert!(matches!(reg.register(1, 2, |d| d), Err(MigrationError::Duplicate { .. })));
}

#[test]
fn walks_chain_to_target_version() {
    let mut reg = MigrationRegistry::new();
    reg.register(1, 2, |mut d| {
        d["version"] = json!(2);
        d["added_in_v2"] = json!(true);
        d
    })
    .unwrap();
    reg.register(2, 3, |mut d| {
        d["version"] = json!(3);
        d
    })
    .unwrap();
    let migrated = reg.migrate(json!({"version": 1}), 1, 3).unwrap();
    assert_eq!(migrated["version"], json!(3));
    assert_eq!(migrated["added_in_v2"], json!(true));
}

#[test]
fn missing_hop_in_chain_errors() {
    let reg = MigrationRegistry::new();
    assert!(matches!(reg.migrate(json!({}), 1, 2), Err(MigrationError::NoPath { .. })));
}

#[test]
fn no_op_when_already_at_target() {
    let reg = MigrationRegistry::new();
    let doc = json!({"version": 3});
    assert_eq!(reg.migrate(doc.clone(), 3, 3).unwrap(), doc);
}
