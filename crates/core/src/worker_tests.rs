// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generate_has_prefix() {
    let id = WorkerId::generate();
    assert!(id.as_str().starts_with("wrk-"));
}

#[test]
fn explicit_id_preserved_verbatim() {
    let id = WorkerId::new("my-worker");
    assert_eq!(id.as_str(), "my-worker");
}

#[test]
fn hashmap_lookup_via_borrow() {
    use std::collections::HashMap;
    let mut m = HashMap::new();
    m.insert(WorkerId::new("w1"), 1);
    assert_eq!(m.get("w1"), Some(&1));
}
