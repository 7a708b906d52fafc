// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::policy::Immediate;
use std::sync::Arc;

fn routine(name: &str) -> Routine {
    let mut r = Routine::new(RoutineId::new(), name, Box::new(Immediate), Arc::new(|_f, _kw| Ok(())));
    r.add_slot("trigger", None);
    r.add_event("out", vec!["data".into()]);
    r
}

#[test]
fn add_routine_rejects_duplicate_ids() {
    let mut flow = Flow::new(None);
    let r1 = routine("a");
    let id = r1.id;
    flow.add_routine(r1).unwrap();
    let mut r2 = routine("b");
    r2.id = id;
    assert!(flow.add_routine(r2).is_err());
}

#[test]
fn connect_validates_event_and_slot_existence() {
    let mut flow = Flow::new(None);
    let a = flow.add_routine(routine("a")).unwrap();
    let b = flow.add_routine(routine("b")).unwrap();
    assert!(flow.connect(a, "missing", b, "trigger", None).is_err());
    assert!(flow.connect(a, "out", b, "missing", None).is_err());
    assert!(flow.connect(a, "out", b, "trigger", None).is_ok());
}

#[test]
fn cyclic_graph_is_allowed() {
    let mut flow = Flow::new(None);
    let a = flow.add_routine(routine("a")).unwrap();
    let b = flow.add_routine(routine("b")).unwrap();
    flow.connect(a, "out", b, "trigger", None).unwrap();
    flow.connect(b, "out", a, "trigger", None).unwrap();
    assert_eq!(flow.connections().count(), 2);
}

#[test]
fn connections_from_filters_by_source() {
    let mut flow = Flow::new(None);
    let a = flow.add_routine(routine("a")).unwrap();
    let b = flow.add_routine(routine("b")).unwrap();
    let c = flow.add_routine(routine("c")).unwrap();
    flow.connect(a, "out", b, "trigger", None).unwrap();
    flow.connect(a, "out", c, "trigger", None).unwrap();
    assert_eq!(flow.connections_from(a, "out").len(), 2);
    assert_eq!(flow.connections_from(b, "out").len(), 0);
}
