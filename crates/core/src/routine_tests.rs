// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::policy::Immediate;

fn routine() -> Routine {
    let mut r = Routine::new(RoutineId::new(), "echo", Box::new(Immediate), Arc::new(|_f, _kw| Ok(())));
    r.add_slot("trigger", Some(10));
    r.add_event("out", vec!["data".into()]);
    r
}

#[test]
fn slot_and_event_lookup() {
    let r = routine();
    assert!(r.slot("trigger").is_ok());
    assert!(r.slot("missing").is_err());
    assert!(r.event("out").is_ok());
    assert!(r.event("missing").is_err());
}

#[test]
fn breakpoint_install_and_restore_round_trips() {
    let mut r = routine();
    assert!(!r.is_breakpointed());
    r.install_breakpoint();
    assert!(r.is_breakpointed());
    r.remove_breakpoint();
    assert!(!r.is_breakpointed());
}

#[test]
fn install_breakpoint_is_idempotent_on_the_stash() {
    let mut r = routine();
    r.install_breakpoint();
    r.install_breakpoint();
    r.remove_breakpoint();
    assert!(!r.is_breakpointed());
}

#[test]
fn get_config_falls_back_to_default() {
    let r = routine();
    assert_eq!(r.get_config("missing", Value::from(42)), Value::from(42));
}
