// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn view<'a>(slots: &[(&'a str, Vec<Value>)], declared: Vec<&'a str>) -> SlotsView<'a> {
    SlotsView::new(slots.iter().cloned().collect(), declared)
}

#[test]
fn immediate_fires_on_any_new_item() {
    let v = view(&[("a", vec![Value::from(1)])], vec!["a", "b"]);
    let a = Immediate.evaluate(&v, &WorkerLocalState::default());
    assert!(a.should_fire);
}

#[test]
fn immediate_does_not_fire_when_empty() {
    let v = view(&[], vec!["a"]);
    let a = Immediate.evaluate(&v, &WorkerLocalState::default());
    assert!(!a.should_fire);
}

#[test]
fn batch_size_waits_for_n() {
    let policy = BatchSize { slot_name: "a".into(), n: 3 };
    let v = view(&[("a", vec![Value::from(1), Value::from(2)])], vec!["a"]);
    assert!(!policy.evaluate(&v, &WorkerLocalState::default()).should_fire);
    let v = view(&[("a", vec![Value::from(1), Value::from(2), Value::from(3)])], vec!["a"]);
    let act = policy.evaluate(&v, &WorkerLocalState::default());
    assert!(act.should_fire);
    assert_eq!(act.data.get("a").unwrap().len(), 3);
}

#[test]
fn all_slots_ready_requires_every_slot() {
    let policy = AllSlotsReady;
    let v = view(&[("a", vec![Value::from(1)])], vec!["a", "b"]);
    assert!(!policy.evaluate(&v, &WorkerLocalState::default()).should_fire);
    let v = view(&[("a", vec![Value::from(1)]), ("b", vec![Value::from(2)])], vec!["a", "b"]);
    assert!(policy.evaluate(&v, &WorkerLocalState::default()).should_fire);
}

#[test]
fn time_interval_blocks_until_elapsed() {
    let policy = TimeInterval { key: "r".into(), interval: Duration::from_secs(60) };
    let mut state = WorkerLocalState::default();
    state.last_fired_at.insert("r".into(), Instant::now());
    let v = view(&[("a", vec![Value::from(1)])], vec!["a"]);
    assert!(!policy.evaluate(&v, &state).should_fire);
}

#[test]
fn n_of_m_fires_on_threshold() {
    let policy = NOfM { key: "r".into(), threshold: 2, timeout: Duration::from_secs(60) };
    let v = view(&[("a", vec![Value::from(1)]), ("b", vec![Value::from(2)])], vec!["a", "b", "c"]);
    assert!(policy.evaluate(&v, &WorkerLocalState::default()).should_fire);
}

#[test]
fn n_of_m_fires_on_timeout_with_partial_data() {
    let policy = NOfM { key: "r".into(), threshold: 3, timeout: Duration::from_millis(10) };
    let mut state = WorkerLocalState::default();
    state.first_item_at.insert("r".into(), Instant::now() - Duration::from_millis(50));
    let v = view(&[("a", vec![Value::from(1)])], vec!["a", "b", "c"]);
    let act = policy.evaluate(&v, &state);
    assert!(act.should_fire);
    assert_eq!(act.reason, "n_of_m_timeout");
}

#[test]
fn breakpointed_never_fires() {
    let v = view(&[("a", vec![Value::from(1)])], vec!["a"]);
    assert!(!Breakpointed.evaluate(&v, &WorkerLocalState::default()).should_fire);
}

#[test]
fn policy_purity_same_inputs_same_decision() {
    let v1 = view(&[("a", vec![Value::from(1)])], vec!["a"]);
    let v2 = view(&[("a", vec![Value::from(1)])], vec!["a"]);
    let state = WorkerLocalState::default();
    let a1 = Immediate.evaluate(&v1, &state);
    let a2 = Immediate.evaluate(&v2, &state);
    assert_eq!(a1.should_fire, a2.should_fire);
    assert_eq!(a1.reason, a2.reason);
}
