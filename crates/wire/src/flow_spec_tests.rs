// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flowcore::{Immediate, Routine, RoutineId};
use std::sync::Arc;

fn sample_flow() -> Flow {
    let mut flow = Flow::new(Some("sample".into()));
    let mut echo = Routine::new(RoutineId::new(), "echo", Box::new(Immediate), Arc::new(|_f, _kw| Ok(())));
    echo.add_slot("trigger", None);
    echo.add_event("out", vec!["data".into()]);
    let echo_id = flow.add_routine(echo).unwrap();

    let mut printer = Routine::new(RoutineId::new(), "printer", Box::new(Immediate), Arc::new(|_f, _kw| Ok(())));
    printer.add_slot("input", None);
    let printer_id = flow.add_routine(printer).unwrap();

    flow.connect(echo_id, "out", printer_id, "input", None).unwrap();
    flow
}

#[test]
fn from_flow_round_trips_connection_shape() {
    let flow = sample_flow();
    let spec = FlowSpec::from_flow(&flow);
    assert_eq!(spec.version, CURRENT_VERSION);
    assert_eq!(spec.routines.len(), 2);
    assert_eq!(spec.connections.len(), 1);
    let conn = &spec.connections[0];
    assert!(conn.from.ends_with(".out"));
    assert!(conn.to.ends_with(".input"));
}

#[test]
fn connection_spec_parses_source_and_target() {
    let spec = ConnectionSpec { from: "rtn-1.out".into(), to: "rtn-2.input".into(), mapping: None };
    assert_eq!(spec.source_parts(), Some(("rtn-1", "out")));
    assert_eq!(spec.target_parts(), Some(("rtn-2", "input")));
}

#[test]
fn serializes_to_json_and_back() {
    let flow = sample_flow();
    let spec = FlowSpec::from_flow(&flow);
    let json = serde_json::to_value(&spec).unwrap();
    let parsed: FlowSpec = serde_json::from_value(json).unwrap();
    assert_eq!(parsed.routines.len(), spec.routines.len());
}
