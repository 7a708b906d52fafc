// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! flowengine: the scheduler. Consumes `flowcore`'s pure data model and
//! drives it — activation evaluation, firing, error strategy,
//! breakpoints, routed stdout, and the process-wide `Runtime`
//! coordinator (spec §4.7-§4.11, §4.9).

pub mod debug;
pub mod error;
pub mod executor;
pub mod factory;
pub mod idempotency;
pub mod runtime;
pub mod scheduler;
pub mod stdout;
pub mod worker_runtime;

pub use debug::{DebugEvaluator, DisabledEvaluator};
pub use error::{EngineError, EngineResult};
pub use executor::{Executor, FiringOutcome, StrategyDecision};
pub use factory::RoutineFactory;
pub use idempotency::IdempotencyStore;
pub use runtime::Runtime;
pub use stdout::{Fallback, RoutedStdout};
pub use worker_runtime::{CompletionMode, WorkerState};
