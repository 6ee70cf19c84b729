//! Common context and helpers for tests.
//!
//! This module contains:
//! - `Trace`: the context every recording action appends to
//! - `record` / `recorders`: step actions that log their label
//! - `tick` / `start`: machine drivers that fail the test on error

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Action, Machine, Sequencer, TickReport};

/// Context recording which actions ran, in order.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Labels of the actions that fired.
    pub events: Vec<Arc<str>>,
}

impl Trace {
    /// Labels as plain strings, for comparisons.
    pub fn labels(&self) -> Vec<String> {
        self.events.iter().map(|e| e.to_string()).collect()
    }
}

/// Action that appends `label` to the trace.
pub fn record(label: impl Into<Arc<str>>) -> Action<Trace> {
    let label: Arc<str> = label.into();
    let event = label.clone();
    Action::new(label, move |trace: &mut Trace| trace.events.push(event.clone()))
}

/// `n` recording actions labelled `{prefix}0 .. {prefix}{n-1}`.
pub fn recorders(prefix: &str, n: usize) -> Vec<Action<Trace>> {
    (0..n).map(|i| record(format!("{prefix}{i}"))).collect()
}

/// The labels `recorders(prefix, n)` produces.
pub fn labels(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

/// Run one tick.
pub fn tick(machine: &mut Machine<Trace>, trace: &mut Trace) -> TickReport {
    machine.tick(trace).expect("tick should succeed")
}

/// Fire `seq`'s start action, which must be enabled.
pub fn start(machine: &mut Machine<Trace>, seq: &Sequencer<Trace>, trace: &mut Trace) {
    let fired = machine
        .try_fire(seq.start(), trace)
        .expect("start should succeed");
    assert!(fired, "start of {} should be enabled", seq.name());
}

/// Number of currently enabled rules owned by `owner`.
pub fn enabled_for(machine: &Machine<Trace>, owner: &str) -> usize {
    machine
        .enabled_rules()
        .iter()
        .filter(|r| r.owner == owner)
        .count()
}
