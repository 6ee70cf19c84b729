//! Sequencers: step controllers built from action lists.
//!
//! A [`Sequencer`] owns a step counter (and, for the breakable variant, an
//! enable flag) inside a [`Machine`], registers one rule per step, and hands
//! back three handles:
//!
//! - `start`: an action that begins a new run; enabled only when done
//! - `done`: a guard that holds exactly when no run is in progress
//! - `check_done`: a no-op action enabled only when done
//!
//! Sequencers compose by observation: [`Sequencer::compose`] starts each
//! sub-sequencer once its predecessor reports done, without touching their
//! counters.

use std::sync::Arc;

use crate::action::{Action, Guard};
use crate::counter::alloc_counter;
use crate::hlist::{ActionList, ActionVec};
use crate::machine::{Machine, MachineError, Rule, RuleSet};
use crate::register::Reg;
use crate::rules::step_rules;

/// Errors that can occur while building a sequencer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Every sequencer needs at least one step.
    #[error("Sequence {name} has no steps")]
    EmptySequence {
        /// Name of the sequencer being built.
        name: String,
    },

    /// Allocating state or registering rules failed.
    #[error(transparent)]
    Machine(#[from] MachineError),
}

/// Handle to a constructed sequencer.
///
/// Cheap to clone; clones refer to the same registers and rules.
pub struct Sequencer<Ctx> {
    name: Arc<str>,
    len: usize,
    counter: Reg,
    enable: Option<Reg>,
    start: Action<Ctx>,
    done: Guard,
    check_done: Action<Ctx>,
}

impl<Ctx> Clone for Sequencer<Ctx> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            len: self.len,
            counter: self.counter.clone(),
            enable: self.enable.clone(),
            start: self.start.clone(),
            done: self.done.clone(),
            check_done: self.check_done.clone(),
        }
    }
}

impl<Ctx> std::fmt::Debug for Sequencer<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("name", &self.name)
            .field("len", &self.len)
            .field("counter", &self.counter)
            .field("enable", &self.enable)
            .field("done", &self.done)
            .finish()
    }
}

impl<Ctx> Sequencer<Ctx> {
    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of steps (sub-sequencers, for a composed sequencer).
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; empty sequencers cannot be built.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Width of the step counter in bits.
    pub fn width(&self) -> u32 {
        self.counter.width()
    }

    /// The step counter register.
    pub fn counter(&self) -> &Reg {
        &self.counter
    }

    /// The enable flag, for breakable sequencers.
    pub fn enable_flag(&self) -> Option<&Reg> {
        self.enable.as_ref()
    }

    /// Action that begins a new run. Enabled only when [`done`](Self::done) holds.
    pub fn start(&self) -> &Action<Ctx> {
        &self.start
    }

    /// Holds exactly when no run is in progress.
    pub fn done(&self) -> &Guard {
        &self.done
    }

    /// No-op action enabled only when done.
    pub fn check_done(&self) -> &Action<Ctx> {
        &self.check_done
    }

    /// Read the done signal from `machine`.
    pub fn is_done(&self, machine: &Machine<Ctx>) -> bool {
        machine.is_true(&self.done)
    }

    /// Returns `true` while a run is in progress.
    pub fn is_running(&self, machine: &Machine<Ctx>) -> bool {
        !self.is_done(machine)
    }
}

impl<Ctx: 'static> Sequencer<Ctx> {
    /// Build a sequencer that runs `list` one step per tick.
    pub fn basic<L>(
        machine: &mut Machine<Ctx>,
        name: impl Into<Arc<str>>,
        list: L,
    ) -> Result<Self, BuildError>
    where
        L: ActionList<Ctx>,
    {
        let name = name.into();
        let actions = list.into_actions();
        let steps = actions.len();
        let counter = alloc_counter(machine, &name, steps)?;
        machine.add_rules(step_rules(&name, &counter, actions, &Guard::Always))?;

        let done = Guard::equals(&counter, steps as u64);
        let start = Action::write(&counter, 0)
            .named(format!("{name}.start"))
            .when(done.clone());

        #[cfg(feature = "tracing")]
        tracing::info!(name = &*name, steps, width = counter.width(), "seq.build");

        Ok(Self::assemble(name, steps, counter, None, start, done))
    }

    /// Build a sequencer from a list whose length is only known at runtime.
    pub fn from_actions(
        machine: &mut Machine<Ctx>,
        name: impl Into<Arc<str>>,
        actions: impl IntoIterator<Item = Action<Ctx>>,
    ) -> Result<Self, BuildError> {
        let name = name.into();
        match ActionVec::new(actions) {
            Some(list) => Self::basic(machine, name, list),
            None => Err(BuildError::EmptySequence {
                name: name.to_string(),
            }),
        }
    }

    /// Build a sequencer whose steps may stop the run early.
    ///
    /// `body` receives the break action and returns the step list. When a
    /// step that includes the break action fires, the enable flag clears in
    /// the same tick: no later step runs and the sequencer reports done. A
    /// subsequent `start` re-arms the flag and runs again from step 0.
    pub fn breakable<L, F>(
        machine: &mut Machine<Ctx>,
        name: impl Into<Arc<str>>,
        body: F,
    ) -> Result<Self, BuildError>
    where
        L: ActionList<Ctx>,
        F: FnOnce(Action<Ctx>) -> L,
    {
        let name = name.into();
        let enable = machine.alloc(format!("{name}.enable"), 1, 0)?;
        let brk = Action::write(&enable, 0).named(format!("{name}.break"));

        let actions = body(brk).into_actions();
        let steps = actions.len();
        let counter = alloc_counter(machine, &name, steps)?;
        let running = Guard::is_set(&enable);
        machine.add_rules(step_rules(&name, &counter, actions, &running))?;

        let ready = !running | Guard::equals(&counter, steps as u64);
        let start = Action::write(&enable, 1)
            .par(Action::write(&counter, 0))
            .named(format!("{name}.start"))
            .when(ready.clone());

        #[cfg(feature = "tracing")]
        tracing::info!(
            name = &*name,
            steps,
            width = counter.width(),
            breakable = true,
            "seq.build"
        );

        Ok(Self::assemble(name, steps, counter, Some(enable), start, ready))
    }

    /// Chain `seqs` into one sequencer that runs them back to back.
    ///
    /// Sub-sequencer `i + 1` is started only once sub-sequencer `i` reports
    /// done. The composite is done when the last one has been started and has
    /// finished. Sub-sequencers keep their own counters and remain usable on
    /// their own.
    pub fn compose(
        machine: &mut Machine<Ctx>,
        name: impl Into<Arc<str>>,
        seqs: Vec<Sequencer<Ctx>>,
    ) -> Result<Self, BuildError> {
        let name = name.into();
        let Some(last) = seqs.last() else {
            return Err(BuildError::EmptySequence {
                name: name.to_string(),
            });
        };
        let count = seqs.len();
        let outer = alloc_counter(machine, &name, count)?;

        let mut rules = RuleSet::new(name.clone());
        // The first sub-sequencer's predecessor is always done.
        let mut prev_done = Guard::Always;
        for (index, seq) in seqs.iter().enumerate() {
            let guard = Guard::equals(&outer, index as u64) & prev_done;
            let launch = Action::write(&outer, index as u64 + 1).par(seq.start.clone());
            rules.push(Rule::new(format!("{name}.launch_{index}"), guard, launch));
            prev_done = seq.done.clone();
        }
        machine.add_rules(rules)?;

        let done = Guard::equals(&outer, count as u64) & last.done.clone();
        let start = Action::write(&outer, 0)
            .named(format!("{name}.start"))
            .when(done.clone());

        #[cfg(feature = "tracing")]
        tracing::info!(name = &*name, parts = count, width = outer.width(), "seq.build");

        Ok(Self::assemble(name, count, outer, None, start, done))
    }

    fn assemble(
        name: Arc<str>,
        len: usize,
        counter: Reg,
        enable: Option<Reg>,
        start: Action<Ctx>,
        done: Guard,
    ) -> Self {
        let check_done = Action::noop()
            .named(format!("{name}.check_done"))
            .when(done.clone());
        Self {
            name,
            len,
            counter,
            enable,
            start,
            done,
            check_done,
        }
    }
}
