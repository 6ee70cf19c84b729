#![deny(missing_docs)]

//! stepfsm: sequencing state machines built from ordered action lists.
//!
//! # Design Goals
//!
//! stepfsm turns a fixed list of atomic actions into a small controller that
//! runs one action per synchronous tick:
//!
//! - **Minimal state**: the step counter is exactly as wide as the step count requires
//! - **Disjoint rules**: one guarded rule per step, mutually exclusive by counter value
//! - **Non-empty by construction**: empty static lists are compile errors
//! - **Composition by observation**: sequencers chain through `start` and `done` only
//!
//! # Core Concepts
//!
//! - [`Machine`]: register file plus the tick scheduler that fires enabled rules
//! - [`Action`] and [`Guard`]: deferred effects and the conditions that enable them
//! - [`Sequencer`]: the generated controller exposing `start`, `done`, `check_done`
//!
//! ```
//! use stepfsm::{Action, Machine, Sequencer};
//!
//! let mut machine = Machine::<Vec<&'static str>>::new();
//! let seq = Sequencer::basic(
//!     &mut machine,
//!     "boot",
//!     Action::new("power", |log: &mut Vec<_>| log.push("power"))
//!         >> Action::new("clock", |log: &mut Vec<_>| log.push("clock"))
//!         >> Action::new("reset", |log: &mut Vec<_>| log.push("reset")),
//! )
//! .unwrap();
//!
//! let mut log = Vec::new();
//! machine.try_fire(seq.start(), &mut log).unwrap();
//! let ticks = machine.run_until(seq.done(), &mut log, 10).unwrap();
//!
//! assert_eq!(ticks, 3);
//! assert_eq!(log, ["power", "clock", "reset"]);
//! ```

// Modules
pub mod action;
pub mod counter;
pub mod hlist;
pub mod machine;
mod macros;
pub mod register;
pub mod rules;
pub mod sequencer;

// Re-exports for convenience
pub use action::{Action, Effects, Guard};
pub use counter::{alloc_counter, counter_width};
pub use hlist::{ActionList, ActionVec, Append, FixedLen, HCons, HNil, HSingle};
pub use machine::{EnabledRule, Machine, MachineError, Rule, RuleSet, TickReport};
pub use register::{Reg, Registers};
pub use rules::step_rules;
pub use sequencer::{BuildError, Sequencer};

#[cfg(test)]
mod tests;
