//! Scenario tests for sequencers running on a machine.
//!
//! ## Test Organization
//!
//! - `common`: Shared trace context and helpers
//! - `basic`: Basic sequencer runs, restarts, and done observation
//! - `breakable`: Early termination through the break action
//! - `compose`: Chaining sequencers into larger ones
//! - `notation`: Building lists with `>>`, `actions!`, and runtime vectors
//! - `properties`: Property tests over arbitrary lengths
//!
//! ## Test Context
//!
//! Every step action appends its label to a [`Trace`](common::Trace), so a
//! test can compare the exact order in which actions ran.

mod common;

mod compose;
