//! Step counter allocation.

use crate::machine::Machine;
use crate::register::{Reg, MAX_WIDTH};
use crate::sequencer::BuildError;

/// Smallest width `w` with `steps < 2^w`.
///
/// Searches upward from one bit, so the result is minimal: no narrower
/// counter can hold the terminal value `steps`.
pub fn counter_width(steps: usize) -> u32 {
    let mut width = 1;
    while width < MAX_WIDTH && (steps as u64) >> width != 0 {
        width += 1;
    }
    width
}

/// Allocate the counter for a sequence of `steps` steps.
///
/// The counter starts at `steps`, the terminal value, so a sequencer that was
/// never started reports done. `steps` is also the counter's bound.
pub fn alloc_counter<Ctx>(
    machine: &mut Machine<Ctx>,
    owner: &str,
    steps: usize,
) -> Result<Reg, BuildError> {
    if steps == 0 {
        return Err(BuildError::EmptySequence {
            name: owner.to_string(),
        });
    }
    let width = counter_width(steps);
    let terminal = steps as u64;
    Ok(machine.alloc_bounded(format!("{owner}.counter"), width, terminal, terminal)?)
}
