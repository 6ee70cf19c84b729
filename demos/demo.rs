//! Sequencer demo: a device bring-up built from three controllers.
//!
//! Run with: cargo run --example demo

use stepfsm::{Action, BuildError, Machine, Sequencer};

// ============================================================================
// Context
// ============================================================================

#[derive(Debug, Default)]
struct Device {
    powered: bool,
    clock_locked: bool,
    calibrated: u32,
    log: Vec<String>,
}

impl Device {
    fn note(&mut self, line: impl Into<String>) {
        let line = line.into();
        println!("    {line}");
        self.log.push(line);
    }
}

// ============================================================================
// Steps
// ============================================================================

fn power_up() -> Action<Device> {
    Action::new("power_up", |dev: &mut Device| {
        dev.powered = true;
        dev.note("[power] rails up");
    })
}

fn lock_clock() -> Action<Device> {
    Action::new("lock_clock", |dev: &mut Device| {
        dev.clock_locked = true;
        dev.note("[clock] PLL locked");
    })
}

fn release_reset() -> Action<Device> {
    Action::new("release_reset", |dev: &mut Device| {
        dev.note("[reset] released");
    })
}

fn self_test(index: u32) -> Action<Device> {
    Action::new(format!("self_test_{index}"), move |dev: &mut Device| {
        dev.note(format!("[test] block {index} ok"));
    })
}

fn calibrate(channel: u32) -> Action<Device> {
    Action::new(format!("calibrate_{channel}"), move |dev: &mut Device| {
        dev.calibrated += 1;
        dev.note(format!("[cal] channel {channel} trimmed"));
    })
}

// ============================================================================
// Controllers
// ============================================================================

struct BringUp {
    machine: Machine<Device>,
    all: Sequencer<Device>,
}

fn build(abort_tests: bool) -> Result<BringUp, BuildError> {
    let mut machine = Machine::<Device>::new();

    let boot = Sequencer::basic(
        &mut machine,
        "boot",
        power_up() >> lock_clock() >> release_reset(),
    )?;

    // The second self-test block aborts the run when asked to.
    let tests = Sequencer::breakable(&mut machine, "tests", |brk| {
        let second = if abort_tests {
            self_test(1).par(brk)
        } else {
            self_test(1)
        };
        self_test(0) >> second >> self_test(2)
    })?;

    let cal = Sequencer::from_actions(&mut machine, "cal", (0..4).map(calibrate))?;

    let all = Sequencer::compose(&mut machine, "bring_up", vec![boot, tests, cal])?;
    Ok(BringUp { machine, all })
}

fn run(title: &str, abort_tests: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("{title}");
    println!("{}", "-".repeat(title.len()));

    let BringUp { mut machine, all } = build(abort_tests)?;
    let mut dev = Device::default();

    machine.try_fire(all.start(), &mut dev)?;
    let ticks = machine.run_until(all.done(), &mut dev, 64)?;

    println!(
        "  done after {ticks} ticks ({} actions): powered={} clock={} calibrated={}",
        dev.log.len(),
        dev.powered,
        dev.clock_locked,
        dev.calibrated
    );
    println!(
        "  start offered again: {}\n",
        machine.is_true(all.start().guard())
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║           stepfsm Sequencer Demo                            ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Scenario 1: every step runs in order.
    run("Scenario 1: full bring-up", false)?;

    // Scenario 2: the self-test breaks out after its second block.
    run("Scenario 2: self-test aborts early", true)?;

    // The generated rules are the controller.
    let BringUp { machine, .. } = build(false)?;
    println!("Generated rules");
    println!("---------------");
    for set in machine.rule_sets() {
        print!("{set}");
    }
    Ok(())
}
