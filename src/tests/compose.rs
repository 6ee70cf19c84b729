//! Composition tests.
//!
//! Tests that composed sequencers run their parts strictly one after another.

use crate::{Guard, Machine, Sequencer};

use super::common::{enabled_for, labels, record, recorders, start, tick, Trace};

fn part(m: &mut Machine<Trace>, name: &str, steps: usize) -> Sequencer<Trace> {
    Sequencer::from_actions(m, name, recorders(name, steps)).expect("build should succeed")
}

/// Test that `[A, B, C]` with lengths 2, 3, 1 runs in order.
///
/// Verifies:
/// - All six steps run, A's before B's before C's
/// - B is launched only after A reports done, C only after B
/// - The composite reports done only once C's step has run
#[test]
fn parts_run_strictly_in_order() {
    let mut m = Machine::new();
    let a = part(&mut m, "a", 2);
    let b = part(&mut m, "b", 3);
    let c = part(&mut m, "c", 1);
    let abc = Sequencer::compose(&mut m, "abc", vec![a.clone(), b.clone(), c.clone()])
        .expect("build should succeed");
    assert_eq!(abc.width(), 2);

    let mut trace = Trace::default();
    start(&mut m, &abc, &mut trace);

    let mut ticks = 0;
    while abc.is_running(&m) {
        let (a_done, b_done) = (a.is_done(&m), b.is_done(&m));
        let report = tick(&mut m, &mut trace);
        ticks += 1;

        if report.has_fired("abc.launch_1") {
            assert!(a_done, "b launched before a finished");
        }
        if report.has_fired("abc.launch_2") {
            assert!(b_done, "c launched before b finished");
        }
        assert!(ticks <= 9, "composite should finish within nine ticks");
    }

    // Three launches plus six steps.
    assert_eq!(ticks, 9);
    assert_eq!(trace.labels(), ["a0", "a1", "b0", "b1", "b2", "c0"]);
    assert!(a.is_done(&m) && b.is_done(&m) && c.is_done(&m));
}

/// The composite is not done while its last part is still running.
#[test]
fn done_waits_for_last_part() {
    let mut m = Machine::new();
    let a = part(&mut m, "a", 1);
    let z = part(&mut m, "z", 3);
    let az = Sequencer::compose(&mut m, "az", vec![a, z.clone()]).expect("build should succeed");
    let mut trace = Trace::default();

    start(&mut m, &az, &mut trace);
    // launch a, a0, launch z
    for _ in 0..3 {
        tick(&mut m, &mut trace);
    }
    assert_eq!(m.read(az.counter()), Ok(2));
    assert!(z.is_running(&m));
    assert!(!az.is_done(&m));
    assert_eq!(m.try_fire(az.start(), &mut trace), Ok(false));

    assert_eq!(m.run_until(az.done(), &mut trace, 10), Ok(3));
    assert_eq!(trace.labels(), ["a0", "z0", "z1", "z2"]);
}

/// Restarting a finished composite replays the whole chain.
#[test]
fn composite_restarts() {
    let mut m = Machine::new();
    let a = part(&mut m, "a", 2);
    let b = part(&mut m, "b", 1);
    let ab = Sequencer::compose(&mut m, "ab", vec![a, b]).expect("build should succeed");

    let mut first = Trace::default();
    start(&mut m, &ab, &mut first);
    m.run_until(ab.done(), &mut first, 20)
        .expect("run should finish");

    let mut second = Trace::default();
    start(&mut m, &ab, &mut second);
    m.run_until(ab.done(), &mut second, 20)
        .expect("run should finish");

    assert_eq!(first, second);
    assert_eq!(first.labels(), ["a0", "a1", "b0"]);
}

/// Parts stay usable on their own after being composed.
#[test]
fn parts_remain_standalone() {
    let mut m = Machine::new();
    let a = part(&mut m, "a", 2);
    let b = part(&mut m, "b", 2);
    let _ab = Sequencer::compose(&mut m, "ab", vec![a, b.clone()]).expect("build should succeed");
    let mut trace = Trace::default();

    start(&mut m, &b, &mut trace);
    assert_eq!(m.run_until(b.done(), &mut trace, 10), Ok(2));
    assert_eq!(trace.labels(), labels("b", 2));
    assert_eq!(enabled_for(&m, "ab"), 0);
}

/// The same sequencer may appear more than once in the list.
#[test]
fn repeated_part_runs_twice() {
    let mut m = Machine::new();
    let a = part(&mut m, "a", 2);
    let aa = Sequencer::compose(&mut m, "aa", vec![a.clone(), a]).expect("build should succeed");
    let mut trace = Trace::default();

    start(&mut m, &aa, &mut trace);
    m.run_until(aa.done(), &mut trace, 20)
        .expect("run should finish");
    assert_eq!(trace.labels(), ["a0", "a1", "a0", "a1"]);
}

/// Composites compose: `[[A, B], C]` runs like `[A, B, C]`.
#[test]
fn nested_composition() {
    let mut m = Machine::new();
    let a = part(&mut m, "a", 1);
    let b = part(&mut m, "b", 2);
    let c = part(&mut m, "c", 1);
    let ab = Sequencer::compose(&mut m, "ab", vec![a, b]).expect("build should succeed");
    let abc = Sequencer::compose(&mut m, "abc", vec![ab, c]).expect("build should succeed");
    let mut trace = Trace::default();

    start(&mut m, &abc, &mut trace);
    m.run_until(abc.done(), &mut trace, 30)
        .expect("run should finish");
    assert_eq!(trace.labels(), ["a0", "b0", "b1", "c0"]);
}

/// A broken-off part counts as done and lets the next part start.
#[test]
fn broken_part_hands_over() {
    let mut m = Machine::<Trace>::new();
    let early = Sequencer::breakable(&mut m, "early", |brk| {
        record("e0").par(brk) >> record("e1")
    })
    .expect("build should succeed");
    let late = part(&mut m, "late", 1);
    let both = Sequencer::compose(&mut m, "both", vec![early, late]).expect("build should succeed");
    let mut trace = Trace::default();

    start(&mut m, &both, &mut trace);
    m.run_until(both.done(), &mut trace, 20)
        .expect("run should finish");
    assert_eq!(trace.labels(), ["e0", "late0"]);
}

/// Launch rules of one composite are never enabled together.
#[test]
fn one_launch_rule_enabled_per_tick() {
    let mut m = Machine::new();
    let parts: Vec<_> = (0..4).map(|i| part(&mut m, &format!("p{i}"), i + 1)).collect();
    let all = Sequencer::compose(&mut m, "all", parts).expect("build should succeed");
    let mut trace = Trace::default();

    start(&mut m, &all, &mut trace);
    while all.is_running(&m) {
        assert!(enabled_for(&m, "all") <= 1);
        tick(&mut m, &mut trace);
    }
    assert_eq!(trace.events.len(), 1 + 2 + 3 + 4);
}

/// A caller rule restarting a part loses to the launch rule on the tick they
/// meet, and the composite keeps advancing.
#[test]
fn caller_restart_of_part_does_not_stall() {
    let mut m = Machine::<Trace>::new();
    let a = part(&mut m, "a", 1);
    let b = part(&mut m, "b", 1);
    let kick_a = a.start().clone();
    let ab = Sequencer::compose(&mut m, "ab", vec![a, b]).expect("build should succeed");
    m.add_rule("kick_a", Guard::Always, kick_a)
        .expect("add should succeed");
    let mut trace = Trace::default();

    start(&mut m, &ab, &mut trace);
    let report = tick(&mut m, &mut trace);
    assert!(report.has_fired("ab.launch_0"));
    assert!(report.was_blocked("kick_a"));
    assert_eq!(m.read(ab.counter()), Ok(1));

    // kick_a restarts `a` alongside the launch of `b`; a's rules come first.
    assert_eq!(m.run_until(ab.done(), &mut trace, 20), Ok(3));
    assert_eq!(trace.labels(), ["a0", "a0", "b0"]);
}
