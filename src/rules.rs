//! Step rule generation.
//!
//! One rule per step `i`: when `cond && counter == i`, advance the counter to
//! `i + 1` and fire `action[i]` in the same tick. The counter values are
//! distinct, so the generated rules are mutually exclusive by construction.
//! At `counter == len` no rule is enabled and the sequence is idle.

use crate::action::{Action, Guard};
use crate::machine::{Rule, RuleSet};
use crate::register::Reg;

/// Name of the rule that runs step `index` of `owner`.
pub fn step_rule_name(owner: &str, index: usize) -> String {
    format!("{owner}.step_{index}")
}

/// Build the step rules for `actions`, all additionally gated on `cond`.
pub fn step_rules<Ctx: 'static>(
    owner: &str,
    counter: &Reg,
    actions: Vec<Action<Ctx>>,
    cond: &Guard,
) -> RuleSet<Ctx> {
    let mut rules = RuleSet::new(owner);
    for (index, action) in actions.into_iter().enumerate() {
        let guard = cond.clone() & Guard::equals(counter, index as u64);
        let advance = Action::write(counter, index as u64 + 1);
        rules.push(Rule::new(
            step_rule_name(owner, index),
            guard,
            advance.par(action),
        ));
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::alloc_counter;
    use crate::machine::Machine;

    #[test]
    fn one_rule_per_step() {
        let mut m = Machine::<()>::new();
        let c = alloc_counter(&mut m, "s", 3).expect("alloc should succeed");
        let actions = vec![Action::<()>::noop(), Action::noop(), Action::noop()];

        let rules = step_rules("s", &c, actions, &Guard::Always);
        assert_eq!(rules.len(), 3);
        assert_eq!(rules.owner(), "s");

        let listing: Vec<String> = rules.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            listing,
            [
                "rule s.step_0: when s.counter == 0 do s.counter := 1",
                "rule s.step_1: when s.counter == 1 do s.counter := 2",
                "rule s.step_2: when s.counter == 2 do s.counter := 3",
            ]
        );
    }

    #[test]
    fn condition_gates_every_rule() {
        let mut m = Machine::<()>::new();
        let flag = m.alloc("s.enable", 1, 0).expect("alloc should succeed");
        let c = alloc_counter(&mut m, "s", 2).expect("alloc should succeed");

        let actions = vec![Action::<()>::noop(), Action::noop()];
        let rules = step_rules("s", &c, actions, &Guard::is_set(&flag));
        for rule in rules.iter() {
            assert!(rule.condition().registers().contains(&&flag));
            assert_eq!(rule.action().targets(), [c.clone()]);
        }
    }

    #[test]
    fn guards_are_disjoint() {
        let mut m = Machine::<()>::new();
        let c = alloc_counter(&mut m, "s", 5).expect("alloc should succeed");
        let rules = step_rules("s", &c, vec![Action::<()>::noop(); 5], &Guard::Always);

        for value in 0..=5 {
            m.try_fire(&Action::write(&c, value), &mut ())
                .expect("fire should succeed");
            let enabled = rules
                .iter()
                .filter(|r| r.is_enabled(m.registers()))
                .count();
            assert_eq!(enabled, usize::from(value < 5));
        }
    }
}
