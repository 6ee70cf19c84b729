//! The host machine: register file, rule table, and the tick scheduler.
//!
//! Every tick evaluates all rule guards against the current register values,
//! picks the rules to fire, runs them, and then commits the buffered register
//! writes atomically. Rules are picked in registration order; an enabled rule
//! whose write targets overlap those of an earlier pick is blocked for that
//! tick and none of its effects run. Rules generated for one sequencer are
//! guarded by disjoint counter values, so at most one of them is enabled in
//! any tick; [`Machine::enabled_rules`] exposes the data needed to check that.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::{Action, Guard};
use crate::register::{Reg, Registers};

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by the host machine.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    /// Register widths must be between 1 and 64 bits.
    #[error("Invalid register width: {width}")]
    InvalidWidth {
        /// The rejected width.
        width: u32,
    },

    /// A value does not fit in the target register.
    #[error("Value {value} does not fit in {width}-bit register {register}")]
    ValueOutOfRange {
        /// Register name.
        register: String,
        /// Value that was written.
        value: u64,
        /// Register width in bits.
        width: u32,
    },

    /// A register handle that does not belong to this machine.
    #[error("Unknown register: {0}")]
    UnknownRegister(String),

    /// A value exceeds the bound the register was allocated with.
    #[error("Value {value} exceeds bound {max} of register {register}")]
    AboveBound {
        /// Register name.
        register: String,
        /// Value that was written.
        value: u64,
        /// Largest value the register may hold.
        max: u64,
    },

    /// An action wrote a register it did not declare as a target.
    #[error("Action {action} writes undeclared register {register}")]
    UndeclaredWrite {
        /// Action name.
        action: String,
        /// Register written.
        register: String,
    },

    /// `run_until` gave up before its condition held.
    #[error("Condition not reached within {max_ticks} ticks")]
    TickLimit {
        /// The bound that was exhausted.
        max_ticks: u64,
    },

    /// A snapshot does not match this machine's register layout.
    #[error("Snapshot layout does not match machine registers")]
    LayoutMismatch,
}

// ============================================================================
// Rules
// ============================================================================

/// A guarded transition: fires `action` in every tick where `guard` and the
/// action's implicit condition both hold.
pub struct Rule<Ctx> {
    name: Arc<str>,
    guard: Guard,
    action: Action<Ctx>,
}

impl<Ctx> Clone for Rule<Ctx> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            guard: self.guard.clone(),
            action: self.action.clone(),
        }
    }
}

impl<Ctx> std::fmt::Debug for Rule<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("guard", &self.guard)
            .field("action", &self.action)
            .finish()
    }
}

impl<Ctx> Rule<Ctx> {
    /// Create a rule.
    pub fn new(name: impl Into<Arc<str>>, guard: Guard, action: Action<Ctx>) -> Self {
        Self {
            name: name.into(),
            guard,
            action,
        }
    }

    /// Rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit guard, without the action's implicit condition.
    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// The action fired by this rule.
    pub fn action(&self) -> &Action<Ctx> {
        &self.action
    }

    /// Full firing condition: explicit guard and implicit condition.
    pub fn condition(&self) -> Guard {
        self.guard.clone().and(self.action.guard().clone())
    }

    /// Returns `true` if this rule would fire against `regs`.
    pub fn is_enabled(&self, regs: &Registers) -> bool {
        self.guard.eval(regs) && self.action.is_enabled(regs)
    }
}

impl<Ctx> std::fmt::Display for Rule<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rule {}: when {} do {}",
            self.name,
            self.condition(),
            self.action.name()
        )
    }
}

/// The set of rules one generator produced, tagged with its owner.
pub struct RuleSet<Ctx> {
    owner: Arc<str>,
    rules: Vec<Rule<Ctx>>,
}

impl<Ctx> std::fmt::Debug for RuleSet<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("owner", &self.owner)
            .field("rules", &self.rules)
            .finish()
    }
}

impl<Ctx> RuleSet<Ctx> {
    /// Create an empty rule set owned by `owner`.
    pub fn new(owner: impl Into<Arc<str>>) -> Self {
        Self {
            owner: owner.into(),
            rules: Vec::new(),
        }
    }

    /// Owner name.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Append a rule.
    pub fn push(&mut self, rule: Rule<Ctx>) {
        self.rules.push(rule);
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate rules in firing order.
    pub fn iter(&self) -> std::slice::Iter<'_, Rule<Ctx>> {
        self.rules.iter()
    }
}

impl<Ctx> std::fmt::Display for RuleSet<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Tick Report
// ============================================================================

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Index of the tick, counting from zero.
    pub tick: u64,
    /// Names of the rules that fired, in firing order.
    pub fired: Vec<Arc<str>>,
    /// Enabled rules that did not fire because an earlier rule claimed one of
    /// their write targets.
    pub blocked: Vec<Arc<str>>,
}

impl TickReport {
    /// Returns `true` if no rule fired.
    pub fn is_idle(&self) -> bool {
        self.fired.is_empty()
    }

    /// Returns `true` if the named rule fired.
    pub fn has_fired(&self, rule: &str) -> bool {
        self.fired.iter().any(|name| &**name == rule)
    }

    /// Returns `true` if the named rule was enabled but blocked.
    pub fn was_blocked(&self, rule: &str) -> bool {
        self.blocked.iter().any(|name| &**name == rule)
    }
}

/// A rule whose condition currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnabledRule<'a> {
    /// Owner of the rule set the rule came from.
    pub owner: &'a str,
    /// Rule name.
    pub rule: &'a str,
}

// ============================================================================
// Machine
// ============================================================================

/// Register file plus every registered rule set.
pub struct Machine<Ctx> {
    registers: Registers,
    rule_sets: Vec<RuleSet<Ctx>>,
    ticks: u64,
}

impl<Ctx> Default for Machine<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> std::fmt::Debug for Machine<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("registers", &self.registers)
            .field("rule_sets", &self.rule_sets.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl<Ctx> Machine<Ctx> {
    /// Create a machine with no registers and no rules.
    pub fn new() -> Self {
        Self {
            registers: Registers::new(),
            rule_sets: Vec::new(),
            ticks: 0,
        }
    }

    /// Allocate a register.
    pub fn alloc(
        &mut self,
        name: impl Into<Arc<str>>,
        width: u32,
        init: u64,
    ) -> Result<Reg, MachineError> {
        self.registers.alloc(name, width, init)
    }

    /// Allocate a register whose value never exceeds `max`.
    pub fn alloc_bounded(
        &mut self,
        name: impl Into<Arc<str>>,
        width: u32,
        init: u64,
        max: u64,
    ) -> Result<Reg, MachineError> {
        self.registers.alloc_bounded(name, width, init, max)
    }

    /// Register a generated rule set.
    ///
    /// Every register read by the set's guards or written by its actions must
    /// belong to this machine.
    pub fn add_rules(&mut self, rules: RuleSet<Ctx>) -> Result<(), MachineError> {
        for rule in rules.iter() {
            let condition = rule.condition();
            let used = condition.registers().into_iter().chain(rule.action.targets());
            for reg in used {
                if self.registers.get(reg).is_none() {
                    return Err(MachineError::UnknownRegister(reg.name().to_string()));
                }
            }
        }
        self.rule_sets.push(rules);
        Ok(())
    }

    /// Register a single caller-defined rule under its own name.
    pub fn add_rule(
        &mut self,
        name: impl Into<Arc<str>>,
        guard: Guard,
        action: Action<Ctx>,
    ) -> Result<(), MachineError> {
        let name = name.into();
        let mut set = RuleSet::new(name.clone());
        set.push(Rule::new(name, guard, action));
        self.add_rules(set)
    }

    /// Current value of `reg`.
    pub fn read(&self, reg: &Reg) -> Result<u64, MachineError> {
        self.registers
            .get(reg)
            .ok_or_else(|| MachineError::UnknownRegister(reg.name().to_string()))
    }

    /// Evaluate `guard` against the current register values.
    pub fn is_true(&self, guard: &Guard) -> bool {
        guard.eval(&self.registers)
    }

    /// The register file.
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// All registered rule sets, in registration order.
    pub fn rule_sets(&self) -> &[RuleSet<Ctx>] {
        &self.rule_sets
    }

    /// Rules whose condition holds right now.
    pub fn enabled_rules(&self) -> Vec<EnabledRule<'_>> {
        let regs = &self.registers;
        self.rule_sets
            .iter()
            .flat_map(|set| {
                set.iter()
                    .filter(move |rule| rule.is_enabled(regs))
                    .map(move |rule| EnabledRule {
                        owner: set.owner(),
                        rule: rule.name(),
                    })
            })
            .collect()
    }

    /// Copy of the current register values.
    pub fn snapshot(&self) -> Registers {
        self.registers.clone()
    }

    /// Replace register values with a snapshot taken from a machine with the
    /// same layout.
    ///
    /// Every value must fit its register's width and bound, so a sequencer
    /// counter can never be restored past its terminal value.
    pub fn restore(&mut self, snapshot: Registers) -> Result<(), MachineError> {
        if !self.registers.same_layout(&snapshot) {
            return Err(MachineError::LayoutMismatch);
        }
        snapshot.validate()?;
        self.registers = snapshot;
        Ok(())
    }

    /// Run one synchronous tick.
    ///
    /// Rules are picked before any effect runs, so a blocked rule leaves the
    /// context untouched. An error leaves the registers and the tick count
    /// unchanged; context changes made by effects that already ran stay.
    pub fn tick(&mut self, ctx: &mut Ctx) -> Result<TickReport, MachineError> {
        let tick = self.ticks;
        let mut picked = Vec::new();
        let mut blocked = Vec::new();
        // register ids claimed by rules picked this tick
        let mut claimed: HashSet<usize> = HashSet::new();

        for set in &self.rule_sets {
            for rule in set.iter() {
                if !rule.is_enabled(&self.registers) {
                    continue;
                }
                let targets = rule.action.targets();
                if targets.iter().any(|reg| claimed.contains(&reg.id())) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        tick,
                        owner = set.owner(),
                        rule = rule.name(),
                        "rule.blocked"
                    );

                    blocked.push(rule.name.clone());
                    continue;
                }
                claimed.extend(targets.iter().map(Reg::id));
                picked.push(rule);
            }
        }

        let mut pending: Vec<(Reg, u64)> = Vec::new();
        let mut fired = Vec::with_capacity(picked.len());
        for rule in picked {
            #[cfg(feature = "tracing")]
            tracing::debug!(tick, rule = rule.name(), "rule.fire");

            rule.action.apply(&self.registers, &mut pending, ctx)?;
            fired.push(rule.name.clone());
        }

        self.commit(pending)?;
        self.ticks += 1;

        #[cfg(feature = "tracing")]
        tracing::trace!(tick, fired = fired.len(), blocked = blocked.len(), "tick.commit");

        Ok(TickReport {
            tick,
            fired,
            blocked,
        })
    }

    /// Apply `action` on its own, between ticks.
    ///
    /// Returns `Ok(false)` and changes nothing when the action is not enabled.
    pub fn try_fire(
        &mut self,
        action: &Action<Ctx>,
        ctx: &mut Ctx,
    ) -> Result<bool, MachineError> {
        if !action.is_enabled(&self.registers) {
            return Ok(false);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(action = action.name(), "action.fire");

        let mut writes = Vec::new();
        action.apply(&self.registers, &mut writes, ctx)?;
        self.commit(writes)?;
        Ok(true)
    }

    /// Tick until `guard` holds, returning the number of ticks taken.
    pub fn run_until(
        &mut self,
        guard: &Guard,
        ctx: &mut Ctx,
        max_ticks: u64,
    ) -> Result<u64, MachineError> {
        let mut taken = 0;
        while !self.is_true(guard) {
            if taken == max_ticks {
                return Err(MachineError::TickLimit { max_ticks });
            }
            self.tick(ctx)?;
            taken += 1;
        }
        Ok(taken)
    }

    fn commit(&mut self, writes: Vec<(Reg, u64)>) -> Result<(), MachineError> {
        for (reg, value) in &writes {
            self.registers.check(reg, *value)?;
        }
        for (reg, value) in &writes {
            self.registers.set(reg, *value)?;
        }
        Ok(())
    }
}
