//! Guards and actions: the vocabulary every generated rule is written in.
//!
//! A [`Guard`] is a boolean expression over registers. An [`Action`] pairs an
//! implicit condition with a deferred effect and the registers that effect
//! may write. Effects see register values as they were at the start of the
//! tick; their register writes are buffered and committed together once every
//! fired rule has run.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::machine::MachineError;
use crate::register::{Reg, Registers};

// ============================================================================
// Guard
// ============================================================================

/// Boolean condition over register values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Guard {
    /// Always true.
    Always,
    /// True when the register holds exactly this value.
    Eq(Reg, u64),
    /// True when the register is non-zero.
    IsSet(Reg),
    /// Negation.
    Not(Box<Guard>),
    /// Conjunction.
    And(Box<Guard>, Box<Guard>),
    /// Disjunction.
    Or(Box<Guard>, Box<Guard>),
}

impl Guard {
    /// `reg == value`.
    pub fn equals(reg: &Reg, value: u64) -> Self {
        Self::Eq(reg.clone(), value)
    }

    /// `reg != 0`.
    pub fn is_set(reg: &Reg) -> Self {
        Self::IsSet(reg.clone())
    }

    /// Conjunction, folding away `Always`.
    pub fn and(self, other: Guard) -> Self {
        match (self, other) {
            (Self::Always, g) | (g, Self::Always) => g,
            (a, b) => Self::And(Box::new(a), Box::new(b)),
        }
    }

    /// Disjunction; `Always` absorbs the other side.
    pub fn or(self, other: Guard) -> Self {
        match (self, other) {
            (Self::Always, _) | (_, Self::Always) => Self::Always,
            (a, b) => Self::Or(Box::new(a), Box::new(b)),
        }
    }

    /// Returns `true` for the trivially true guard.
    pub fn is_always(&self) -> bool {
        matches!(self, Self::Always)
    }

    /// Evaluate against the given register values.
    pub fn eval(&self, regs: &Registers) -> bool {
        match self {
            Self::Always => true,
            Self::Eq(reg, value) => regs.value(reg) == *value,
            Self::IsSet(reg) => regs.value(reg) != 0,
            Self::Not(g) => !g.eval(regs),
            Self::And(a, b) => a.eval(regs) && b.eval(regs),
            Self::Or(a, b) => a.eval(regs) || b.eval(regs),
        }
    }

    /// Every register this guard reads.
    pub fn registers(&self) -> Vec<&Reg> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Reg>) {
        match self {
            Self::Always => {}
            Self::Eq(reg, _) | Self::IsSet(reg) => out.push(reg),
            Self::Not(g) => g.collect(out),
            Self::And(a, b) | Self::Or(a, b) => {
                a.collect(out);
                b.collect(out);
            }
        }
    }
}

impl std::ops::Not for Guard {
    type Output = Guard;

    fn not(self) -> Guard {
        match self {
            Guard::Not(inner) => *inner,
            g => Guard::Not(Box::new(g)),
        }
    }
}

impl std::ops::BitAnd for Guard {
    type Output = Guard;

    fn bitand(self, rhs: Guard) -> Guard {
        self.and(rhs)
    }
}

impl std::ops::BitOr for Guard {
    type Output = Guard;

    fn bitor(self, rhs: Guard) -> Guard {
        self.or(rhs)
    }
}

impl std::fmt::Display for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => f.write_str("true"),
            Self::Eq(reg, value) => write!(f, "{reg} == {value}"),
            Self::IsSet(reg) => write!(f, "{reg}"),
            Self::Not(g) => write!(f, "!({g})"),
            Self::And(a, b) => write!(f, "({a} && {b})"),
            Self::Or(a, b) => write!(f, "({a} || {b})"),
        }
    }
}

// ============================================================================
// Effects
// ============================================================================

/// View handed to an action's effect while it fires.
///
/// Reads see the pre-tick register values. Writes are buffered until commit.
pub struct Effects<'a, Ctx> {
    regs: &'a Registers,
    writes: &'a mut Vec<(Reg, u64)>,
    ctx: &'a mut Ctx,
}

impl<'a, Ctx> Effects<'a, Ctx> {
    pub(crate) fn new(
        regs: &'a Registers,
        writes: &'a mut Vec<(Reg, u64)>,
        ctx: &'a mut Ctx,
    ) -> Self {
        Self { regs, writes, ctx }
    }

    /// Value of `reg` at the start of the tick.
    pub fn read(&self, reg: &Reg) -> u64 {
        self.regs.value(reg)
    }

    /// Schedule `reg := value` for commit at the end of the tick.
    pub fn write(&mut self, reg: &Reg, value: u64) {
        self.writes.push((reg.clone(), value));
    }

    /// The caller's context.
    pub fn ctx(&mut self) -> &mut Ctx {
        &mut *self.ctx
    }
}

// ============================================================================
// Action
// ============================================================================

type Effect<Ctx> = Arc<dyn Fn(&mut Effects<'_, Ctx>) + Send + Sync>;

/// Atomic, side-effecting operation with an implicit enabling condition.
///
/// Actions are cheap to clone; clones share the same effect closures.
pub struct Action<Ctx> {
    name: Arc<str>,
    guard: Guard,
    targets: Vec<Reg>,
    effects: Vec<Effect<Ctx>>,
}

impl<Ctx> Clone for Action<Ctx> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            guard: self.guard.clone(),
            targets: self.targets.clone(),
            effects: self.effects.clone(),
        }
    }
}

impl<Ctx> std::fmt::Debug for Action<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("guard", &self.guard)
            .field("targets", &self.targets)
            .field("effects", &self.effects.len())
            .finish()
    }
}

impl<Ctx> Default for Action<Ctx> {
    fn default() -> Self {
        Self::noop()
    }
}

impl<Ctx> Action<Ctx> {
    /// The identity action: always enabled, does nothing.
    pub fn noop() -> Self {
        Self {
            name: "noop".into(),
            guard: Guard::Always,
            targets: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// Name used in rule listings and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Implicit condition that must hold for this action to fire.
    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Registers this action may write.
    pub fn targets(&self) -> &[Reg] {
        &self.targets
    }

    /// Declare `reg` as a write target.
    ///
    /// Effects built with [`Action::effect`] must declare every register they
    /// write; an undeclared write fails the tick.
    pub fn writes(mut self, reg: &Reg) -> Self {
        if !self.targets.contains(reg) {
            self.targets.push(reg.clone());
        }
        self
    }

    /// Returns `true` if firing this action has no effect.
    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }

    /// Rename this action.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Conjoin `guard` to the implicit condition.
    pub fn when(mut self, guard: Guard) -> Self {
        self.guard = self.guard.and(guard);
        self
    }

    /// Parallel composition: both conditions must hold and both effects fire
    /// in the same tick.
    pub fn par(mut self, other: Action<Ctx>) -> Self {
        self.name = match (self.is_noop(), other.is_noop()) {
            (true, false) => other.name.clone(),
            (false, false) => format!("{}, {}", self.name, other.name).into(),
            _ => self.name,
        };
        self.guard = self.guard.and(other.guard);
        for reg in &other.targets {
            self = self.writes(reg);
        }
        self.effects.extend(other.effects);
        self
    }

    /// Returns `true` if the implicit condition holds.
    pub fn is_enabled(&self, regs: &Registers) -> bool {
        self.guard.eval(regs)
    }

    /// Run every effect against `regs`, buffering writes into `writes`.
    pub(crate) fn apply(
        &self,
        regs: &Registers,
        writes: &mut Vec<(Reg, u64)>,
        ctx: &mut Ctx,
    ) -> Result<(), MachineError> {
        let start = writes.len();
        let mut fx = Effects::new(regs, writes, ctx);
        for effect in &self.effects {
            effect(&mut fx);
        }
        match writes[start..].iter().find(|(reg, _)| !self.targets.contains(reg)) {
            Some((reg, _)) => Err(MachineError::UndeclaredWrite {
                action: self.name.to_string(),
                register: reg.name().to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl<Ctx: 'static> Action<Ctx> {
    /// Action that runs `f` on the caller's context.
    pub fn new<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&mut Ctx) + Send + Sync + 'static,
    {
        Self::effect(name, move |fx| f(fx.ctx()))
    }

    /// Action with full access to register reads and buffered writes.
    pub fn effect<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&mut Effects<'_, Ctx>) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            guard: Guard::Always,
            targets: Vec::new(),
            effects: vec![Arc::new(f)],
        }
    }

    /// `reg := value`.
    pub fn write(reg: &Reg, value: u64) -> Self {
        let target = reg.clone();
        Self::effect(format!("{reg} := {value}"), move |fx| fx.write(&target, value))
            .writes(reg)
    }
}
