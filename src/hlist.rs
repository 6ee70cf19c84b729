//! Length-tracked action lists.
//!
//! The chaining notation builds a heterogeneous-list shaped value whose type
//! records its length. `HNil` represents an empty list and does NOT implement
//! [`ActionList`], so an empty sequence is a compile error rather than a
//! construction failure. Lists whose length is only known at runtime go
//! through [`ActionVec`], which refuses to be empty.

use std::ops::Shr;

use crate::action::Action;

/// Empty list.
///
/// `HNil` intentionally does NOT implement `ActionList`, so it cannot be
/// turned into a sequencer:
///
/// ```compile_fail
/// use stepfsm::{HNil, Machine, Sequencer};
///
/// let mut machine = Machine::<()>::new();
/// let _ = Sequencer::basic(&mut machine, "empty", HNil);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HNil;

/// Step `head` runs one tick before every step in `tail`.
#[derive(Debug, Clone)]
pub struct HCons<H, T> {
    /// Action for this step.
    pub head: H,
    /// Steps after this one; never empty.
    pub tail: T,
}

impl<H, T> HCons<H, T> {
    /// Put `head` in front of the steps in `tail`.
    pub fn new(head: H, tail: T) -> Self {
        Self { head, tail }
    }
}

/// The last step of a list, or a one-step list on its own.
#[derive(Debug, Clone)]
pub struct HSingle<H>(pub H);

impl<H> HSingle<H> {
    /// One-step list holding `step`.
    pub fn new(step: H) -> Self {
        Self(step)
    }
}

/// An ordered, non-empty list of actions.
pub trait ActionList<Ctx> {
    /// Number of actions in the list.
    fn len(&self) -> usize;

    /// Always `false`; every action list has at least one element.
    fn is_empty(&self) -> bool {
        false
    }

    /// Flatten into actions in execution order.
    fn into_actions(self) -> Vec<Action<Ctx>>;
}

/// Lists whose length is part of their type.
pub trait FixedLen {
    /// Number of elements.
    const LEN: usize;
}

impl<H> FixedLen for HSingle<H> {
    const LEN: usize = 1;
}

impl<H, T: FixedLen> FixedLen for HCons<H, T> {
    const LEN: usize = 1 + T::LEN;
}

impl<Ctx> ActionList<Ctx> for HSingle<Action<Ctx>> {
    fn len(&self) -> usize {
        1
    }

    fn into_actions(self) -> Vec<Action<Ctx>> {
        vec![self.0]
    }
}

impl<Ctx, T> ActionList<Ctx> for HCons<Action<Ctx>, T>
where
    T: ActionList<Ctx>,
{
    fn len(&self) -> usize {
        1 + self.tail.len()
    }

    fn into_actions(self) -> Vec<Action<Ctx>> {
        let mut actions = Vec::with_capacity(self.len());
        actions.push(self.head);
        actions.extend(self.tail.into_actions());
        actions
    }
}

/// Helper trait to append an element to the end of a list.
pub trait Append<X> {
    /// The resulting list type after appending.
    type Output;
    /// Append an element after the last one.
    fn append(self, last: X) -> Self::Output;
}

impl<H, X> Append<X> for HSingle<H> {
    type Output = HCons<H, HSingle<X>>;

    fn append(self, last: X) -> Self::Output {
        HCons::new(self.0, HSingle::new(last))
    }
}

impl<H, T, X> Append<X> for HCons<H, T>
where
    T: Append<X>,
{
    type Output = HCons<H, T::Output>;

    fn append(self, last: X) -> Self::Output {
        HCons::new(self.head, self.tail.append(last))
    }
}

/// `a >> b` is the two-element list `[a, b]`.
impl<Ctx> Shr<Action<Ctx>> for Action<Ctx> {
    type Output = HCons<Action<Ctx>, HSingle<Action<Ctx>>>;

    fn shr(self, next: Action<Ctx>) -> Self::Output {
        HCons::new(self, HSingle::new(next))
    }
}

impl<Ctx> Shr<Action<Ctx>> for HSingle<Action<Ctx>> {
    type Output = HCons<Action<Ctx>, HSingle<Action<Ctx>>>;

    fn shr(self, next: Action<Ctx>) -> Self::Output {
        self.append(next)
    }
}

/// `list >> c` appends `c` to the end of `list`.
impl<Ctx, T> Shr<Action<Ctx>> for HCons<Action<Ctx>, T>
where
    T: Append<Action<Ctx>>,
{
    type Output = HCons<Action<Ctx>, T::Output>;

    fn shr(self, next: Action<Ctx>) -> Self::Output {
        self.append(next)
    }
}

/// Non-empty list of actions whose length is decided at runtime.
#[derive(Debug, Clone)]
pub struct ActionVec<Ctx> {
    actions: Vec<Action<Ctx>>,
}

impl<Ctx> ActionVec<Ctx> {
    /// Collect `actions`, or `None` if there are none.
    pub fn new(actions: impl IntoIterator<Item = Action<Ctx>>) -> Option<Self> {
        let actions: Vec<_> = actions.into_iter().collect();
        if actions.is_empty() {
            None
        } else {
            Some(Self { actions })
        }
    }

    /// The actions in execution order.
    pub fn as_slice(&self) -> &[Action<Ctx>] {
        &self.actions
    }
}

impl<Ctx> ActionList<Ctx> for ActionVec<Ctx> {
    fn len(&self) -> usize {
        self.actions.len()
    }

    fn into_actions(self) -> Vec<Action<Ctx>> {
        self.actions
    }
}
