//! Macros for building action lists.
//!
//! - `actions!`: build a length-tracked list in one expression

/// Build a length-tracked action list.
///
/// `actions![a]` is a single-element [`HSingle`](crate::HSingle);
/// `actions![a, b, c]` is the same list `a >> b >> c` produces.
///
/// ```
/// use stepfsm::{actions, Action, ActionList};
///
/// let list = actions![
///     Action::<()>::noop().named("fetch"),
///     Action::<()>::noop().named("decode"),
///     Action::<()>::noop().named("execute"),
/// ];
/// assert_eq!(list.len(), 3);
/// ```
#[macro_export]
macro_rules! actions {
    ($only:expr $(,)?) => {
        $crate::HSingle::new($only)
    };

    ($first:expr, $($rest:expr),+ $(,)?) => {
        $crate::HCons::new($first, $crate::actions!($($rest),+))
    };
}
