use crate::condition::{Condition, ConditionBuilder};

/// Negation of a condition.
///
/// # Examples
///
/// ```
/// use rewrite_core::{Condition, ConditionBuilder, EvaluationContext, False, Not};
///
/// let mut ctx = EvaluationContext::<()>::new("req-1");
/// let condition: ConditionBuilder<()> = Not::any(False);
/// assert!(condition.evaluate(&(), &mut ctx).unwrap());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Not;

impl Not {
    /// Returns a condition that holds when `condition` does not.
    ///
    /// The wrapped condition is evaluated exactly once per evaluation, and
    /// any error it returns is passed through unchanged.
    pub fn any<E, C>(condition: C) -> ConditionBuilder<E>
    where
        C: Condition<E> + 'static,
    {
        condition.into_builder().negate()
    }
}
