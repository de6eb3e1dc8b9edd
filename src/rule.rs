use std::fmt;

use crate::condition::{Condition, ConditionBuilder, True};
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::operation::{Operation, OperationBuilder};

/// A condition paired with the operation to perform when it holds.
///
/// Pre-operations enqueued while the condition is evaluated run only when the
/// condition as a whole holds, right before the operation. Otherwise they are
/// discarded, so a partially matched rule leaves no trace.
///
/// # Examples
///
/// ```
/// use rewrite_core::{ConditionBuilder, EvaluationContext, OperationBuilder, Rule, Value};
///
/// struct Request {
///     path: String,
/// }
///
/// let rule = Rule::new()
///     .with_id("legacy-redirect")
///     .when(ConditionBuilder::from_fn(|req: &Request, _: &mut EvaluationContext<Request>| {
///         Ok(req.path.starts_with("/old/"))
///     }))
///     .perform(OperationBuilder::from_fn(|_: &Request, ctx: &mut EvaluationContext<Request>| {
///         ctx.put("redirect", "/new/");
///         Ok(())
///     }));
///
/// let mut ctx = EvaluationContext::new("req-1");
/// let req = Request { path: "/old/page".to_string() };
/// assert!(rule.evaluate(&req, &mut ctx).unwrap());
/// assert_eq!(ctx.get("redirect"), Some(&Value::from("/new/")));
/// ```
pub struct Rule<E> {
    id: Option<String>,
    condition: ConditionBuilder<E>,
    operation: OperationBuilder<E>,
}

impl<E> Rule<E> {
    /// Creates a rule that always matches and does nothing.
    pub fn new() -> Self {
        Self {
            id: None,
            condition: ConditionBuilder::leaf(True),
            operation: OperationBuilder::empty(),
        }
    }

    /// Sets the rule id used in logs and reports.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Replaces the condition.
    pub fn when<C>(mut self, condition: C) -> Self
    where
        C: Condition<E> + 'static,
    {
        self.condition = condition.into_builder();
        self
    }

    /// Replaces the operation.
    pub fn perform<O>(mut self, operation: O) -> Self
    where
        O: Operation<E> + 'static,
    {
        self.operation = operation.into_builder();
        self
    }

    /// Returns the rule id, if one was set.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the condition.
    pub fn condition(&self) -> &ConditionBuilder<E> {
        &self.condition
    }

    /// Returns the operation.
    pub fn operation(&self) -> &OperationBuilder<E> {
        &self.operation
    }

    /// Evaluates the condition and, if it holds, performs pending
    /// pre-operations followed by the operation.
    ///
    /// Returns whether the rule matched.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the condition, a pre-operation or the
    /// operation. A condition error discards pending pre-operations.
    pub fn evaluate(&self, event: &E, context: &mut EvaluationContext<E>) -> Result<bool> {
        let matched = match self.condition.evaluate(event, context) {
            Ok(matched) => matched,
            Err(e) => {
                context.discard_pre_operations();
                return Err(e);
            }
        };

        if !matched {
            context.discard_pre_operations();
            tracing::trace!(request_id = %context.request_id(), rule = ?self.id, "rule not matched");
            return Ok(false);
        }

        tracing::trace!(request_id = %context.request_id(), rule = ?self.id, "rule matched");
        context.perform_pre_operations(event)?;
        self.operation.perform(event, context)?;
        Ok(true)
    }
}

impl<E> Default for Rule<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Rule<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            condition: self.condition.clone(),
            operation: self.operation.clone(),
        }
    }
}

impl<E> fmt::Debug for Rule<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("condition", &self.condition)
            .field("operation", &self.operation)
            .finish()
    }
}
