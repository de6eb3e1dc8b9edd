//! Orchestration of [`Bindable`] submission and retrieval.
//!
//! Conditions that capture values (a regex group, a path segment) must be
//! able to offer those values to every destination *before* committing any
//! of them, because a later condition of the same rule may still fail.
//! [`enqueue_pre_operation_submissions`] therefore converts and validates a
//! whole batch first and only then enqueues the actual submissions as
//! pre-operations on the [`EvaluationContext`]. They run once the rule's full
//! condition chain has passed.
//!
//! The comparison builders [`equals`] and [`not_equals`] turn pairs of
//! [`Operand`]s into conditions.

use std::fmt;
use std::sync::Arc;

use crate::bind::{Bindable, Binding, Retrieval, Submission};
use crate::condition::{Condition, ConditionBuilder};
use crate::context::EvaluationContext;
use crate::error::{BindingError, Error, Result};
use crate::operation::Operation;
use crate::value::Value;

// ============================================================================
// Submission batches
// ============================================================================

/// An ordered map from [`Bindable`] to the value it should receive.
///
/// Keys are compared by identity (address), not by value: two distinct
/// parameters with equal names are separate entries. Inserting a bindable
/// that is already present replaces its value and keeps its position.
///
/// # Examples
///
/// ```
/// use rewrite_core::bindings::Submissions;
/// use rewrite_core::{Evaluation, Parameter};
///
/// let user: Parameter<()> = Parameter::new("user").bind_to(Evaluation::property("user"));
/// let id: Parameter<()> = Parameter::new("id").bind_to(Evaluation::property("id"));
///
/// let mut batch = Submissions::new();
/// batch.insert(&user, "alice");
/// batch.insert(&id, 7);
/// batch.insert(&user, "bob");
///
/// assert_eq!(batch.len(), 2);
/// ```
pub struct Submissions<'a, E> {
    entries: Vec<(&'a dyn Bindable<E>, Value)>,
}

impl<'a, E> Submissions<'a, E> {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Sets the value for `bindable`, returning the value it replaced.
    pub fn insert(&mut self, bindable: &'a dyn Bindable<E>, value: impl Into<Value>) -> Option<Value> {
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| same_bindable(*existing, bindable))
        {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((bindable, value));
                None
            }
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, bindable: &'a dyn Bindable<E>, value: impl Into<Value>) -> Self {
        self.insert(bindable, value);
        self
    }

    /// Returns the value for `bindable`, if present.
    pub fn get(&self, bindable: &dyn Bindable<E>) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| same_bindable(*existing, bindable))
            .map(|(_, value)| value)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for Submissions<'_, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Submissions<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(_, value)| value))
            .finish()
    }
}

fn same_bindable<E>(a: &dyn Bindable<E>, b: &dyn Bindable<E>) -> bool {
    std::ptr::eq(
        a as *const dyn Bindable<E> as *const u8,
        b as *const dyn Bindable<E> as *const u8,
    )
}

// ============================================================================
// Submission
// ============================================================================

/// Offers `value` to every binding of a single `bindable`.
///
/// See [`enqueue_pre_operation_submissions`].
///
/// # Errors
///
/// Returns [`Error::Binding`] if a conversion or validation fails.
pub fn enqueue_submission<E: 'static>(
    event: &E,
    context: &mut EvaluationContext<E>,
    bindable: &dyn Bindable<E>,
    value: impl Into<Value>,
) -> Result<bool> {
    enqueue_pre_operation_submissions(event, context, Submissions::new().with(bindable, value))
}

/// Converts and validates every value of the batch against every binding of
/// its bindable, and only if all of them pass, enqueues one submission per
/// binding as a pre-operation.
///
/// Bindables are processed in insertion order and bindings in declaration
/// order. A converted value becomes the input of the next binding of the
/// same bindable; it does not carry over to the next bindable.
///
/// Returns `Ok(false)` as soon as any binding rejects its value. In that case
/// nothing has been enqueued and nothing has been submitted. Returns
/// `Ok(true)` once all submissions are enqueued, in the order they were
/// validated.
///
/// # Errors
///
/// A conversion or validation failure is wrapped in [`Error::Binding`]
/// naming the attempted value and binding. Nothing is enqueued.
///
/// # Examples
///
/// ```
/// use rewrite_core::bindings::{enqueue_pre_operation_submissions, Submissions};
/// use rewrite_core::{EvaluationContext, Evaluation, IntegerConverter, Parameter, Value};
///
/// let id: Parameter<()> = Parameter::new("id")
///     .bind_to(Evaluation::property("id").convert_with(IntegerConverter));
///
/// let mut ctx = EvaluationContext::new("req-1");
/// let enqueued = enqueue_pre_operation_submissions(&(), &mut ctx, Submissions::new().with(&id, "42")).unwrap();
///
/// assert!(enqueued);
/// assert_eq!(ctx.get("id"), None); // deferred
/// ctx.perform_pre_operations(&()).unwrap();
/// assert_eq!(ctx.get("id"), Some(&Value::Integer(42)));
/// ```
pub fn enqueue_pre_operation_submissions<E: 'static>(
    event: &E,
    context: &mut EvaluationContext<E>,
    submissions: Submissions<'_, E>,
) -> Result<bool> {
    let mut operations = Vec::new();

    for (bindable, value) in submissions.entries {
        let mut current = value;
        for binding in bindable.bindings() {
            let attempted = current.clone();
            current = binding
                .convert(event, context, current)
                .map_err(|e| binding_failure(attempted, binding.as_ref(), e))?;

            let valid = binding
                .validates(event, context, &current)
                .map_err(|e| binding_failure(current.clone(), binding.as_ref(), e))?;
            if !valid {
                tracing::debug!(
                    request_id = %context.request_id(),
                    binding = ?binding,
                    value = %current,
                    "binding rejected value"
                );
                return Ok(false);
            }

            operations.push(BindingOperation {
                binding: Arc::clone(binding),
                value: current.clone(),
            });
        }
    }

    let count = operations.len();
    for operation in operations {
        context.add_pre_operation(operation);
    }
    tracing::debug!(request_id = %context.request_id(), count, "binding submissions enqueued");
    Ok(true)
}

/// Retrieves the current value of every binding of `bindable`, in
/// declaration order.
///
/// # Errors
///
/// Returns the first retrieval error.
pub fn perform_retrieval<E>(
    event: &E,
    context: &EvaluationContext<E>,
    bindable: &dyn Bindable<E>,
) -> Result<Vec<Value>> {
    bindable
        .bindings()
        .iter()
        .map(|binding| binding.retrieve(event, context))
        .collect()
}

fn binding_failure<E>(value: Value, binding: &dyn Binding<E>, cause: Error) -> Error {
    BindingError::new(value, format!("{:?}", binding), cause).into()
}

/// Deferred submission of one converted, validated value.
struct BindingOperation<E> {
    binding: Arc<dyn Binding<E>>,
    value: Value,
}

impl<E> Operation<E> for BindingOperation<E> {
    fn perform(&self, event: &E, context: &mut EvaluationContext<E>) -> Result<()> {
        self.binding
            .submit(event, context, self.value.clone())
            .map_err(|e| binding_failure(self.value.clone(), self.binding.as_ref(), e))?;
        Ok(())
    }
}

// ============================================================================
// Comparison
// ============================================================================

/// One side of a comparison built by [`equals`] or [`not_equals`].
pub enum Operand<E> {
    /// A fixed value.
    Literal(Value),
    /// The value read from a binding.
    Retrieval(Arc<dyn Retrieval<E>>),
    /// The value returned by submitting an argument to a binding.
    Submission(Arc<dyn Submission<E>>, Value),
}

impl<E> Operand<E> {
    /// A fixed value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Operand::Literal(value.into())
    }

    /// The value read from `binding` each time the comparison is evaluated.
    pub fn retrieve(binding: impl Retrieval<E> + 'static) -> Self {
        Operand::Retrieval(Arc::new(binding))
    }

    /// The value returned by `binding.submit(argument)`.
    ///
    /// **Side effect:** every evaluation of the comparison calls
    /// [`Submission::submit`], writing `argument` to the binding's destination.
    /// The argument is submitted as is, without conversion or validation.
    pub fn submit(binding: impl Submission<E> + 'static, argument: impl Into<Value>) -> Self {
        Operand::Submission(Arc::new(binding), argument.into())
    }

    fn resolve(&self, event: &E, context: &mut EvaluationContext<E>) -> Result<Value> {
        match self {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Retrieval(binding) => binding.retrieve(event, context),
            Operand::Submission(binding, argument) => {
                binding.submit(event, context, argument.clone())
            }
        }
    }
}

impl<E> Clone for Operand<E> {
    fn clone(&self) -> Self {
        match self {
            Operand::Literal(value) => Operand::Literal(value.clone()),
            Operand::Retrieval(binding) => Operand::Retrieval(Arc::clone(binding)),
            Operand::Submission(binding, argument) => {
                Operand::Submission(Arc::clone(binding), argument.clone())
            }
        }
    }
}

impl<E> fmt::Debug for Operand<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Operand::Retrieval(binding) => f.debug_tuple("Retrieval").field(binding).finish(),
            Operand::Submission(binding, argument) => f
                .debug_tuple("Submission")
                .field(binding)
                .field(argument)
                .finish(),
        }
    }
}

/// Returns a condition that holds when `expected` and `actual` resolve to
/// equal values.
///
/// `expected` is resolved first. Two `Null`s are equal; a `Null` never equals
/// a non-null value.
///
/// # Examples
///
/// ```
/// use rewrite_core::bindings::{equals, Operand};
/// use rewrite_core::{Condition, EvaluationContext, Evaluation};
///
/// let condition = equals(Operand::literal(5), Operand::retrieve(Evaluation::property("n")));
///
/// let mut ctx = EvaluationContext::<()>::new("req-1");
/// assert!(!condition.evaluate(&(), &mut ctx).unwrap());
/// ctx.put("n", 5);
/// assert!(condition.evaluate(&(), &mut ctx).unwrap());
/// ```
pub fn equals<E: 'static>(expected: Operand<E>, actual: Operand<E>) -> ConditionBuilder<E> {
    ConditionBuilder::leaf(Comparison {
        left: expected,
        right: actual,
        equal: true,
    })
}

/// Returns a condition that holds when `expected` and `actual` resolve to
/// different values. The negation of [`equals`].
pub fn not_equals<E: 'static>(expected: Operand<E>, actual: Operand<E>) -> ConditionBuilder<E> {
    ConditionBuilder::leaf(Comparison {
        left: expected,
        right: actual,
        equal: false,
    })
}

struct Comparison<E> {
    left: Operand<E>,
    right: Operand<E>,
    equal: bool,
}

impl<E> Condition<E> for Comparison<E> {
    fn evaluate(&self, event: &E, context: &mut EvaluationContext<E>) -> Result<bool> {
        let expected = self.left.resolve(event, context)?;
        let actual = self.right.resolve(event, context)?;
        Ok(compare(&expected, &actual) == self.equal)
    }
}

/// Returns true if the two values are equal.
///
/// Two NaN floats compare equal here, unlike `Value`'s `PartialEq`. NaNs nested
/// inside lists still follow `PartialEq`.
fn compare(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) => false,
        (Value::Float(a), Value::Float(b)) if a.is_nan() && b.is_nan() => true,
        (expected, actual) => expected == actual,
    }
}
