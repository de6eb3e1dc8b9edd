use std::fmt;
use std::sync::Arc;

use crate::context::EvaluationContext;
use crate::error::Result;
use crate::value::Value;

/// The read role of a binding: extracts a value from some request,
/// response or context location.
///
/// Retrieval must be idempotent and side-effect free. Comparison conditions
/// call it freely, possibly several times per evaluation.
pub trait Retrieval<E>: fmt::Debug + Send + Sync {
    /// Reads the current value.
    ///
    /// An absent value is reported as [`Value::Null`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be read at all.
    fn retrieve(&self, event: &E, context: &EvaluationContext<E>) -> Result<Value>;
}

/// The write role of a binding: converts, validates and finally stores a
/// value in some location.
///
/// The three steps always run in that order. Orchestration in
/// [`bindings`](crate::bindings) converts and validates every binding of a
/// batch before any of them is submitted.
pub trait Submission<E>: fmt::Debug + Send + Sync {
    /// Converts a raw value into the form this binding stores.
    ///
    /// The default is the identity conversion.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted.
    fn convert(&self, _event: &E, _context: &EvaluationContext<E>, value: Value) -> Result<Value> {
        Ok(value)
    }

    /// Decides whether a converted value may be submitted.
    ///
    /// Returning `Ok(false)` rejects the value without signalling a failure.
    /// The default accepts everything.
    ///
    /// # Errors
    ///
    /// Returns an error if validation itself could not be carried out.
    fn validates(&self, _event: &E, _context: &EvaluationContext<E>, _value: &Value) -> Result<bool> {
        Ok(true)
    }

    /// Stores a converted, validated value.
    ///
    /// Returns the previous value at the destination, or the stored result,
    /// depending on the binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be stored.
    fn submit(&self, event: &E, context: &mut EvaluationContext<E>, value: Value) -> Result<Value>;
}

/// A binding supports both [`Retrieval`] and [`Submission`].
///
/// Implemented automatically for every type that implements both.
pub trait Binding<E>: Retrieval<E> + Submission<E> {}

impl<E, T> Binding<E> for T where T: Retrieval<E> + Submission<E> + ?Sized {}

impl<E, T> Retrieval<E> for Arc<T>
where
    T: Retrieval<E> + ?Sized,
{
    fn retrieve(&self, event: &E, context: &EvaluationContext<E>) -> Result<Value> {
        (**self).retrieve(event, context)
    }
}

impl<E, T> Submission<E> for Arc<T>
where
    T: Submission<E> + ?Sized,
{
    fn convert(&self, event: &E, context: &EvaluationContext<E>, value: Value) -> Result<Value> {
        (**self).convert(event, context, value)
    }

    fn validates(&self, event: &E, context: &EvaluationContext<E>, value: &Value) -> Result<bool> {
        (**self).validates(event, context, value)
    }

    fn submit(&self, event: &E, context: &mut EvaluationContext<E>, value: Value) -> Result<Value> {
        (**self).submit(event, context, value)
    }
}
