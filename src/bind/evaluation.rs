use std::fmt;

use super::behavior::{BindingBehavior, Converter, Validator};
use super::binding::{Retrieval, Submission};
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::value::Value;

/// A binding to a named attribute of the [`EvaluationContext`].
///
/// Values submitted here live only as long as the evaluation. This makes
/// `Evaluation` the usual destination for captured values that later
/// conditions or operations of the same rule read back.
///
/// # Examples
///
/// ```
/// use rewrite_core::{EvaluationContext, Evaluation, Retrieval, Submission, Value};
///
/// let binding = Evaluation::property("user");
/// let mut ctx = EvaluationContext::<()>::new("req-1");
///
/// assert_eq!(binding.retrieve(&(), &ctx).unwrap(), Value::Null);
/// binding.submit(&(), &mut ctx, Value::from("alice")).unwrap();
/// assert_eq!(binding.retrieve(&(), &ctx).unwrap(), Value::from("alice"));
/// ```
#[derive(Clone)]
pub struct Evaluation {
    property: String,
    behavior: BindingBehavior,
}

impl Evaluation {
    /// Binds to the context attribute `name`.
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            property: name.into(),
            behavior: BindingBehavior::new(),
        }
    }

    /// Returns the attribute name.
    pub fn name(&self) -> &str {
        &self.property
    }

    /// Converts submitted values with `converter`.
    pub fn convert_with(mut self, converter: impl Converter + 'static) -> Self {
        self.behavior = self.behavior.convert_with(converter);
        self
    }

    /// Validates submitted values with `validator`.
    pub fn validate_with(mut self, validator: impl Validator + 'static) -> Self {
        self.behavior = self.behavior.validate_with(validator);
        self
    }
}

impl<E> Retrieval<E> for Evaluation {
    fn retrieve(&self, _event: &E, context: &EvaluationContext<E>) -> Result<Value> {
        Ok(context.get(&self.property).cloned().unwrap_or_default())
    }
}

impl<E> Submission<E> for Evaluation {
    fn convert(&self, _event: &E, _context: &EvaluationContext<E>, value: Value) -> Result<Value> {
        self.behavior.convert(value)
    }

    fn validates(&self, _event: &E, _context: &EvaluationContext<E>, value: &Value) -> Result<bool> {
        self.behavior.validates(value)
    }

    /// Stores the value and returns the one it replaced, or `Null`.
    fn submit(&self, _event: &E, context: &mut EvaluationContext<E>, value: Value) -> Result<Value> {
        Ok(context
            .put(self.property.clone(), value)
            .unwrap_or_default())
    }
}

impl fmt::Debug for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Evaluation({})", self.property)
    }
}
