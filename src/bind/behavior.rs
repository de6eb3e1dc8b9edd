use std::fmt;
use std::sync::Arc;

use crate::error::{Error, FailureKind, Result};
use crate::value::Value;

/// Transforms a raw value before it is validated and submitted.
///
/// Implemented for closures of the form `Fn(Value) -> Result<Value>`.
pub trait Converter: Send + Sync {
    /// Converts `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be represented in the target form.
    fn convert(&self, value: Value) -> Result<Value>;
}

impl<F> Converter for F
where
    F: Fn(Value) -> Result<Value> + Send + Sync,
{
    fn convert(&self, value: Value) -> Result<Value> {
        self(value)
    }
}

/// Decides whether a converted value may be submitted.
///
/// Implemented for closures of the form `Fn(&Value) -> Result<bool>`.
pub trait Validator: Send + Sync {
    /// Returns `Ok(true)` if `value` is acceptable.
    ///
    /// # Errors
    ///
    /// Returns an error if validation could not be carried out.
    fn validate(&self, value: &Value) -> Result<bool>;
}

impl<F> Validator for F
where
    F: Fn(&Value) -> Result<bool> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<bool> {
        self(value)
    }
}

/// Converts strings and whole floats to integers.
///
/// `Null` passes through unchanged so that absence stays absence.
///
/// # Examples
///
/// ```
/// use rewrite_core::{Converter, IntegerConverter, Value};
///
/// assert_eq!(IntegerConverter.convert(Value::from(" 42 ")).unwrap(), Value::Integer(42));
/// assert!(IntegerConverter.convert(Value::from("forty-two")).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

impl Converter for IntegerConverter {
    fn convert(&self, value: Value) -> Result<Value> {
        match value {
            Value::Null | Value::Integer(_) => Ok(value),
            Value::String(s) => s.trim().parse::<i64>().map(Value::Integer).map_err(|e| {
                Error::failure(FailureKind::Convert, format!("'{}' is not an integer: {}", s, e))
            }),
            #[allow(clippy::cast_possible_truncation)] // guarded by the range and fract checks
            Value::Float(x) if x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 => {
                Ok(Value::Integer(x as i64))
            }
            other => Err(Error::failure(
                FailureKind::Convert,
                format!("cannot convert {} '{}' to an integer", other.type_name(), other),
            )),
        }
    }
}

/// Converts scalars to their string form.
///
/// `Null` passes through unchanged; lists are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn convert(&self, value: Value) -> Result<Value> {
        match value {
            Value::Null | Value::String(_) => Ok(value),
            Value::List(_) => Err(Error::failure(
                FailureKind::Convert,
                "cannot convert a list to a string",
            )),
            other => Ok(Value::String(other.to_string())),
        }
    }
}

/// Rejects [`Value::Null`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NotNull;

impl Validator for NotNull {
    fn validate(&self, value: &Value) -> Result<bool> {
        Ok(!value.is_null())
    }
}

/// Rejects `Null`, empty strings and empty lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmpty;

impl Validator for NonEmpty {
    fn validate(&self, value: &Value) -> Result<bool> {
        Ok(match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            _ => true,
        })
    }
}

/// Default conversion and validation for concrete bindings.
///
/// A binding embeds a `BindingBehavior` and forwards its
/// [`Submission::convert`](crate::Submission::convert) and
/// [`Submission::validates`](crate::Submission::validates) to it. Without a
/// converter values pass through unchanged; without a validator every value
/// is accepted.
#[derive(Clone, Default)]
pub struct BindingBehavior {
    converter: Option<Arc<dyn Converter>>,
    validator: Option<Arc<dyn Validator>>,
}

impl BindingBehavior {
    /// Identity conversion, accept-all validation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the converter.
    pub fn convert_with(mut self, converter: impl Converter + 'static) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Replaces the validator.
    pub fn validate_with(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Runs the configured converter, if any.
    ///
    /// # Errors
    ///
    /// Returns the converter's error.
    pub fn convert(&self, value: Value) -> Result<Value> {
        match &self.converter {
            Some(converter) => converter.convert(value),
            None => Ok(value),
        }
    }

    /// Runs the configured validator, if any.
    ///
    /// # Errors
    ///
    /// Returns the validator's error.
    pub fn validates(&self, value: &Value) -> Result<bool> {
        match &self.validator {
            Some(validator) => validator.validate(value),
            None => Ok(true),
        }
    }
}

impl fmt::Debug for BindingBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingBehavior")
            .field("converter", &self.converter.is_some())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_converter() {
        let c = IntegerConverter;
        assert_eq!(c.convert(Value::from("17")).unwrap(), Value::Integer(17));
        assert_eq!(c.convert(Value::from(-3)).unwrap(), Value::Integer(-3));
        assert_eq!(c.convert(Value::from(4.0)).unwrap(), Value::Integer(4));
        assert_eq!(c.convert(Value::Null).unwrap(), Value::Null);

        let err = c.convert(Value::from(4.5)).unwrap_err();
        assert_eq!(err.as_failure().unwrap().kind, FailureKind::Convert);
        assert!(c.convert(Value::from("x1")).is_err());
        assert!(c.convert(Value::from(true)).is_err());
    }

    #[test]
    fn string_converter() {
        let c = StringConverter;
        assert_eq!(c.convert(Value::from(17)).unwrap(), Value::from("17"));
        assert_eq!(c.convert(Value::from(true)).unwrap(), Value::from("true"));
        assert_eq!(c.convert(Value::from("same")).unwrap(), Value::from("same"));
        assert!(c.convert(Value::from(vec![1])).is_err());
    }

    #[test]
    fn validators() {
        assert!(!NotNull.validate(&Value::Null).unwrap());
        assert!(NotNull.validate(&Value::from("")).unwrap());

        assert!(!NonEmpty.validate(&Value::from("")).unwrap());
        assert!(!NonEmpty.validate(&Value::List(Vec::new())).unwrap());
        assert!(!NonEmpty.validate(&Value::Null).unwrap());
        assert!(NonEmpty.validate(&Value::from("a")).unwrap());
        assert!(NonEmpty.validate(&Value::from(0)).unwrap());
    }

    #[test]
    fn behavior_defaults_are_pass_through() {
        let behavior = BindingBehavior::new();
        assert_eq!(behavior.convert(Value::from("x")).unwrap(), Value::from("x"));
        assert!(behavior.validates(&Value::Null).unwrap());
    }

    #[test]
    fn behavior_uses_closures() {
        let behavior = BindingBehavior::new()
            .convert_with(|v: Value| -> Result<Value> {
                Ok(Value::from(v.to_string().to_uppercase()))
            })
            .validate_with(|v: &Value| -> Result<bool> { Ok(v.as_str() != Some("ADMIN")) });

        let converted = behavior.convert(Value::from("admin")).unwrap();
        assert_eq!(converted, Value::from("ADMIN"));
        assert!(!behavior.validates(&converted).unwrap());
        assert!(behavior.validates(&Value::from("GUEST")).unwrap());
    }
}
