use std::fmt;

use crate::value::Value;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that abort the evaluation of a rule.
///
/// A validation rejection is *not* an error: it is reported as `Ok(false)`
/// by the submission functions in [`bindings`](crate::bindings). An `Error`
/// means the evaluation itself is broken and must not be treated as a
/// plain non-match.
#[derive(Debug)]
pub enum Error {
    /// A binding failed while converting, validating or submitting a value.
    Binding(BindingError),
    /// A condition, operation or binding reported a failure of its own.
    Failure(Failure),
}

impl Error {
    /// Creates an [`Error::Failure`] with the given kind and message.
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Error::Failure(Failure::new(kind, message))
    }

    /// Returns the binding error, if this is one.
    pub fn as_binding(&self) -> Option<&BindingError> {
        match self {
            Error::Binding(e) => Some(e),
            Error::Failure(_) => None,
        }
    }

    /// Returns the failure, if this is one.
    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            Error::Failure(f) => Some(f),
            Error::Binding(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Binding(e) => write!(f, "{}", e),
            Error::Failure(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Binding(e) => Some(e),
            Error::Failure(_) => None,
        }
    }
}

impl From<BindingError> for Error {
    fn from(e: BindingError) -> Self {
        Error::Binding(e)
    }
}

impl From<Failure> for Error {
    fn from(f: Failure) -> Self {
        Error::Failure(f)
    }
}

/// A failure raised by a leaf condition, operation, converter, validator or
/// binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    /// What was being attempted when the failure occurred
    pub kind: FailureKind,
    /// Human-readable description
    pub message: String,
}

impl Failure {
    /// Creates a new failure.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.kind, self.message)
    }
}

impl std::error::Error for Failure {}

/// The step during which a [`Failure`] occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Converting a value before submission
    Convert,
    /// Validating a converted value
    Validate,
    /// Reading a value out of a binding
    Retrieve,
    /// Writing a value into a binding
    Submit,
    /// Evaluating a condition
    Condition,
    /// Performing an operation
    Operation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Convert => write!(f, "conversion"),
            Self::Validate => write!(f, "validation"),
            Self::Retrieve => write!(f, "retrieval"),
            Self::Submit => write!(f, "submission"),
            Self::Condition => write!(f, "condition"),
            Self::Operation => write!(f, "operation"),
        }
    }
}

/// A binding could not accept a value.
///
/// Carries the attempted value, a description of the offending binding and
/// the underlying cause.
#[derive(Debug)]
pub struct BindingError {
    value: Value,
    binding: String,
    source: Box<Error>,
}

impl BindingError {
    /// Wraps `source` with the value and binding that were being processed.
    pub fn new(value: Value, binding: impl Into<String>, source: Error) -> Self {
        Self {
            value,
            binding: binding.into(),
            source: Box::new(source),
        }
    }

    /// Returns the value that was being bound.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the description of the binding that failed.
    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// Returns the underlying cause.
    pub fn cause(&self) -> &Error {
        &self.source
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to bind value [{}] to binding [{}]: {}",
            self.value, self.binding, self.source
        )
    }
}

impl std::error::Error for BindingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}
