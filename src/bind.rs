//! Value bindings.
//!
//! This module provides:
//! - `Retrieval` / `Submission` / `Binding`: the read and write roles of a binding
//! - `Bindable` / `Parameter`: value sites owning an ordered list of bindings
//! - `Converter` / `Validator` / `BindingBehavior`: default conversion and validation
//! - `Evaluation`: a binding to an attribute of the evaluation context
//!
//! Submitting values to bindings is orchestrated by [`bindings`](crate::bindings),
//! which converts and validates a whole batch before committing any of it.

mod behavior;
mod bindable;
mod binding;
mod evaluation;

pub use behavior::{
    BindingBehavior, Converter, IntegerConverter, NonEmpty, NotNull, StringConverter, Validator,
};
pub use bindable::{Bindable, Parameter};
pub use binding::{Binding, Retrieval, Submission};
pub use evaluation::Evaluation;
