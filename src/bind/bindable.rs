use std::fmt;
use std::sync::Arc;

use super::binding::Binding;

/// Something that owns an ordered list of bindings.
///
/// A bindable is a value site: a regex capture group, a matched path segment,
/// a query parameter. When a value is captured for it, the value is offered to
/// every binding in declaration order.
pub trait Bindable<E> {
    /// Returns the bindings in declaration order.
    fn bindings(&self) -> &[Arc<dyn Binding<E>>];
}

/// A named [`Bindable`].
///
/// # Examples
///
/// ```
/// use rewrite_core::{Bindable, Evaluation, Parameter};
///
/// let id: Parameter<()> = Parameter::new("id")
///     .bind_to(Evaluation::property("user-id"))
///     .bind_to(Evaluation::property("last-id"));
///
/// assert_eq!(id.name(), "id");
/// assert_eq!(id.bindings().len(), 2);
/// ```
pub struct Parameter<E> {
    name: String,
    bindings: Vec<Arc<dyn Binding<E>>>,
}

impl<E> Parameter<E> {
    /// Creates a parameter with no bindings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
        }
    }

    /// Returns the parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a binding.
    pub fn bind_to<B>(mut self, binding: B) -> Self
    where
        B: Binding<E> + 'static,
    {
        self.bindings.push(Arc::new(binding));
        self
    }

    /// Appends an already shared binding.
    pub fn bind_to_shared(mut self, binding: Arc<dyn Binding<E>>) -> Self {
        self.bindings.push(binding);
        self
    }
}

impl<E> Bindable<E> for Parameter<E> {
    fn bindings(&self) -> &[Arc<dyn Binding<E>>] {
        &self.bindings
    }
}

impl<E> Clone for Parameter<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            bindings: self.bindings.clone(),
        }
    }
}

impl<E> fmt::Debug for Parameter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("bindings", &self.bindings)
            .finish()
    }
}
