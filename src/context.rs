use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::logging::EvaluationLog;
use crate::operation::Operation;
use crate::value::Value;

/// Mutable state of a single rule evaluation.
///
/// An `EvaluationContext` is created by the caller for one event (one rule
/// evaluation when driven by [`Configuration`](crate::Configuration)) and is
/// never shared between evaluations. It holds:
/// - the **pre-operation queue**: deferred operations (typically pending
///   binding submissions) enqueued while conditions are evaluated, and run
///   only after the whole condition chain is confirmed true
/// - an attribute store that bindings such as
///   [`Evaluation`](crate::Evaluation) read from and write to
/// - the request id attached to every log line emitted through [`log`](Self::log)
///
/// # Examples
///
/// ```
/// use rewrite_core::{EvaluationContext, OperationBuilder, Value};
///
/// struct Request;
///
/// let mut ctx = EvaluationContext::<Request>::new("req-1");
/// ctx.add_pre_operation(OperationBuilder::from_fn(|_req: &Request, ctx: &mut EvaluationContext<Request>| {
///     ctx.put("matched", true);
///     Ok(())
/// }));
///
/// assert_eq!(ctx.pre_operation_count(), 1);
/// ctx.perform_pre_operations(&Request).unwrap();
/// assert_eq!(ctx.get("matched"), Some(&Value::Bool(true)));
/// ```
pub struct EvaluationContext<E> {
    request_id: String,
    pre_operations: Vec<Box<dyn Operation<E>>>,
    attributes: HashMap<String, Value>,
}

impl<E> EvaluationContext<E> {
    /// Creates an empty context for the given request.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            pre_operations: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    /// Returns the request id for this context.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns a logger that tags every message with this context's request id.
    pub fn log(&self) -> EvaluationLog<'_> {
        EvaluationLog::new(&self.request_id, self.pre_operations.len())
    }

    // ========================================================================
    // Pre-operations
    // ========================================================================

    /// Defers `operation` until the enclosing rule's conditions have all passed.
    pub fn add_pre_operation(&mut self, operation: impl Operation<E> + 'static) {
        self.pre_operations.push(Box::new(operation));
    }

    /// Returns the number of pending pre-operations.
    pub fn pre_operation_count(&self) -> usize {
        self.pre_operations.len()
    }

    /// Returns true if any pre-operations are pending.
    pub fn has_pre_operations(&self) -> bool {
        !self.pre_operations.is_empty()
    }

    /// Drains the queue and performs every pending pre-operation in the order
    /// it was added.
    ///
    /// Operations enqueued while draining are performed as well, after the
    /// ones already pending. Draining continues until the queue stays empty,
    /// so a pre-operation that re-enqueues itself on every run never lets this
    /// return; it must stop re-enqueueing on some run.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a pre-operation. Remaining
    /// pre-operations are discarded.
    pub fn perform_pre_operations(&mut self, event: &E) -> Result<()> {
        let mut performed = 0usize;
        while !self.pre_operations.is_empty() {
            let batch = std::mem::take(&mut self.pre_operations);
            for operation in batch {
                if let Err(e) = operation.perform(event, self) {
                    self.pre_operations.clear();
                    return Err(e);
                }
                performed += 1;
            }
        }
        tracing::debug!(request_id = %self.request_id, performed, "pre-operations performed");
        Ok(())
    }

    /// Drops every pending pre-operation without performing it.
    ///
    /// Returns how many were discarded.
    pub fn discard_pre_operations(&mut self) -> usize {
        let discarded = self.pre_operations.len();
        self.pre_operations.clear();
        if discarded > 0 {
            tracing::debug!(request_id = %self.request_id, discarded, "pre-operations discarded");
        }
        discarded
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Stores an attribute, returning the previous value if there was one.
    pub fn put(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Returns the attribute with the given name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Removes and returns the attribute with the given name.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }
}

impl<E> fmt::Debug for EvaluationContext<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("request_id", &self.request_id)
            .field("pre_operations", &self.pre_operations.len())
            .field("attributes", &self.attributes)
            .finish()
    }
}
