use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::EvaluationContext;
use crate::error::Result;

/// A unit of work performed against an event and its evaluation context.
///
/// Operations run when a rule matches (or, as pre-operations, just before
/// that). They may change request state, enqueue further context state, or
/// fail; a failure propagates to the caller unchanged.
///
/// Operations compose with [`and`](Self::and) into a flat sequence.
pub trait Operation<E>: Send + Sync {
    /// Performs this operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation could not be completed.
    fn perform(&self, event: &E, context: &mut EvaluationContext<E>) -> Result<()>;

    /// Converts this operation into an [`OperationBuilder`].
    fn into_builder(self) -> OperationBuilder<E>
    where
        Self: Sized + 'static,
    {
        OperationBuilder::single(self)
    }

    /// Returns an operation that performs `self` and then `other`.
    ///
    /// Nested chains are flattened, so however a chain is grouped every
    /// atomic operation runs exactly once, in the order it was written.
    fn and<O>(self, other: O) -> OperationBuilder<E>
    where
        Self: Sized + 'static,
        O: Operation<E> + 'static,
    {
        self.into_builder().then(other.into_builder())
    }
}

/// A sequence of operations performed in order.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use rewrite_core::{EvaluationContext, Operation, OperationBuilder};
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let step = |name: &'static str| {
///     let log = Arc::clone(&log);
///     OperationBuilder::from_fn(move |_: &(), _: &mut EvaluationContext<()>| {
///         log.lock().unwrap().push(name);
///         Ok(())
///     })
/// };
///
/// let composite = step("a").and(step("b")).and(step("c").and(step("d")));
/// composite.perform(&(), &mut EvaluationContext::new("req-1")).unwrap();
///
/// assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "d"]);
/// ```
pub struct OperationBuilder<E> {
    operations: Vec<Arc<dyn Operation<E>>>,
}

impl<E> OperationBuilder<E> {
    /// An operation that does nothing.
    pub fn empty() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Wraps a single operation.
    pub fn single<O>(operation: O) -> Self
    where
        O: Operation<E> + 'static,
    {
        Self {
            operations: vec![Arc::new(operation)],
        }
    }

    /// Wraps an already shared operation.
    pub fn shared(operation: Arc<dyn Operation<E>>) -> Self {
        Self {
            operations: vec![operation],
        }
    }

    /// Appends every operation of `next` after the ones in `self`.
    pub fn then(mut self, next: OperationBuilder<E>) -> Self {
        self.operations.extend(next.operations);
        self
    }

    /// Returns the number of atomic operations in this sequence.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if this sequence does nothing.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl<E: 'static> OperationBuilder<E> {
    /// Lifts a closure into an operation.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&E, &mut EvaluationContext<E>) -> Result<()> + Send + Sync + 'static,
    {
        Self::single(FnOperation {
            f,
            _event: PhantomData,
        })
    }
}

impl<E> Operation<E> for OperationBuilder<E> {
    fn perform(&self, event: &E, context: &mut EvaluationContext<E>) -> Result<()> {
        for operation in &self.operations {
            operation.perform(event, context)?;
        }
        Ok(())
    }

    fn into_builder(self) -> OperationBuilder<E>
    where
        Self: Sized + 'static,
    {
        self
    }
}

impl<E> Default for OperationBuilder<E> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<E> Clone for OperationBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            operations: self.operations.clone(),
        }
    }
}

impl<E> fmt::Debug for OperationBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationBuilder")
            .field("operations", &self.operations.len())
            .finish()
    }
}

struct FnOperation<F, E> {
    f: F,
    _event: PhantomData<fn(&E)>,
}

impl<F, E> Operation<E> for FnOperation<F, E>
where
    F: Fn(&E, &mut EvaluationContext<E>) -> Result<()> + Send + Sync,
{
    fn perform(&self, event: &E, context: &mut EvaluationContext<E>) -> Result<()> {
        (self.f)(event, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, FailureKind};
    use std::sync::Mutex;

    struct Event;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    /// Records its name every time it is performed.
    struct MockOperation {
        name: &'static str,
        log: Log,
    }

    impl Operation<Event> for MockOperation {
        fn perform(&self, _: &Event, _: &mut EvaluationContext<Event>) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    fn mocks(log: &Log) -> [MockOperation; 4] {
        ["a", "b", "c", "d"].map(|name| MockOperation {
            name,
            log: Arc::clone(log),
        })
    }

    fn run(operation: &OperationBuilder<Event>) {
        let mut ctx = EvaluationContext::new("req-op");
        operation.perform(&Event, &mut ctx).unwrap();
    }

    #[test]
    fn chaining_operations() {
        let log = Log::default();
        let [one, two, three, four] = mocks(&log);

        let composite = one.and(two).and(three.and(four));
        run(&composite);

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn grouping_does_not_change_order() {
        let log = Log::default();
        let [a, b, c, d] = mocks(&log);
        run(&a.and(b).and(c).and(d));

        let [a, b, c, d] = mocks(&log);
        run(&a.and(b.and(c.and(d))));

        let [a, b, c, d] = mocks(&log);
        run(&a.and(b).and(c.and(d)));

        let expected: Vec<_> = ["a", "b", "c", "d"].repeat(3);
        assert_eq!(*log.lock().unwrap(), expected);
    }

    #[test]
    fn chains_are_flat() {
        let log = Log::default();
        let [a, b, c, d] = mocks(&log);
        let composite = a.and(b.and(c.and(d)));
        assert_eq!(composite.len(), 4);
        assert_eq!(composite.and(OperationBuilder::empty()).len(), 4);
    }

    #[test]
    fn failure_stops_the_sequence() {
        let log = Log::default();
        let [a, _, _, d] = mocks(&log);
        let failing = OperationBuilder::from_fn(|_: &Event, _: &mut EvaluationContext<Event>| {
            Err(Error::failure(FailureKind::Operation, "cannot redirect"))
        });
        let composite = a.and(failing).and(d);

        let mut ctx = EvaluationContext::new("req-fail");
        let err = composite.perform(&Event, &mut ctx).unwrap_err();

        assert_eq!(err.as_failure().unwrap().kind, FailureKind::Operation);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn empty_operation_does_nothing() {
        let op = OperationBuilder::<Event>::default();
        assert!(op.is_empty());
        run(&op);
    }
}
