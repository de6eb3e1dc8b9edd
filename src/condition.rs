use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::EvaluationContext;
use crate::error::Result;

/// A predicate over an event and its evaluation context.
///
/// Conditions decide whether a rule applies. They must not change observable
/// request state; anything that has to happen as a consequence of a match
/// (such as binding a captured value) is deferred by enqueueing a
/// pre-operation on the context.
///
/// Conditions compose with [`and`](Self::and), [`or`](Self::or) and
/// [`not`](Self::not). Composition short-circuits and never swallows an error
/// returned by a leaf.
///
/// # Examples
///
/// ```
/// use rewrite_core::{Condition, ConditionBuilder, EvaluationContext, False, Not, True};
///
/// let mut ctx = EvaluationContext::<()>::new("req-1");
///
/// let condition: ConditionBuilder<()> = True.and(Not::any(False)).or(False);
/// assert!(condition.evaluate(&(), &mut ctx).unwrap());
/// ```
pub trait Condition<E>: Send + Sync {
    /// Evaluates this condition.
    ///
    /// # Errors
    ///
    /// Returns an error if the condition cannot be evaluated. An absent value
    /// is not an error; it is a non-match.
    fn evaluate(&self, event: &E, context: &mut EvaluationContext<E>) -> Result<bool>;

    /// Converts this condition into a [`ConditionBuilder`].
    ///
    /// Builders return themselves so that composing builders does not add
    /// a layer of indirection.
    fn into_builder(self) -> ConditionBuilder<E>
    where
        Self: Sized + 'static,
    {
        ConditionBuilder::leaf(self)
    }

    /// Returns a condition that holds when both `self` and `other` hold.
    ///
    /// `other` is evaluated only when `self` evaluated to true.
    fn and<C>(self, other: C) -> ConditionBuilder<E>
    where
        Self: Sized + 'static,
        C: Condition<E> + 'static,
    {
        self.into_builder().join(other.into_builder(), Junction::All)
    }

    /// Returns a condition that holds when either `self` or `other` holds.
    ///
    /// `other` is evaluated only when `self` evaluated to false.
    fn or<C>(self, other: C) -> ConditionBuilder<E>
    where
        Self: Sized + 'static,
        C: Condition<E> + 'static,
    {
        self.into_builder().join(other.into_builder(), Junction::Any)
    }

    /// Returns the negation of this condition.
    fn not(self) -> ConditionBuilder<E>
    where
        Self: Sized + 'static,
    {
        self.into_builder().negate()
    }
}

/// A condition that always holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct True;

impl<E> Condition<E> for True {
    fn evaluate(&self, _event: &E, _context: &mut EvaluationContext<E>) -> Result<bool> {
        Ok(true)
    }
}

/// A condition that never holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct False;

impl<E> Condition<E> for False {
    fn evaluate(&self, _event: &E, _context: &mut EvaluationContext<E>) -> Result<bool> {
        Ok(false)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Junction {
    All,
    Any,
}

/// Node of a composed condition.
///
/// AND/OR chains are stored as n-ary nodes, so `a.and(b).and(c)` is one
/// `All` node with three children rather than two nested ones.
enum Node<E> {
    Leaf(Arc<dyn Condition<E>>),
    All(Vec<Node<E>>),
    Any(Vec<Node<E>>),
    Not(Box<Node<E>>),
}

// Post-order copy with explicit stacks; no stack frame per nesting level.
impl<E> Clone for Node<E> {
    fn clone(&self) -> Self {
        enum Step<'a, E> {
            Visit(&'a Node<E>),
            All(usize),
            Any(usize),
            Not,
        }

        let mut steps = vec![Step::Visit(self)];
        let mut built: Vec<Node<E>> = Vec::new();

        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(Node::Leaf(c)) => built.push(Node::Leaf(Arc::clone(c))),
                Step::Visit(Node::All(children)) => {
                    steps.push(Step::All(children.len()));
                    steps.extend(children.iter().rev().map(Step::Visit));
                }
                Step::Visit(Node::Any(children)) => {
                    steps.push(Step::Any(children.len()));
                    steps.extend(children.iter().rev().map(Step::Visit));
                }
                Step::Visit(Node::Not(inner)) => {
                    steps.push(Step::Not);
                    steps.push(Step::Visit(inner.as_ref()));
                }
                Step::All(width) => {
                    let children = built.split_off(built.len() - width);
                    built.push(Node::All(children));
                }
                Step::Any(width) => {
                    let children = built.split_off(built.len() - width);
                    built.push(Node::Any(children));
                }
                Step::Not => {
                    if let Some(inner) = built.pop() {
                        built.push(Node::Not(Box::new(inner)));
                    }
                }
            }
        }

        // Exactly one node remains: the copy of `self`
        built.pop().unwrap_or_else(|| Node::All(Vec::new()))
    }
}

/// A composed condition.
///
/// `ConditionBuilder` is an immutable expression tree of AND, OR and NOT
/// nodes over leaf conditions. Every composition method consumes the builder
/// and returns a new one. Evaluation walks the tree with an explicit stack,
/// so deeply nested compositions do not grow the call stack.
///
/// # Examples
///
/// ```
/// use rewrite_core::{Condition, ConditionBuilder, EvaluationContext};
///
/// struct Request {
///     path: String,
/// }
///
/// let is_admin = ConditionBuilder::from_fn(|req: &Request, _ctx: &mut EvaluationContext<Request>| {
///     Ok(req.path.starts_with("/admin"))
/// });
/// let is_login = ConditionBuilder::from_fn(|req: &Request, _ctx: &mut EvaluationContext<Request>| {
///     Ok(req.path == "/admin/login")
/// });
///
/// let needs_auth = is_admin.and(is_login.not());
///
/// let mut ctx = EvaluationContext::new("req-1");
/// let req = Request { path: "/admin/users".to_string() };
/// assert!(needs_auth.evaluate(&req, &mut ctx).unwrap());
/// ```
pub struct ConditionBuilder<E> {
    root: Node<E>,
}

impl<E> ConditionBuilder<E> {
    /// Wraps a single condition.
    pub fn leaf<C>(condition: C) -> Self
    where
        C: Condition<E> + 'static,
    {
        Self::from_node(Node::Leaf(Arc::new(condition)))
    }

    /// Wraps an already shared condition.
    pub fn shared(condition: Arc<dyn Condition<E>>) -> Self {
        Self::from_node(Node::Leaf(condition))
    }

    /// Returns a condition that holds when every given condition holds.
    ///
    /// An empty list holds.
    pub fn all_of(conditions: impl IntoIterator<Item = ConditionBuilder<E>>) -> Self {
        conditions
            .into_iter()
            .fold(Self::from_node(Node::All(Vec::new())), |acc, c| {
                acc.join(c, Junction::All)
            })
    }

    /// Returns a condition that holds when any given condition holds.
    ///
    /// An empty list does not hold.
    pub fn any_of(conditions: impl IntoIterator<Item = ConditionBuilder<E>>) -> Self {
        conditions
            .into_iter()
            .fold(Self::from_node(Node::Any(Vec::new())), |acc, c| {
                acc.join(c, Junction::Any)
            })
    }

    fn from_node(root: Node<E>) -> Self {
        Self { root }
    }

    fn take_root(mut self) -> Node<E> {
        std::mem::replace(&mut self.root, Node::All(Vec::new()))
    }

    pub(crate) fn join(self, other: ConditionBuilder<E>, junction: Junction) -> Self {
        let left = self.take_root();
        let right = other.take_root();

        let mut children = match (left, junction) {
            (Node::All(children), Junction::All) | (Node::Any(children), Junction::Any) => children,
            (node, _) => vec![node],
        };
        match (right, junction) {
            (Node::All(more), Junction::All) | (Node::Any(more), Junction::Any) => {
                children.extend(more)
            }
            (node, _) => children.push(node),
        }

        Self::from_node(match junction {
            Junction::All => Node::All(children),
            Junction::Any => Node::Any(children),
        })
    }

    pub(crate) fn negate(self) -> Self {
        Self::from_node(Node::Not(Box::new(self.take_root())))
    }
}

impl<E: 'static> ConditionBuilder<E> {
    /// Lifts a closure into a condition.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&E, &mut EvaluationContext<E>) -> Result<bool> + Send + Sync + 'static,
    {
        Self::leaf(FnCondition {
            f,
            _event: PhantomData,
        })
    }
}

impl<E> Condition<E> for ConditionBuilder<E> {
    fn evaluate(&self, event: &E, context: &mut EvaluationContext<E>) -> Result<bool> {
        evaluate_tree(&self.root, event, context)
    }

    fn into_builder(self) -> ConditionBuilder<E>
    where
        Self: Sized + 'static,
    {
        self
    }
}

impl<E> Clone for ConditionBuilder<E> {
    fn clone(&self) -> Self {
        Self::from_node(self.root.clone())
    }
}

impl<E> fmt::Debug for ConditionBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, width) = match &self.root {
            Node::Leaf(_) => ("leaf", 1),
            Node::All(children) => ("all", children.len()),
            Node::Any(children) => ("any", children.len()),
            Node::Not(_) => ("not", 1),
        };
        f.debug_struct("ConditionBuilder")
            .field("root", &kind)
            .field("children", &width)
            .finish()
    }
}

// Tear the tree down iteratively; the default recursive drop would use one
// stack frame per nesting level.
impl<E> Drop for ConditionBuilder<E> {
    fn drop(&mut self) {
        let mut pending = vec![std::mem::replace(&mut self.root, Node::All(Vec::new()))];
        while let Some(node) = pending.pop() {
            match node {
                Node::Leaf(_) => {}
                Node::All(children) | Node::Any(children) => pending.extend(children),
                Node::Not(inner) => pending.push(*inner),
            }
        }
    }
}

enum Frame<'a, E> {
    All(std::slice::Iter<'a, Node<E>>),
    Any(std::slice::Iter<'a, Node<E>>),
    Not,
}

fn evaluate_tree<E>(root: &Node<E>, event: &E, context: &mut EvaluationContext<E>) -> Result<bool> {
    let mut stack: Vec<Frame<'_, E>> = Vec::new();
    let mut node = root;

    'descend: loop {
        let mut result = match node {
            Node::Leaf(condition) => condition.evaluate(event, context)?,
            Node::All(children) => {
                let mut rest = children.iter();
                match rest.next() {
                    Some(first) => {
                        stack.push(Frame::All(rest));
                        node = first;
                        continue 'descend;
                    }
                    None => true,
                }
            }
            Node::Any(children) => {
                let mut rest = children.iter();
                match rest.next() {
                    Some(first) => {
                        stack.push(Frame::Any(rest));
                        node = first;
                        continue 'descend;
                    }
                    None => false,
                }
            }
            Node::Not(inner) => {
                stack.push(Frame::Not);
                node = inner.as_ref();
                continue 'descend;
            }
        };

        // Unwind until a junction still needs another operand
        loop {
            match stack.pop() {
                None => return Ok(result),
                Some(Frame::Not) => result = !result,
                Some(Frame::All(mut rest)) => {
                    if result {
                        if let Some(next) = rest.next() {
                            stack.push(Frame::All(rest));
                            node = next;
                            continue 'descend;
                        }
                    }
                }
                Some(Frame::Any(mut rest)) => {
                    if !result {
                        if let Some(next) = rest.next() {
                            stack.push(Frame::Any(rest));
                            node = next;
                            continue 'descend;
                        }
                    }
                }
            }
        }
    }
}

struct FnCondition<F, E> {
    f: F,
    _event: PhantomData<fn(&E)>,
}

impl<F, E> Condition<E> for FnCondition<F, E>
where
    F: Fn(&E, &mut EvaluationContext<E>) -> Result<bool> + Send + Sync,
{
    fn evaluate(&self, event: &E, context: &mut EvaluationContext<E>) -> Result<bool> {
        (self.f)(event, context)
    }
}
