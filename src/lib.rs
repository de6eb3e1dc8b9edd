//! Rule-based request rewriting core.
//!
//! This crate provides the building blocks of a rewrite engine:
//! - **Conditions**: composable predicates over an event, with short-circuit
//!   AND/OR and negation
//! - **Operations**: units of work that run when a rule matches, chained
//!   into flat sequences
//! - **Bindings**: typed read/write access to values, with all-or-nothing
//!   submission of captured values deferred until a rule fully matches
//! - **Rules and configurations**: condition + operation pairs evaluated in
//!   order against each event
//!
//! # Core Types
//!
//! - [`Condition`] / [`ConditionBuilder`]: predicates and their composition
//! - [`Operation`] / [`OperationBuilder`]: actions and their composition
//! - [`Retrieval`] / [`Submission`] / [`Binding`]: the two roles of a binding
//! - [`Bindable`] / [`Parameter`]: value sites owning ordered bindings
//! - [`EvaluationContext`]: per-evaluation state holding the pre-operation queue
//! - [`Configuration`]: an ordered list of [`Rule`]s
//!
//! The event type is a generic parameter `E` throughout. An inbound HTTP
//! request, an outbound URL, or a test struct all work the same way.
//!
//! # Examples
//!
//! ```
//! use rewrite_core::bindings::{enqueue_submission, equals, Operand};
//! use rewrite_core::{
//!     Condition, ConditionBuilder, ConfigurationBuilder, Evaluation, EvaluationContext,
//!     IntegerConverter, OperationBuilder, Parameter,
//! };
//!
//! struct Request {
//!     path: String,
//! }
//!
//! let id: Parameter<Request> = Parameter::new("id")
//!     .bind_to(Evaluation::property("product-id").convert_with(IntegerConverter));
//!
//! // Capture the trailing path segment as the product id.
//! let matches_product = ConditionBuilder::from_fn(move |req: &Request, ctx: &mut EvaluationContext<Request>| {
//!     match req.path.strip_prefix("/products/") {
//!         Some(segment) => enqueue_submission(req, ctx, &id, segment),
//!         None => Ok(false),
//!     }
//! });
//!
//! let config = ConfigurationBuilder::begin()
//!     .define_rule()
//!     .with_id("product")
//!     .when(matches_product.and(equals(Operand::literal(1), Operand::literal(1))))
//!     .perform(OperationBuilder::from_fn(|_: &Request, ctx: &mut EvaluationContext<Request>| {
//!         let id = ctx.get("product-id").and_then(|v| v.as_integer()).unwrap_or(0);
//!         ctx.log().info(format_args!("serving product {}", id));
//!         Ok(())
//!     }))
//!     .build();
//!
//! let report = config.evaluate(&Request { path: "/products/42".to_string() }, "req-1");
//! assert_eq!(report.matched(), vec!["product"]);
//!
//! let report = config.evaluate(&Request { path: "/products/abc".to_string() }, "req-2");
//! assert!(report.outcome("product").unwrap().error().is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bind;
pub mod bindings;
mod condition;
mod config;
mod context;
mod error;
mod logging;
mod not;
mod operation;
mod rule;
mod value;

pub use bind::{
    Bindable, Binding, BindingBehavior, Converter, Evaluation, IntegerConverter, NonEmpty,
    NotNull, Parameter, Retrieval, StringConverter, Submission, Validator,
};
pub use condition::{Condition, ConditionBuilder, False, True};
pub use config::{Configuration, ConfigurationBuilder, EvaluationReport, RuleBuilder, RuleOutcome};
pub use context::EvaluationContext;
pub use error::{BindingError, Error, Failure, FailureKind, Result};
pub use logging::EvaluationLog;
pub use not::Not;
pub use operation::{Operation, OperationBuilder};
pub use rule::Rule;
pub use value::Value;
