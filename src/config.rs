use std::fmt;

use crate::condition::Condition;
use crate::context::EvaluationContext;
use crate::error::Error;
use crate::operation::Operation;
use crate::rule::Rule;

/// An immutable, ordered list of [`Rule`]s.
///
/// Built with [`ConfigurationBuilder`]. Evaluation gives every rule its own
/// [`EvaluationContext`], so pre-operations and attributes never leak from
/// one rule to the next.
pub struct Configuration<E> {
    rules: Vec<Rule<E>>,
}

impl<E> Configuration<E> {
    /// Returns the rules in evaluation order.
    pub fn rules(&self) -> &[Rule<E>] {
        &self.rules
    }

    /// Evaluates every rule against `event`, in order.
    ///
    /// A rule that fails does not stop the remaining rules; its error is
    /// logged and recorded in the report.
    ///
    /// # Examples
    ///
    /// ```
    /// use rewrite_core::{ConfigurationBuilder, False, True};
    ///
    /// let config = ConfigurationBuilder::<()>::begin()
    ///     .define_rule().with_id("always").when(True)
    ///     .define_rule().with_id("never").when(False)
    ///     .build();
    ///
    /// let report = config.evaluate(&(), "req-1");
    /// assert_eq!(report.matched(), vec!["always"]);
    /// ```
    pub fn evaluate(&self, event: &E, request_id: &str) -> EvaluationReport {
        let mut outcomes = Vec::with_capacity(self.rules.len());

        for (index, rule) in self.rules.iter().enumerate() {
            let mut context = EvaluationContext::new(request_id);
            let id = rule
                .id()
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", index));

            let outcome = match rule.evaluate(event, &mut context) {
                Ok(true) => RuleOutcome::Matched,
                Ok(false) => RuleOutcome::NotMatched,
                Err(e) => {
                    context
                        .log()
                        .for_rule(&id)
                        .warn(format_args!("rule failed: {}", e));
                    RuleOutcome::Failed(e)
                }
            };
            outcomes.push((id, outcome));
        }

        let report = EvaluationReport { outcomes };
        tracing::debug!(
            request_id = %request_id,
            rules = report.outcomes.len(),
            matched = report.matched().len(),
            failed = report.failed().len(),
            "configuration evaluated"
        );
        report
    }
}

impl<E> fmt::Debug for Configuration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("rules", &self.rules)
            .finish()
    }
}

/// Builder for a [`Configuration`].
///
/// # Examples
///
/// ```
/// use rewrite_core::{ConditionBuilder, ConfigurationBuilder, EvaluationContext, OperationBuilder};
///
/// struct Request {
///     path: String,
/// }
///
/// let config = ConfigurationBuilder::begin()
///     .define_rule()
///     .with_id("strip-trailing-slash")
///     .when(ConditionBuilder::from_fn(|req: &Request, _: &mut EvaluationContext<Request>| {
///         Ok(req.path.len() > 1 && req.path.ends_with('/'))
///     }))
///     .perform(OperationBuilder::from_fn(|req: &Request, ctx: &mut EvaluationContext<Request>| {
///         ctx.put("path", req.path.trim_end_matches('/'));
///         Ok(())
///     }))
///     .build();
///
/// assert_eq!(config.rules().len(), 1);
/// ```
pub struct ConfigurationBuilder<E> {
    rules: Vec<Rule<E>>,
}

impl<E> ConfigurationBuilder<E> {
    /// Starts an empty configuration.
    pub fn begin() -> Self {
        Self { rules: Vec::new() }
    }

    /// Starts a new rule. Until it is configured the rule always matches and
    /// does nothing.
    pub fn define_rule(self) -> RuleBuilder<E> {
        RuleBuilder {
            config: self,
            rule: Rule::new(),
        }
    }

    /// Appends an already assembled rule.
    pub fn add_rule(mut self, rule: Rule<E>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Finishes the configuration.
    pub fn build(self) -> Configuration<E> {
        Configuration { rules: self.rules }
    }
}

impl<E> Default for ConfigurationBuilder<E> {
    fn default() -> Self {
        Self::begin()
    }
}

/// The rule currently being defined by a [`ConfigurationBuilder`].
pub struct RuleBuilder<E> {
    config: ConfigurationBuilder<E>,
    rule: Rule<E>,
}

impl<E> RuleBuilder<E> {
    /// Sets the rule id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.rule = self.rule.with_id(id);
        self
    }

    /// Sets the condition.
    pub fn when<C>(mut self, condition: C) -> Self
    where
        C: Condition<E> + 'static,
    {
        self.rule = self.rule.when(condition);
        self
    }

    /// Sets the operation.
    pub fn perform<O>(mut self, operation: O) -> Self
    where
        O: Operation<E> + 'static,
    {
        self.rule = self.rule.perform(operation);
        self
    }

    /// Finishes this rule and starts another.
    pub fn define_rule(self) -> RuleBuilder<E> {
        self.finish().define_rule()
    }

    /// Finishes this rule and the configuration.
    pub fn build(self) -> Configuration<E> {
        self.finish().build()
    }

    /// Finishes this rule, returning to the configuration builder.
    pub fn finish(self) -> ConfigurationBuilder<E> {
        self.config.add_rule(self.rule)
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Result of evaluating one rule.
#[derive(Debug)]
pub enum RuleOutcome {
    /// The condition held and the operation was performed.
    Matched,
    /// The condition did not hold.
    NotMatched,
    /// The condition, a pre-operation or the operation failed.
    Failed(Error),
}

impl RuleOutcome {
    /// Returns true for [`RuleOutcome::Matched`].
    pub fn is_matched(&self) -> bool {
        matches!(self, RuleOutcome::Matched)
    }

    /// Returns the error for [`RuleOutcome::Failed`].
    pub fn error(&self) -> Option<&Error> {
        match self {
            RuleOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Per-rule outcomes of [`Configuration::evaluate`], in rule order.
///
/// Rules without an id are reported as `#<index>`.
#[derive(Debug)]
pub struct EvaluationReport {
    outcomes: Vec<(String, RuleOutcome)>,
}

impl EvaluationReport {
    /// Returns every `(rule id, outcome)` pair.
    pub fn outcomes(&self) -> &[(String, RuleOutcome)] {
        &self.outcomes
    }

    /// Returns the outcome of the rule with the given id.
    pub fn outcome(&self, id: &str) -> Option<&RuleOutcome> {
        self.outcomes
            .iter()
            .find(|(rule, _)| rule == id)
            .map(|(_, outcome)| outcome)
    }

    /// Returns the ids of the rules that matched.
    pub fn matched(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_matched())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Returns the ids and errors of the rules that failed.
    pub fn failed(&self) -> Vec<(&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.error().map(|e| (id.as_str(), e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ConditionBuilder, False, True};
    use crate::error::FailureKind;
    use crate::operation::OperationBuilder;
    use std::sync::{Arc, Mutex};

    struct Event;

    #[test]
    fn empty_configuration_reports_nothing() {
        let config = ConfigurationBuilder::<Event>::begin().build();
        let report = config.evaluate(&Event, "req-config");
        assert!(report.outcomes().is_empty());
    }

    #[test]
    fn rules_are_kept_in_definition_order() {
        let config = ConfigurationBuilder::<Event>::begin()
            .define_rule()
            .with_id("a")
            .define_rule()
            .with_id("b")
            .finish()
            .add_rule(Rule::new().with_id("c"))
            .build();

        let ids: Vec<_> = config.rules().iter().filter_map(|r| r.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn failures_are_isolated_per_rule() {
        let performed = Arc::new(Mutex::new(Vec::new()));
        let after = Arc::clone(&performed);

        let config = ConfigurationBuilder::<Event>::begin()
            .define_rule()
            .with_id("broken")
            .when(ConditionBuilder::from_fn(
                |_: &Event, _: &mut EvaluationContext<Event>| {
                    Err(Error::failure(FailureKind::Condition, "unreadable header"))
                },
            ))
            .define_rule()
            .with_id("skipped")
            .when(False)
            .define_rule()
            .with_id("after")
            .when(True)
            .perform(OperationBuilder::from_fn(
                move |_: &Event, _: &mut EvaluationContext<Event>| {
                    after.lock().unwrap().push("after");
                    Ok(())
                },
            ))
            .build();

        let report = config.evaluate(&Event, "req-config");

        assert_eq!(report.matched(), vec!["after"]);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "broken");
        assert!(matches!(report.outcome("skipped"), Some(RuleOutcome::NotMatched)));
        assert_eq!(*performed.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn each_rule_gets_a_fresh_context() {
        let config = ConfigurationBuilder::<Event>::begin()
            .define_rule()
            .perform(OperationBuilder::from_fn(
                |_: &Event, ctx: &mut EvaluationContext<Event>| {
                    ctx.put("seen", true);
                    Ok(())
                },
            ))
            .define_rule()
            .when(ConditionBuilder::from_fn(
                |_: &Event, ctx: &mut EvaluationContext<Event>| Ok(ctx.get("seen").is_some()),
            ))
            .build();

        let report = config.evaluate(&Event, "req-config");
        assert_eq!(report.matched(), vec!["#0"]);
        assert!(matches!(report.outcome("#1"), Some(RuleOutcome::NotMatched)));
    }
}
