use std::fmt;

/// A logger scoped to one evaluation.
///
/// Obtained from [`EvaluationContext::log`](crate::EvaluationContext::log).
/// Each event carries the structured fields `request_id`, `pending` (the
/// number of pre-operations queued when the logger was taken) and, once
/// [`for_rule`](Self::for_rule) is applied, `rule`.
///
/// ```no_run
/// # use rewrite_core::EvaluationContext;
/// # let ctx = EvaluationContext::<()>::new("req-1");
/// ctx.log().for_rule("legacy-redirect").info(format_args!("redirecting to {}", "/login"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EvaluationLog<'a> {
    request_id: &'a str,
    rule: Option<&'a str>,
    pending: usize,
}

impl<'a> EvaluationLog<'a> {
    pub(crate) fn new(request_id: &'a str, pending: usize) -> Self {
        Self {
            request_id,
            rule: None,
            pending,
        }
    }

    /// Tags subsequent events with a rule id.
    pub fn for_rule(mut self, rule: &'a str) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Returns the request id.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Returns the rule id, if tagged.
    pub fn rule(&self) -> Option<&str> {
        self.rule
    }

    /// Emits at `info`.
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, rule = self.rule, pending = self.pending, "{}", args);
    }

    /// Emits at `warn`. Used for rule failures.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, rule = self.rule, pending = self.pending, "{}", args);
    }

    /// Emits at `error`.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, rule = self.rule, pending = self.pending, "{}", args);
    }

    /// Emits at `debug`.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, rule = self.rule, pending = self.pending, "{}", args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use crate::operation::OperationBuilder;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn events_carry_request_rule_and_queue_depth() {
        let mut ctx = EvaluationContext::<()>::new("req-log");
        ctx.add_pre_operation(OperationBuilder::<()>::empty());
        ctx.add_pre_operation(OperationBuilder::<()>::empty());

        let out = capture(|| {
            ctx.log()
                .for_rule("strip-slash")
                .warn(format_args!("rule failed: {}", "boom"));
        });

        assert!(out.contains("WARN"));
        assert!(out.contains("rule failed: boom"));
        assert!(out.contains("req-log"));
        assert!(out.contains("strip-slash"));
        assert!(out.contains("pending=2"));
    }

    #[test]
    fn untagged_logger_has_no_rule() {
        let ctx = EvaluationContext::<()>::new("req-plain");
        let log = ctx.log();
        assert_eq!(log.request_id(), "req-plain");
        assert_eq!(log.rule(), None);
        assert_eq!(log.for_rule("r1").rule(), Some("r1"));
    }
}
