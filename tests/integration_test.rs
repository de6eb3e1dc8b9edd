use std::sync::{Arc, Mutex};

use rewrite_core::bindings::{
    enqueue_pre_operation_submissions, enqueue_submission, equals, not_equals, perform_retrieval,
    Operand, Submissions,
};
use rewrite_core::{
    Condition, ConditionBuilder, ConfigurationBuilder, Error, Evaluation, EvaluationContext, False,
    FailureKind, IntegerConverter, NonEmpty, Not, Operation, OperationBuilder, Parameter,
    Retrieval, Rule, RuleOutcome, Submission, True, Value,
};

/// Minimal inbound request used across these tests.
struct Request {
    path: String,
    headers: Mutex<Vec<(String, String)>>,
}

impl Request {
    fn get(path: &str) -> Self {
        Self {
            path: path.to_string(),
            headers: Mutex::new(Vec::new()),
        }
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

/// Binding to a request header.
#[derive(Debug)]
struct Header(&'static str);

impl Retrieval<Request> for Header {
    fn retrieve(&self, req: &Request, _: &EvaluationContext<Request>) -> rewrite_core::Result<Value> {
        Ok(req.header(self.0).into())
    }
}

impl Submission<Request> for Header {
    fn submit(
        &self,
        req: &Request,
        _: &mut EvaluationContext<Request>,
        value: Value,
    ) -> rewrite_core::Result<Value> {
        let mut headers = req.headers.lock().unwrap();
        let index = headers.iter().position(|(n, _)| n == self.0);
        let previous = index.map(|i| headers.remove(i).1);
        headers.push((self.0.to_string(), value.to_string()));
        Ok(previous.into())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Matches `/{prefix}/{segment}` and offers the segment to `param`.
fn path_segment(prefix: &'static str, param: Parameter<Request>) -> ConditionBuilder<Request> {
    ConditionBuilder::from_fn(move |req: &Request, ctx: &mut EvaluationContext<Request>| {
        match req
            .path
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            Some(segment) if !segment.contains('/') => enqueue_submission(req, ctx, &param, segment),
            _ => Ok(false),
        }
    })
}

#[test]
fn matched_rule_submits_captured_value_to_every_binding() {
    init_tracing();

    let user: Parameter<Request> = Parameter::new("user")
        .bind_to(Evaluation::property("user"))
        .bind_to(Header("X-User"));
    let config = ConfigurationBuilder::begin()
        .define_rule()
        .with_id("user-page")
        .when(path_segment("/users", user))
        .perform(OperationBuilder::from_fn(
            |req: &Request, ctx: &mut EvaluationContext<Request>| {
                // The captured value is visible by the time the operation runs
                let user = ctx.get("user").cloned().unwrap_or_default();
                ctx.log().info(format_args!("user page for {}", user));
                req.headers
                    .lock()
                    .unwrap()
                    .push(("X-Rewritten".to_string(), "true".to_string()));
                Ok(())
            },
        ))
        .build();

    let req = Request::get("/users/alice");
    let report = config.evaluate(&req, "req-int-1");

    assert_eq!(report.matched(), vec!["user-page"]);
    assert_eq!(req.header("X-User").as_deref(), Some("alice"));
    assert_eq!(req.header("X-Rewritten").as_deref(), Some("true"));
}

#[test]
fn later_failing_condition_leaves_no_submission_behind() {
    let user: Parameter<Request> = Parameter::new("user").bind_to(Header("X-User"));
    let rule = Rule::new()
        .when(path_segment("/users", user).and(False))
        .perform(OperationBuilder::from_fn(
            |_: &Request, _: &mut EvaluationContext<Request>| {
                panic!("operation must not run")
            },
        ));

    let req = Request::get("/users/bob");
    let mut ctx = EvaluationContext::new("req-int-2");
    assert!(!rule.evaluate(&req, &mut ctx).unwrap());

    assert_eq!(req.header("X-User"), None);
    assert!(!ctx.has_pre_operations());
}

#[test]
fn rejected_value_does_not_reach_any_binding() {
    let id: Parameter<Request> = Parameter::new("id")
        .bind_to(Header("X-Raw-Id"))
        .bind_to(Evaluation::property("id").validate_with(NonEmpty));

    let req = Request::get("/items/");
    let rule = Rule::new().when(path_segment("/items", id));

    let mut ctx = EvaluationContext::new("req-int-3");
    assert!(!rule.evaluate(&req, &mut ctx).unwrap());
    assert_eq!(req.header("X-Raw-Id"), None);
    assert_eq!(ctx.get("id"), None);
}

#[test]
fn conversion_failure_surfaces_as_binding_error() {
    let id: Parameter<Request> = Parameter::new("id")
        .bind_to(Evaluation::property("id").convert_with(IntegerConverter));
    let config = ConfigurationBuilder::begin()
        .define_rule()
        .with_id("numeric-id")
        .when(path_segment("/items", id))
        .build();

    let report = config.evaluate(&Request::get("/items/abc"), "req-int-4");

    match report.outcome("numeric-id") {
        Some(RuleOutcome::Failed(Error::Binding(err))) => {
            assert_eq!(err.value(), &Value::from("abc"));
            assert_eq!(err.binding(), "Evaluation(id)");
            assert_eq!(err.cause().as_failure().unwrap().kind, FailureKind::Convert);
            assert!(err.to_string().starts_with("Failed to bind value [abc] to binding [Evaluation(id)]"));
        }
        other => panic!("expected binding failure, got {:?}", other),
    }
}

#[test]
fn batch_submission_is_all_or_nothing_across_parameters() {
    let lang: Parameter<Request> = Parameter::new("lang").bind_to(Header("X-Lang"));
    let page: Parameter<Request> = Parameter::new("page")
        .bind_to(Evaluation::property("page").convert_with(IntegerConverter));
    let req = Request::get("/");

    // `lang` alone would be accepted, but `page` fails to convert
    let mut ctx = EvaluationContext::new("req-int-5");
    let batch = Submissions::new().with(&lang, "en").with(&page, "x");
    assert!(enqueue_pre_operation_submissions(&req, &mut ctx, batch).is_err());
    assert_eq!(ctx.pre_operation_count(), 0);

    let batch = Submissions::new().with(&lang, "en").with(&page, "3");
    assert!(enqueue_pre_operation_submissions(&req, &mut ctx, batch).unwrap());
    ctx.perform_pre_operations(&req).unwrap();

    assert_eq!(req.header("X-Lang").as_deref(), Some("en"));
    assert_eq!(ctx.get("page"), Some(&Value::Integer(3)));
    assert_eq!(
        perform_retrieval(&req, &ctx, &lang).unwrap(),
        vec![Value::from("en")]
    );
}

#[test]
fn comparisons_drive_rules() {
    let req = Request::get("/");
    req.headers
        .lock()
        .unwrap()
        .push(("X-Env".to_string(), "staging".to_string()));

    let config = ConfigurationBuilder::begin()
        .define_rule()
        .with_id("staging")
        .when(equals(Operand::literal("staging"), Operand::retrieve(Header("X-Env"))))
        .define_rule()
        .with_id("not-production")
        .when(not_equals(Operand::literal("production"), Operand::retrieve(Header("X-Env"))))
        .define_rule()
        .with_id("missing-header")
        .when(equals(Operand::Literal(Value::Null), Operand::retrieve(Header("X-Missing"))))
        .define_rule()
        .with_id("header-set")
        .when(Not::any(equals(
            Operand::Literal(Value::Null),
            Operand::retrieve(Header("X-Env")),
        )))
        .build();

    let report = config.evaluate(&req, "req-int-6");
    assert_eq!(
        report.matched(),
        vec!["staging", "not-production", "missing-header", "header-set"]
    );
}

#[test]
fn not_scenarios() {
    let mut ctx = EvaluationContext::<Request>::new("req-int-7");
    let req = Request::get("/");

    let negated_false: ConditionBuilder<Request> = Not::any(False);
    let negated_true: ConditionBuilder<Request> = Not::any(True);
    let double: ConditionBuilder<Request> = Not::any(Not::any(True));

    assert!(negated_false.evaluate(&req, &mut ctx).unwrap());
    assert!(!negated_true.evaluate(&req, &mut ctx).unwrap());
    assert!(double.evaluate(&req, &mut ctx).unwrap());
}

#[test]
fn operation_chains_run_each_step_once_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let step = |name: &'static str| {
        let log = Arc::clone(&log);
        OperationBuilder::from_fn(move |_: &Request, _: &mut EvaluationContext<Request>| {
            log.lock().unwrap().push(name);
            Ok(())
        })
    };

    let chain = step("a").and(step("b").and(step("c"))).and(step("d"));
    assert_eq!(chain.len(), 4);

    let req = Request::get("/");
    chain
        .perform(&req, &mut EvaluationContext::new("req-int-8"))
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "d"]);
}
