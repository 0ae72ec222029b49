//! End-to-end skip scenarios through a small dispatch chain.
//!
//! Each case wraps a recording middleware with `unless` and drives it with a
//! terminal continuation, checking both the decision and which side ran.

use std::sync::{Arc, Mutex};
use unless::prelude::*;

type Log = Arc<Mutex<Vec<&'static str>>>;
type Out = Result<(), SkipError>;

/// A middleware that records that it ran, then continues.
#[derive(Clone)]
struct Mark(Log);

impl Middleware<Call, Out> for Mark {
    fn call(&self, ctx: &mut Call, next: Next<'_, Call, Out>) -> Out {
        self.0.lock().unwrap().push("mark");
        next.run(ctx)
    }
}

/// Dispatch one call through `middleware`, then the terminal handler.
fn dispatch<M>(middleware: &M, log: &Log, mut call: Call) -> Vec<&'static str>
where
    M: Middleware<Call, Out>,
{
    log.lock().unwrap().clear();
    let terminal_log = Arc::clone(log);
    middleware
        .call(
            &mut call,
            Next::new(move |_| {
                terminal_log.lock().unwrap().push("handler");
                Ok(())
            }),
        )
        .unwrap();
    log.lock().unwrap().clone()
}

fn setup() -> (Mark, Log) {
    let log = Log::default();
    (Mark(Arc::clone(&log)), log)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Decision scenarios
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn name_string_matches_case_insensitively() {
    let (mark, log) = setup();
    let wrapped = mark.unless("TestCall");
    assert_eq!(dispatch(&wrapped, &log, Call::unary("testCall")), ["handler"]);
}

#[test]
fn name_string_is_whole_name_only() {
    let (mark, log) = setup();
    let wrapped = mark.unless("TestCallFake");
    assert_eq!(
        dispatch(&wrapped, &log, Call::unary("testCall")),
        ["mark", "handler"]
    );
}

#[test]
fn call_type_tag_matches_type() {
    let (mark, log) = setup();
    let wrapped = mark.unless(CallType::Unary);
    assert_eq!(dispatch(&wrapped, &log, Call::unary("anything")), ["handler"]);
    assert_eq!(
        dispatch(&wrapped, &log, Call::new("anything", "duplex")),
        ["mark", "handler"]
    );
}

#[test]
fn custom_test_false_runs_middleware() {
    let (mark, log) = setup();
    let wrapped = mark.unless(Options::custom(|c: &Call| c.call_type() == "unary"));
    assert_eq!(
        dispatch(&wrapped, &log, Call::new("testCall", "duplex")),
        ["mark", "handler"]
    );
}

#[test]
fn regex_searches_name() {
    let (mark, log) = setup();
    let wrapped = mark.unless(regex::Regex::new("(?i)stc").unwrap());
    assert_eq!(dispatch(&wrapped, &log, Call::unary("testCall")), ["handler"]);
}

#[test]
fn object_with_no_matching_criterion_runs_middleware() {
    let (mark, log) = setup();
    let raw = RawSpec::new()
        .call_type([CallType::Duplex, CallType::RequestStream])
        .name(vec![
            NamePattern::literal("Other"),
            NamePattern::regex_ignore_case("fake").unwrap(),
        ])
        .custom(CustomTest::new(|c: &Call| c.call_type() == "duplex"));
    let wrapped: Unless<Call, Mark> = mark.unless(raw);

    assert_eq!(
        dispatch(&wrapped, &log, Call::unary("testCall")),
        ["mark", "handler"]
    );

    let trace = wrapped.spec().evaluate_with_trace(&Call::unary("testCall"));
    assert!(!trace.skip);
    assert_eq!(trace.steps.len(), 5);
    assert_eq!(trace.matched_steps().count(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Chain behavior
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn any_criterion_suffices() {
    let (mark, log) = setup();
    let raw = RawSpec::new()
        .name("Health")
        .call_type(CallType::Duplex);
    let wrapped = mark.unless(raw);

    assert_eq!(dispatch(&wrapped, &log, Call::unary("health")), ["handler"]);
    assert_eq!(dispatch(&wrapped, &log, Call::new("Chat", "duplex")), ["handler"]);
    assert_eq!(
        dispatch(&wrapped, &log, Call::unary("Chat")),
        ["mark", "handler"]
    );
}

#[test]
fn unrecognized_options_never_skip() {
    let (mark, log) = setup();
    let wrapped = mark.unless(Options::unrecognized("number 42"));
    assert_eq!(
        dispatch(&wrapped, &log, Call::unary("testCall")),
        ["mark", "handler"]
    );
}

#[test]
fn nested_unless_layers() {
    let (mark, log) = setup();
    let inner: Unless<Call, Mark> = mark.unless("Health");
    let outer = inner.unless(CallType::Duplex);

    assert_eq!(dispatch(&outer, &log, Call::unary("health")), ["handler"]);
    assert_eq!(dispatch(&outer, &log, Call::new("Chat", "duplex")), ["handler"]);
    assert_eq!(
        dispatch(&outer, &log, Call::unary("Chat")),
        ["mark", "handler"]
    );
}

#[test]
fn layer_wraps_many_middlewares_with_one_spec() {
    let (mark, log) = setup();
    let layer = UnlessLayer::<Call>::new("Health");
    let a = layer.layer(mark.clone());
    let b = layer.layer(mark);

    assert_eq!(dispatch(&a, &log, Call::unary("health")), ["handler"]);
    assert_eq!(dispatch(&b, &log, Call::unary("health")), ["handler"]);
    assert_eq!(dispatch(&b, &log, Call::unary("Chat")), ["mark", "handler"]);
}

#[test]
fn custom_test_error_short_circuits_chain() {
    let (mark, log) = setup();
    let wrapped = mark.unless(Options::try_custom(|_: &Call| {
        Err::<bool, _>(std::io::Error::other("lookup failed"))
    }));

    let terminal_log = Arc::clone(&log);
    let err = wrapped
        .call(
            &mut Call::unary("testCall"),
            Next::new(move |_| {
                terminal_log.lock().unwrap().push("handler");
                Ok::<(), SkipError>(())
            }),
        )
        .unwrap_err();

    assert!(err.to_string().contains("lookup failed"));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn shared_across_threads() {
    let (mark, log) = setup();
    let wrapped: Arc<Unless<Call, Mark>> = Arc::new(mark.unless("Health"));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let wrapped = Arc::clone(&wrapped);
            std::thread::spawn(move || {
                wrapped
                    .spec()
                    .should_skip(&Call::unary("health"))
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert!(log.lock().unwrap().is_empty());
}
