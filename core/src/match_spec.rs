//! `MatchSpec`: canonical skip criteria
//!
//! Built once by the [`Normalizer`](crate::Normalizer) and never mutated.
//! [`MatchSpec::should_skip`] is a pure read against a call context, so one
//! spec can serve any number of concurrent calls without synchronization.

use crate::trace::{Criterion, SkipTrace, TraceStep};
use crate::{BoxError, CallContext, NamePattern, SkipError};
use std::fmt;
use std::sync::Arc;

type TestFn<Ctx> = dyn Fn(&Ctx) -> Result<bool, BoxError> + Send + Sync;

/// A caller-supplied skip test over the call context.
///
/// Cloning shares the underlying function.
///
/// # Example
///
/// ```
/// use unless::{Call, CallContext, CustomTest};
///
/// let test = CustomTest::new(|call: &Call| call.call_type() == "unary");
/// assert!(test.test(&Call::unary("anything")).unwrap());
///
/// let test = CustomTest::fallible(|call: &Call| {
///     if call.name().is_empty() {
///         return Err("call has no name");
///     }
///     Ok(false)
/// });
/// assert!(test.test(&Call::unary("")).is_err());
/// ```
pub struct CustomTest<Ctx> {
    inner: Arc<TestFn<Ctx>>,
}

impl<Ctx> CustomTest<Ctx> {
    /// Wrap an infallible test.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Ctx) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |ctx: &Ctx| -> Result<bool, BoxError> { Ok(f(ctx)) }),
        }
    }

    /// Wrap a test that can fail. Its error propagates out of evaluation unchanged.
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: Fn(&Ctx) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            inner: Arc::new(move |ctx: &Ctx| -> Result<bool, BoxError> {
                f(ctx).map_err(Into::into)
            }),
        }
    }

    /// Run the test against a call.
    ///
    /// # Errors
    ///
    /// Returns [`SkipError::CustomTest`] if the wrapped function fails.
    pub fn test(&self, ctx: &Ctx) -> Result<bool, SkipError> {
        (self.inner)(ctx).map_err(SkipError::CustomTest)
    }
}

impl<Ctx> Clone for CustomTest<Ctx> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Ctx> fmt::Debug for CustomTest<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomTest(..)")
    }
}

/// Canonical skip criteria.
///
/// A call is skipped when **any** criterion matches:
///
/// - the custom test returns `true`
/// - a name pattern matches the call name
/// - a type tag equals the call type (exact, case-sensitive)
///
/// Empty `names` and `types` never match. An empty spec never skips.
///
/// # Example
///
/// ```
/// use unless::{Call, MatchSpec, NamePattern};
///
/// let spec: MatchSpec<Call> = MatchSpec::empty()
///     .with_name(NamePattern::literal("Health"))
///     .with_type("duplex");
///
/// assert!(spec.should_skip(&Call::unary("health")).unwrap());
/// assert!(spec.should_skip(&Call::new("Chat", "duplex")).unwrap());
/// assert!(!spec.should_skip(&Call::unary("Chat")).unwrap());
/// ```
pub struct MatchSpec<Ctx> {
    custom_test: Option<CustomTest<Ctx>>,
    names: Vec<NamePattern>,
    types: Vec<String>,
}

impl<Ctx> MatchSpec<Ctx> {
    /// Create a spec from its three criteria.
    #[must_use]
    pub fn new(
        custom_test: Option<CustomTest<Ctx>>,
        names: Vec<NamePattern>,
        types: Vec<String>,
    ) -> Self {
        Self {
            custom_test,
            names,
            types,
        }
    }

    /// A spec that matches nothing: the wrapped middleware always runs.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(None, Vec::new(), Vec::new())
    }

    /// Set the custom test (builder pattern).
    #[must_use]
    pub fn with_custom_test(mut self, test: CustomTest<Ctx>) -> Self {
        self.custom_test = Some(test);
        self
    }

    /// Append a name pattern (builder pattern).
    #[must_use]
    pub fn with_name(mut self, pattern: impl Into<NamePattern>) -> Self {
        self.names.push(pattern.into());
        self
    }

    /// Append a call-type tag (builder pattern).
    #[must_use]
    pub fn with_type(mut self, call_type: impl Into<String>) -> Self {
        self.types.push(call_type.into());
        self
    }

    /// The custom test, if any.
    #[must_use]
    pub fn custom_test(&self) -> Option<&CustomTest<Ctx>> {
        self.custom_test.as_ref()
    }

    /// Name patterns, in configuration order.
    #[must_use]
    pub fn names(&self) -> &[NamePattern] {
        &self.names
    }

    /// Call-type tags, in configuration order.
    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Returns `true` if no criterion is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.custom_test.is_none() && self.names.is_empty() && self.types.is_empty()
    }
}

impl<Ctx: CallContext> MatchSpec<Ctx> {
    /// Decide whether the wrapped middleware should be skipped for this call.
    ///
    /// Short-circuits: custom test, then names, then types.
    ///
    /// # Errors
    ///
    /// Returns [`SkipError::CustomTest`] if a fallible custom test fails.
    /// Name and type checks cannot fail.
    pub fn should_skip(&self, ctx: &Ctx) -> Result<bool, SkipError> {
        if let Some(test) = &self.custom_test {
            if test.test(ctx)? {
                return Ok(true);
            }
        }
        Ok(self.matches_name(ctx.name()) || self.matches_type(ctx.call_type()))
    }

    /// Returns `true` if any name pattern matches `name`.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.names.iter().any(|p| p.matches(name))
    }

    /// Returns `true` if any type tag equals `call_type`.
    #[must_use]
    pub fn matches_type(&self, call_type: &str) -> bool {
        self.types.iter().any(|t| t == call_type)
    }

    /// Evaluate every criterion and record the outcome of each.
    ///
    /// Does NOT short-circuit. See [`SkipTrace`] for the relationship to
    /// [`should_skip`](Self::should_skip).
    #[must_use]
    pub fn evaluate_with_trace(&self, ctx: &Ctx) -> SkipTrace {
        let mut steps = Vec::with_capacity(1 + self.names.len() + self.types.len());

        if let Some(test) = &self.custom_test {
            let (actual, matched) = match test.test(ctx) {
                Ok(result) => (result.to_string(), result),
                Err(e) => (format!("<error: {e}>"), false),
            };
            steps.push(TraceStep {
                criterion: Criterion::Custom,
                expected: "true".into(),
                actual,
                matched,
            });
        }

        for pattern in &self.names {
            steps.push(TraceStep {
                criterion: Criterion::Name,
                expected: pattern.to_string(),
                actual: ctx.name().to_string(),
                matched: pattern.matches(ctx.name()),
            });
        }

        for t in &self.types {
            steps.push(TraceStep {
                criterion: Criterion::Type,
                expected: t.clone(),
                actual: ctx.call_type().to_string(),
                matched: t == ctx.call_type(),
            });
        }

        let skip = steps.iter().any(|s| s.matched);
        SkipTrace { skip, steps }
    }
}

impl<Ctx> Clone for MatchSpec<Ctx> {
    fn clone(&self) -> Self {
        Self {
            custom_test: self.custom_test.clone(),
            names: self.names.clone(),
            types: self.types.clone(),
        }
    }
}

impl<Ctx> Default for MatchSpec<Ctx> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<Ctx> fmt::Debug for MatchSpec<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchSpec")
            .field("custom_test", &self.custom_test)
            .field("names", &self.names)
            .field("types", &self.types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Call, CallType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unary(name: &str) -> Call {
        Call::unary(name)
    }

    #[test]
    fn empty_spec_never_skips() {
        let spec: MatchSpec<Call> = MatchSpec::empty();
        assert!(spec.is_empty());
        assert!(!spec.should_skip(&unary("testCall")).unwrap());
        assert!(!spec.should_skip(&Call::new("", "")).unwrap());
    }

    #[test]
    fn custom_true_overrides_everything() {
        let spec = MatchSpec::empty()
            .with_custom_test(CustomTest::new(|_: &Call| true))
            .with_name("nope")
            .with_type("nope");
        assert!(spec.should_skip(&unary("testCall")).unwrap());
    }

    #[test]
    fn names_are_case_insensitive() {
        let spec: MatchSpec<Call> = MatchSpec::empty().with_name("TestCall");
        assert!(spec.should_skip(&unary("testCall")).unwrap());
        assert!(spec.should_skip(&unary("TESTCALL")).unwrap());
        assert!(!spec.should_skip(&unary("testCallFake")).unwrap());
    }

    #[test]
    fn name_regex_uses_raw_case() {
        let spec: MatchSpec<Call> =
            MatchSpec::empty().with_name(NamePattern::regex("^test").unwrap());
        assert!(spec.should_skip(&unary("testCall")).unwrap());
        assert!(!spec.should_skip(&unary("TestCall")).unwrap());
    }

    #[test]
    fn types_are_case_sensitive() {
        let spec: MatchSpec<Call> = MatchSpec::empty().with_type(CallType::Unary.as_str());
        assert!(spec.should_skip(&unary("x")).unwrap());
        assert!(!spec.should_skip(&Call::new("x", "UNARY")).unwrap());
        assert!(!spec.should_skip(&Call::new("x", "duplex")).unwrap());
    }

    #[test]
    fn custom_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let spec: MatchSpec<Call> = MatchSpec::empty()
            .with_custom_test(CustomTest::new(move |_: &Call| {
                seen.fetch_add(1, Ordering::SeqCst);
                false
            }))
            .with_name("testCall");

        assert!(spec.should_skip(&unary("testCall")).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn custom_error_propagates_unchanged() {
        #[derive(Debug, thiserror::Error)]
        #[error("auth store unavailable")]
        struct StoreDown;

        let spec: MatchSpec<Call> = MatchSpec::empty()
            .with_custom_test(CustomTest::fallible(|_: &Call| Err::<bool, _>(StoreDown)))
            .with_name("testCall");

        let err = spec.should_skip(&unary("testCall")).unwrap_err();
        let inner = err.into_inner();
        assert!(inner.downcast_ref::<StoreDown>().is_some());
    }

    #[test]
    fn clone_shares_custom_test() {
        let spec: MatchSpec<Call> =
            MatchSpec::empty().with_custom_test(CustomTest::new(|c: &Call| c.name() == "a"));
        let copy = spec.clone();
        assert!(copy.should_skip(&unary("a")).unwrap());
        assert!(!copy.should_skip(&unary("b")).unwrap());
    }

    #[test]
    fn trace_reports_every_criterion() {
        let spec: MatchSpec<Call> = MatchSpec::empty()
            .with_custom_test(CustomTest::new(|_: &Call| false))
            .with_name("Other")
            .with_name(NamePattern::regex_ignore_case("fake").unwrap())
            .with_type("duplex")
            .with_type("unary");

        let trace = spec.evaluate_with_trace(&unary("testCall"));
        assert!(trace.skip);
        assert_eq!(trace.steps.len(), 5);
        assert_eq!(trace.steps[0].criterion, Criterion::Custom);
        assert_eq!(trace.steps[1].expected, r#"Literal("other")"#);
        let matched: Vec<_> = trace.matched_steps().map(|s| s.expected.as_str()).collect();
        assert_eq!(matched, vec!["unary"]);
    }

    #[test]
    fn trace_records_custom_error() {
        let spec: MatchSpec<Call> = MatchSpec::empty()
            .with_custom_test(CustomTest::fallible(|_: &Call| Err::<bool, _>("boom")));
        let trace = spec.evaluate_with_trace(&unary("x"));
        assert!(!trace.skip);
        assert_eq!(trace.steps[0].actual, "<error: custom skip test failed: boom>");
    }

    #[test]
    fn spec_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MatchSpec<Call>>();
    }
}
