//! Skip decision traces for debugging.
//!
//! [`MatchSpec::evaluate_with_trace`](crate::MatchSpec::evaluate_with_trace)
//! answers "why was this middleware skipped?" (or why not). Unlike
//! `should_skip`, every criterion is evaluated, so the trace shows all of
//! them side by side.
//!
//! # Example
//!
//! ```ignore
//! let trace = spec.evaluate_with_trace(&call);
//! println!("skip: {}", trace.skip);
//! for step in &trace.steps {
//!     println!("  {}: expected {} got {} -> {}", step.criterion, step.expected, step.actual, step.matched);
//! }
//! ```

use std::fmt;

/// Which kind of criterion a [`TraceStep`] reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// The caller-supplied custom test.
    Custom,
    /// A call-name pattern.
    Name,
    /// A call-type tag.
    Type,
}

impl Criterion {
    /// Lowercase label used in trace output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Name => "name",
            Self::Type => "type",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One criterion's evaluation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    /// The kind of criterion.
    pub criterion: Criterion,
    /// What the criterion expects (e.g. `Literal("testcall")`).
    pub expected: String,
    /// What was found on the call.
    pub actual: String,
    /// Whether this criterion matched.
    pub matched: bool,
}

/// Full trace of a skip decision.
///
/// # INV: `skip` == `should_skip()` result
///
/// Holds whenever the custom test does not fail. A failing custom test is
/// recorded as a non-matching step whose `actual` carries the error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipTrace {
    /// Whether the wrapped middleware would be skipped.
    pub skip: bool,
    /// Per-criterion steps: custom test first, then names, then types.
    pub steps: Vec<TraceStep>,
}

impl SkipTrace {
    /// Steps that matched.
    pub fn matched_steps(&self) -> impl Iterator<Item = &TraceStep> {
        self.steps.iter().filter(|s| s.matched)
    }
}

impl fmt::Display for SkipTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", if self.skip { "skip" } else { "run" })?;
        for step in &self.steps {
            writeln!(
                f,
                "  [{}] {} {} vs {:?}",
                if step.matched { "x" } else { " " },
                step.criterion,
                step.expected,
                step.actual,
            )?;
        }
        Ok(())
    }
}
