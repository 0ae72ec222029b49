//! unless - conditionally skip call middleware
//!
//! Wraps a middleware so that it is bypassed for calls matching a set of
//! criteria: call name, call type, or an arbitrary test over the call context.
//!
//! # Architecture
//!
//! - [`Options`]: What the caller wrote, as a string, a regex, a function, or an object
//! - [`Normalizer`]: Turns `Options` into a canonical [`MatchSpec`], once, at configuration time
//! - [`MatchSpec`]: Immutable skip criteria; `should_skip` is a pure read
//! - [`Unless`]: The wrapped middleware (skip → `next`, otherwise → the parent)
//!
//! # Key Design Insights
//!
//! 1. **Normalize once**: every input shape maps to one `MatchSpec`
//!    construction rule. Evaluation never inspects the input shape.
//!
//! 2. **Injected vocabulary**: whether a bare string is a call type or a call
//!    name is decided by a [`CallTypeVocabulary`], not hard-coded.
//!
//! 3. **Absent criteria match nothing**: a spec with no names, no types and no
//!    custom test never skips. Unrecognized options degrade to exactly that
//!    unless [`Strictness::Strict`] is requested.
//!
//! # Example
//!
//! ```
//! use unless::prelude::*;
//!
//! fn stamp(call: &mut Call, next: Next<'_, Call, Result<u32, SkipError>>) -> Result<u32, SkipError> {
//!     Ok(next.run(call)? + 1)
//! }
//!
//! let wrapped = stamp.unless("TestCall");
//!
//! // Name matches case-insensitively: the middleware is skipped.
//! let out = wrapped.call(&mut Call::unary("testCall"), Next::new(|_| Ok(0)));
//! assert_eq!(out.unwrap(), 0);
//!
//! // Any other call runs through it.
//! let out = wrapped.call(&mut Call::unary("otherCall"), Next::new(|_| Ok(0)));
//! assert_eq!(out.unwrap(), 1);
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod call;
mod match_spec;
mod middleware;
mod options;
mod pattern;
mod trace;

#[cfg(feature = "config")]
mod config;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

pub use call::{Call, CallContext, CallType, CallTypeVocabulary, GrpcCallTypes, UnknownCallType};
pub use match_spec::{CustomTest, MatchSpec};
pub use middleware::{Middleware, Next, Unless, UnlessExt, UnlessLayer};
pub use options::{match_spec, Normalizer, OneOrMany, Options, RawSpec, Strictness};
pub use pattern::NamePattern;
pub use trace::{Criterion, SkipTrace, TraceStep};

#[cfg(feature = "config")]
pub use config::{OptionsConfig, PatternConfig, RawSpecConfig};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use unless::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Call context
        Call,
        CallContext,
        CallType,
        CallTypeVocabulary,
        // Spec
        CustomTest,
        GrpcCallTypes,
        MatchSpec,
        // Middleware
        Middleware,
        NamePattern,
        Next,
        Normalizer,
        OneOrMany,
        Options,
        RawSpec,
        // Trace types
        SkipTrace,
        Strictness,
        Unless,
        UnlessExt,
        UnlessLayer,
        // Errors
        SkipError,
        UnlessError,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Boxed error returned by a fallible custom test.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from building a [`MatchSpec`].
///
/// These are configuration-time errors. Permissive normalization of code-level
/// [`Options`] never produces one; they come from strict mode or from
/// declarative config that cannot be compiled.
#[derive(Debug, thiserror::Error)]
pub enum UnlessError {
    /// Options did not have any recognized shape (strict mode only).
    #[error(
        "unrecognized unless options ({shape}), expected a call name, call type, \
         regex, custom test, or an object with `name`/`type`/`custom`"
    )]
    UnrecognizedOptions {
        /// Description of what was supplied.
        shape: String,
    },
    /// A name regex failed to compile.
    #[error("invalid pattern \"{pattern}\": {source}")]
    InvalidPattern {
        /// The pattern that failed to compile.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
    /// Configuration could not be read or deserialized.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Errors from evaluating a [`MatchSpec`] against a call.
///
/// The built-in name and type checks cannot fail; the only source is a
/// caller-supplied fallible [`CustomTest`].
#[derive(Debug, thiserror::Error)]
pub enum SkipError {
    /// The custom test returned an error. The caller's error is kept as-is.
    #[error("custom skip test failed: {0}")]
    CustomTest(#[source] BoxError),
}

impl SkipError {
    /// Recover the error returned by the custom test.
    #[must_use]
    pub fn into_inner(self) -> BoxError {
        match self {
            Self::CustomTest(e) => e,
        }
    }
}
