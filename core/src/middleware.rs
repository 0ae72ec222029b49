//! Middleware seam and the `Unless` wrapper
//!
//! The dispatch pipeline itself is not modelled here. A middleware receives the
//! call context and a one-shot [`Next`] continuation; calling `next.run(ctx)`
//! advances the chain. [`Unless`] decides, per call, whether its parent sees
//! the call at all.
//!
//! ```text
//! Options ──normalize──▶ MatchSpec ──┐
//!                                   ▼
//!            ctx, next ──▶ Unless ── skip? ──yes──▶ next.run(ctx)
//!                                    │
//!                                    no──▶ parent.call(ctx, next)
//! ```

use crate::{
    match_spec, CallContext, CallTypeVocabulary, MatchSpec, Normalizer, Options, SkipError,
    UnlessError,
};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// The rest of the dispatch chain, as a one-shot continuation.
///
/// The context is handed back on `run`, so a middleware can inspect or modify
/// it before passing it on.
pub struct Next<'a, Ctx, Out> {
    run: Box<dyn FnOnce(&mut Ctx) -> Out + 'a>,
}

impl<'a, Ctx, Out> Next<'a, Ctx, Out> {
    /// Wrap a continuation.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&mut Ctx) -> Out + 'a,
    {
        Self { run: Box::new(f) }
    }

    /// Advance the chain.
    pub fn run(self, ctx: &mut Ctx) -> Out {
        (self.run)(ctx)
    }
}

impl<Ctx, Out> fmt::Debug for Next<'_, Ctx, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next(..)")
    }
}

/// A unit of call-processing logic in a dispatch chain.
///
/// Implemented for plain functions and closures of the matching shape:
///
/// ```
/// use unless::{Call, Middleware, Next};
///
/// fn audit(call: &mut Call, next: Next<'_, Call, Result<(), String>>) -> Result<(), String> {
///     next.run(call)
/// }
///
/// let out = Middleware::call(&audit, &mut Call::unary("Ping"), Next::new(|_| Ok(())));
/// assert!(out.is_ok());
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Middleware<{Ctx}, {Out}>`",
    label = "this type cannot be wrapped by `unless`",
    note = "a middleware is `Fn(&mut Ctx, Next<'_, Ctx, Out>) -> Out`"
)]
pub trait Middleware<Ctx, Out>: Send + Sync {
    /// Process the call, usually calling `next.run(ctx)` somewhere inside.
    fn call(&self, ctx: &mut Ctx, next: Next<'_, Ctx, Out>) -> Out;
}

impl<Ctx, Out, F> Middleware<Ctx, Out> for F
where
    F: for<'n> Fn(&mut Ctx, Next<'n, Ctx, Out>) -> Out + Send + Sync,
{
    fn call(&self, ctx: &mut Ctx, next: Next<'_, Ctx, Out>) -> Out {
        self(ctx, next)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Unless
// ═══════════════════════════════════════════════════════════════════════════════

/// A middleware that is bypassed for calls matching its [`MatchSpec`].
///
/// - skip: `next.run(ctx)`, the parent is never invoked
/// - otherwise: `parent.call(ctx, next)` with the same context and continuation
/// - custom test failure: the error is returned, neither is invoked
///
/// Outputs are `Result<T, E>` so a failing custom test can surface through
/// the pipeline's own error type (`E: From<SkipError>`).
pub struct Unless<Ctx, M> {
    parent: M,
    spec: Arc<MatchSpec<Ctx>>,
}

impl<Ctx, M> Unless<Ctx, M> {
    /// Wrap `parent` with a skip spec.
    pub fn new(parent: M, spec: MatchSpec<Ctx>) -> Self {
        Self::with_shared_spec(parent, Arc::new(spec))
    }

    /// Wrap `parent` with a spec shared with other wrappers.
    pub fn with_shared_spec(parent: M, spec: Arc<MatchSpec<Ctx>>) -> Self {
        Self { parent, spec }
    }

    /// The skip criteria.
    #[must_use]
    pub fn spec(&self) -> &MatchSpec<Ctx> {
        &self.spec
    }

    /// The wrapped middleware.
    #[must_use]
    pub fn parent(&self) -> &M {
        &self.parent
    }

    /// Unwrap, discarding the skip criteria.
    pub fn into_parent(self) -> M {
        self.parent
    }
}

impl<Ctx, M, T, E> Middleware<Ctx, Result<T, E>> for Unless<Ctx, M>
where
    Ctx: CallContext,
    M: Middleware<Ctx, Result<T, E>>,
    E: From<SkipError>,
{
    fn call(&self, ctx: &mut Ctx, next: Next<'_, Ctx, Result<T, E>>) -> Result<T, E> {
        if self.spec.should_skip(ctx)? {
            trace!(call = ctx.name(), call_type = ctx.call_type(), "skipping middleware");
            return next.run(ctx);
        }
        self.parent.call(ctx, next)
    }
}

impl<Ctx, M: Clone> Clone for Unless<Ctx, M> {
    fn clone(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            spec: Arc::clone(&self.spec),
        }
    }
}

impl<Ctx, M: fmt::Debug> fmt::Debug for Unless<Ctx, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unless")
            .field("parent", &self.parent)
            .field("spec", &self.spec)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// A reusable "wrap with unless" transformation.
///
/// Normalizes its options once; every middleware it wraps shares the
/// resulting spec.
///
/// ```
/// use unless::prelude::*;
///
/// fn log(call: &mut Call, next: Next<'_, Call, Result<(), SkipError>>) -> Result<(), SkipError> {
///     next.run(call)
/// }
///
/// let layer = UnlessLayer::<Call>::new(CallType::Duplex);
/// let wrapped = layer.layer(log);
/// assert_eq!(wrapped.spec().types(), ["duplex"]);
/// ```
pub struct UnlessLayer<Ctx> {
    spec: Arc<MatchSpec<Ctx>>,
}

impl<Ctx> UnlessLayer<Ctx> {
    /// Build a layer with the gRPC vocabulary, permissively.
    pub fn new(options: impl Into<Options<Ctx>>) -> Self {
        Self::from_spec(match_spec(options))
    }

    /// Build a layer with a specific normalizer.
    ///
    /// # Errors
    ///
    /// Returns the normalizer's error in strict mode.
    pub fn with_normalizer<V: CallTypeVocabulary>(
        normalizer: &Normalizer<V>,
        options: impl Into<Options<Ctx>>,
    ) -> Result<Self, UnlessError> {
        normalizer.normalize(options).map(Self::from_spec)
    }

    /// Build a layer from an already normalized spec.
    pub fn from_spec(spec: MatchSpec<Ctx>) -> Self {
        Self {
            spec: Arc::new(spec),
        }
    }

    /// Wrap a middleware.
    pub fn layer<M>(&self, parent: M) -> Unless<Ctx, M> {
        Unless::with_shared_spec(parent, Arc::clone(&self.spec))
    }
}

impl<Ctx> Clone for UnlessLayer<Ctx> {
    fn clone(&self) -> Self {
        Self {
            spec: Arc::clone(&self.spec),
        }
    }
}

impl<Ctx> fmt::Debug for UnlessLayer<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlessLayer")
            .field("spec", &self.spec)
            .finish()
    }
}

/// Extension trait adding `.unless(...)` to middleware values.
///
/// ```ignore
/// app.use_middleware(request_id.unless("Health"));
/// app.use_middleware(to_json.unless(RawSpec::new().call_type([CallType::Duplex, CallType::ResponseStream])));
/// ```
pub trait UnlessExt: Sized {
    /// Skip this middleware for calls matching `options` (gRPC vocabulary, permissive).
    fn unless<Ctx>(self, options: impl Into<Options<Ctx>>) -> Unless<Ctx, Self> {
        Unless::new(self, match_spec(options))
    }

    /// Skip this middleware for calls matching `options`, normalized by `normalizer`.
    ///
    /// # Errors
    ///
    /// Returns the normalizer's error in strict mode.
    fn unless_with<Ctx, V: CallTypeVocabulary>(
        self,
        normalizer: &Normalizer<V>,
        options: impl Into<Options<Ctx>>,
    ) -> Result<Unless<Ctx, Self>, UnlessError> {
        Ok(Unless::new(self, normalizer.normalize(options)?))
    }
}

impl<M: Send + Sync> UnlessExt for M {}
