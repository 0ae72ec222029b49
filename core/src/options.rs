//! `Options`: what the caller hands to `unless`, and its normalization
//!
//! Callers describe skip criteria in whichever shape is most convenient:
//!
//! | Shape                | Meaning                                              |
//! |----------------------|------------------------------------------------------|
//! | function             | custom test                                          |
//! | string, call type    | `types: [string]`                                    |
//! | string, otherwise    | `names: [literal string]`                            |
//! | regex                | `names: [regex]`                                     |
//! | object (`RawSpec`)   | `name` / `type` (one or many) and `custom`           |
//! | anything else        | empty spec (permissive) or an error (strict)         |
//!
//! The [`Normalizer`] maps each shape to a [`MatchSpec`] exactly once.

use crate::{CallType, CallTypeVocabulary, CustomTest, GrpcCallTypes, MatchSpec, NamePattern};
use crate::{BoxError, UnlessError};
use tracing::debug;

/// Caller-supplied skip options, one variant per accepted input shape.
pub enum Options<Ctx> {
    /// A custom test function.
    Custom(CustomTest<Ctx>),
    /// A bare string: a call type if the vocabulary knows it, else a call name.
    Str(String),
    /// A bare regex matched against the call name.
    Pattern(regex::Regex),
    /// An object with optional `name`, `type` and `custom` fields.
    Raw(RawSpec<Ctx>),
    /// Any other shape, with a short description of what was supplied.
    Unrecognized(String),
}

impl<Ctx> Options<Ctx> {
    /// Options from an infallible test function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Ctx) -> bool + Send + Sync + 'static,
    {
        Self::Custom(CustomTest::new(f))
    }

    /// Options from a test function that can fail.
    pub fn try_custom<F, E>(f: F) -> Self
    where
        F: Fn(&Ctx) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::Custom(CustomTest::fallible(f))
    }

    /// Options of an unsupported shape.
    pub fn unrecognized(shape: impl Into<String>) -> Self {
        Self::Unrecognized(shape.into())
    }

    /// Why strict normalization rejects these options, if it does.
    fn rejection(&self) -> Option<String> {
        match self {
            Self::Unrecognized(shape) => Some(shape.clone()),
            Self::Str(s) if s.is_empty() => Some("empty string".into()),
            Self::Raw(raw) if raw.is_empty() => {
                Some("object without `name`, `type` or `custom`".into())
            }
            _ => None,
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Custom(_) => "custom",
            Self::Str(_) => "string",
            Self::Pattern(_) => "regex",
            Self::Raw(_) => "object",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

impl<Ctx> std::fmt::Debug for Options<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom(t) => f.debug_tuple("Custom").field(t).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(re).finish(),
            Self::Raw(raw) => f.debug_tuple("Raw").field(raw).finish(),
            Self::Unrecognized(s) => f.debug_tuple("Unrecognized").field(s).finish(),
        }
    }
}

impl<Ctx> From<&str> for Options<Ctx> {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl<Ctx> From<String> for Options<Ctx> {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<Ctx> From<CallType> for Options<Ctx> {
    fn from(t: CallType) -> Self {
        Self::Str(t.as_str().to_owned())
    }
}

impl<Ctx> From<regex::Regex> for Options<Ctx> {
    fn from(re: regex::Regex) -> Self {
        Self::Pattern(re)
    }
}

impl<Ctx> From<CustomTest<Ctx>> for Options<Ctx> {
    fn from(test: CustomTest<Ctx>) -> Self {
        Self::Custom(test)
    }
}

impl<Ctx> From<RawSpec<Ctx>> for Options<Ctx> {
    fn from(raw: RawSpec<Ctx>) -> Self {
        Self::Raw(raw)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Object shape
// ═══════════════════════════════════════════════════════════════════════════════

/// A field that accepts a single value or a list of values.
///
/// Always flattened to a `Vec`; absent means empty, never "everything".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OneOrMany<T> {
    /// Field absent.
    #[default]
    None,
    /// A single value.
    One(T),
    /// A list of values.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flatten into a list.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::None => Vec::new(),
            Self::One(v) => vec![v],
            Self::Many(vs) => vs,
        }
    }

    /// Returns `true` if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::One(_) => false,
            Self::Many(vs) => vs.is_empty(),
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(v: T) -> Self {
        Self::One(v)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(vs: Vec<T>) -> Self {
        Self::Many(vs)
    }
}

impl From<&str> for OneOrMany<NamePattern> {
    fn from(name: &str) -> Self {
        Self::One(NamePattern::literal(name))
    }
}

impl From<regex::Regex> for OneOrMany<NamePattern> {
    fn from(re: regex::Regex) -> Self {
        Self::One(NamePattern::Regex(re))
    }
}

impl From<&str> for OneOrMany<String> {
    fn from(tag: &str) -> Self {
        Self::One(tag.to_owned())
    }
}

impl From<CallType> for OneOrMany<String> {
    fn from(t: CallType) -> Self {
        Self::One(t.as_str().to_owned())
    }
}

impl<const N: usize> From<[CallType; N]> for OneOrMany<String> {
    fn from(ts: [CallType; N]) -> Self {
        Self::Many(ts.iter().map(|t| t.as_str().to_owned()).collect())
    }
}

/// The object shape of [`Options`].
///
/// # Example
///
/// ```
/// use unless::prelude::*;
///
/// let raw: RawSpec<Call> = RawSpec::new()
///     .name(vec![NamePattern::literal("Other"), NamePattern::regex_ignore_case("fake").unwrap()])
///     .call_type([CallType::Duplex, CallType::RequestStream])
///     .custom(CustomTest::new(|call: &Call| call.call_type() == "duplex"));
///
/// let spec = unless::match_spec(raw);
/// assert!(!spec.should_skip(&Call::unary("testCall")).unwrap());
/// ```
pub struct RawSpec<Ctx> {
    /// Call-name criteria (the `name` key).
    pub name: OneOrMany<NamePattern>,
    /// Call-type criteria (the `type` key).
    pub call_type: OneOrMany<String>,
    /// Custom test.
    pub custom: Option<CustomTest<Ctx>>,
}

impl<Ctx> RawSpec<Ctx> {
    /// An object with no fields set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: OneOrMany::None,
            call_type: OneOrMany::None,
            custom: None,
        }
    }

    /// Set the `name` field.
    #[must_use]
    pub fn name(mut self, name: impl Into<OneOrMany<NamePattern>>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the `type` field.
    #[must_use]
    pub fn call_type(mut self, call_type: impl Into<OneOrMany<String>>) -> Self {
        self.call_type = call_type.into();
        self
    }

    /// Set the `custom` field.
    #[must_use]
    pub fn custom(mut self, test: CustomTest<Ctx>) -> Self {
        self.custom = Some(test);
        self
    }

    /// Returns `true` if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.call_type.is_empty() && self.custom.is_none()
    }
}

impl<Ctx> Default for RawSpec<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> std::fmt::Debug for RawSpec<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawSpec")
            .field("name", &self.name)
            .field("call_type", &self.call_type)
            .field("custom", &self.custom)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Normalization
// ═══════════════════════════════════════════════════════════════════════════════

/// How to treat options that do not match any supported shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Degrade to an empty spec: the wrapped middleware always runs.
    #[default]
    Permissive,
    /// Reject with [`UnlessError::UnrecognizedOptions`].
    Strict,
}

/// Builds [`MatchSpec`]s from [`Options`].
///
/// Holds the call-type vocabulary used to classify bare strings.
///
/// # Example
///
/// ```
/// use unless::prelude::*;
///
/// let normalizer = Normalizer::with_vocabulary(["fire_and_forget", "request_response"]);
///
/// let spec: MatchSpec<Call> = normalizer.normalize("fire_and_forget").unwrap();
/// assert_eq!(spec.types(), ["fire_and_forget"]);
///
/// // Not in this vocabulary, so it is a call name.
/// let spec: MatchSpec<Call> = normalizer.normalize("unary").unwrap();
/// assert_eq!(spec.names().len(), 1);
///
/// let strict = Normalizer::new().strict();
/// assert!(strict.normalize::<Call>(Options::unrecognized("number 42")).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Normalizer<V = GrpcCallTypes> {
    vocabulary: V,
    strictness: Strictness,
}

impl Normalizer<GrpcCallTypes> {
    /// A permissive normalizer over the gRPC call-type vocabulary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_vocabulary(GrpcCallTypes)
    }
}

impl<V: CallTypeVocabulary> Normalizer<V> {
    /// A permissive normalizer over a custom call-type vocabulary.
    #[must_use]
    pub fn with_vocabulary(vocabulary: V) -> Self {
        Self {
            vocabulary,
            strictness: Strictness::Permissive,
        }
    }

    /// Reject unrecognized options instead of matching nothing.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strictness = Strictness::Strict;
        self
    }

    /// Set the strictness explicitly.
    #[must_use]
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// The configured strictness.
    #[must_use]
    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// The injected call-type vocabulary.
    #[must_use]
    pub fn vocabulary(&self) -> &V {
        &self.vocabulary
    }

    /// Normalize options into a canonical [`MatchSpec`].
    ///
    /// # Errors
    ///
    /// Returns [`UnlessError::UnrecognizedOptions`] in strict mode when the
    /// options have no supported shape or set no criterion. Permissive
    /// normalization always succeeds.
    pub fn normalize<Ctx>(
        &self,
        options: impl Into<Options<Ctx>>,
    ) -> Result<MatchSpec<Ctx>, UnlessError> {
        let options = options.into();
        if self.strictness == Strictness::Strict {
            if let Some(shape) = options.rejection() {
                return Err(UnlessError::UnrecognizedOptions { shape });
            }
        }
        Ok(self.build(options))
    }

    fn build<Ctx>(&self, options: Options<Ctx>) -> MatchSpec<Ctx> {
        let shape = options.shape();
        let spec = match options {
            Options::Custom(test) => MatchSpec::empty().with_custom_test(test),
            Options::Str(s) if s.is_empty() => {
                debug!("empty string is no criterion, matching nothing");
                MatchSpec::empty()
            }
            Options::Str(s) if self.vocabulary.contains(&s) => {
                debug!(call_type = %s, "bare string is a call type");
                MatchSpec::new(None, Vec::new(), vec![s])
            }
            Options::Str(s) => MatchSpec::new(None, vec![NamePattern::literal(s)], Vec::new()),
            Options::Pattern(re) => MatchSpec::new(None, vec![NamePattern::Regex(re)], Vec::new()),
            Options::Raw(raw) => MatchSpec::new(
                raw.custom,
                present(raw.name, NamePattern::is_blank),
                present(raw.call_type, String::is_empty),
            ),
            Options::Unrecognized(what) => {
                debug!(shape = %what, "unrecognized unless options, matching nothing");
                MatchSpec::empty()
            }
        };
        debug!(
            shape,
            names = spec.names().len(),
            types = spec.types().len(),
            custom = spec.custom_test().is_some(),
            "normalized unless options"
        );
        spec
    }
}

/// Flatten a field; a single empty value counts as absent.
fn present<T>(field: OneOrMany<T>, blank: impl Fn(&T) -> bool) -> Vec<T> {
    match field {
        OneOrMany::One(v) if blank(&v) => Vec::new(),
        other => other.into_vec(),
    }
}

/// Normalize options with the gRPC vocabulary, permissively.
///
/// Never fails: unrecognized options yield an empty spec.
///
/// ```
/// use unless::{match_spec, Call, CallType};
///
/// let spec = match_spec::<Call>(CallType::Unary);
/// assert_eq!(spec.types(), ["unary"]);
///
/// let spec = match_spec::<Call>("TestCall");
/// assert!(spec.should_skip(&Call::unary("testCall")).unwrap());
/// ```
pub fn match_spec<Ctx>(options: impl Into<Options<Ctx>>) -> MatchSpec<Ctx> {
    Normalizer::new().build(options.into())
}
