//! Call context and call-type vocabulary
//!
//! The evaluator reads exactly two things from a call: its method name and its
//! call type. Dispatch frameworks expose those through [`CallContext`]; nothing
//! else about the context is visible here, and nothing is ever written back.
//!
//! Which strings count as call types is decided by a [`CallTypeVocabulary`],
//! injected at configuration time. [`GrpcCallTypes`] is the default.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Read-only view of an in-flight call.
///
/// # Example
///
/// ```
/// use unless::CallContext;
///
/// struct RpcCtx {
///     method: String,
///     kind: &'static str,
/// }
///
/// impl CallContext for RpcCtx {
///     fn name(&self) -> &str {
///         &self.method
///     }
///
///     fn call_type(&self) -> &str {
///         self.kind
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `CallContext`",
    label = "the skip predicate cannot read a call name and call type from this type",
    note = "implement `name()` and `call_type()` for your dispatch framework's context"
)]
pub trait CallContext {
    /// The call's method name, as received from the dispatch layer.
    fn name(&self) -> &str;

    /// The call's invocation style (e.g. `"unary"`).
    fn call_type(&self) -> &str;
}

impl<T: CallContext + ?Sized> CallContext for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn call_type(&self) -> &str {
        (**self).call_type()
    }
}

impl<T: CallContext + ?Sized> CallContext for &mut T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn call_type(&self) -> &str {
        (**self).call_type()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// gRPC call types
// ═══════════════════════════════════════════════════════════════════════════════

/// The streaming shape of a gRPC call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallType {
    /// Single request, single response.
    Unary,
    /// Client streams requests, server sends one response.
    RequestStream,
    /// Client sends one request, server streams responses.
    ResponseStream,
    /// Both sides stream.
    Duplex,
}

impl CallType {
    /// Every call type, in declaration order.
    pub const ALL: [CallType; 4] = [
        Self::Unary,
        Self::RequestStream,
        Self::ResponseStream,
        Self::Duplex,
    ];

    /// Wire tag for this call type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unary => "unary",
            Self::RequestStream => "request_stream",
            Self::ResponseStream => "response_stream",
            Self::Duplex => "duplex",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a gRPC call-type tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown call type \"{0}\"")]
pub struct UnknownCallType(pub String);

impl FromStr for CallType {
    type Err = UnknownCallType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownCallType(s.to_owned()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Vocabulary
// ═══════════════════════════════════════════════════════════════════════════════

/// The set of strings recognized as call-type tags.
///
/// Consulted only while normalizing a bare string option: a member becomes a
/// type criterion, anything else a call-name criterion. Membership is exact
/// and case-sensitive.
pub trait CallTypeVocabulary: Send + Sync {
    /// Returns `true` if `tag` is a known call type.
    fn contains(&self, tag: &str) -> bool;
}

/// The gRPC call-type vocabulary (see [`CallType`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct GrpcCallTypes;

impl CallTypeVocabulary for GrpcCallTypes {
    fn contains(&self, tag: &str) -> bool {
        tag.parse::<CallType>().is_ok()
    }
}

impl CallTypeVocabulary for [&str] {
    fn contains(&self, tag: &str) -> bool {
        self.iter().any(|t| *t == tag)
    }
}

impl<const N: usize> CallTypeVocabulary for [&str; N] {
    fn contains(&self, tag: &str) -> bool {
        CallTypeVocabulary::contains(self.as_slice(), tag)
    }
}

impl CallTypeVocabulary for Vec<String> {
    fn contains(&self, tag: &str) -> bool {
        self.iter().any(|t| t == tag)
    }
}

impl CallTypeVocabulary for HashSet<String> {
    fn contains(&self, tag: &str) -> bool {
        HashSet::contains(self, tag)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Simple context
// ═══════════════════════════════════════════════════════════════════════════════

/// A minimal owned call context.
///
/// Use this for tests, the CLI, or frameworks that build a context per call
/// anyway. Production integrations usually implement [`CallContext`] on their
/// own context type instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Call {
    name: String,
    call_type: String,
}

impl Call {
    /// Create a call with the given method name and call type.
    pub fn new(name: impl Into<String>, call_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            call_type: call_type.into(),
        }
    }

    /// Create a unary call.
    pub fn unary(name: impl Into<String>) -> Self {
        Self::new(name, CallType::Unary.as_str())
    }

    /// Replace the call type (builder pattern).
    #[must_use]
    pub fn with_type(mut self, call_type: impl Into<String>) -> Self {
        self.call_type = call_type.into();
        self
    }
}

impl CallContext for Call {
    fn name(&self) -> &str {
        &self.name
    }

    fn call_type(&self) -> &str {
        &self.call_type
    }
}
