//! `NamePattern`: call-name criteria
//!
//! Two strategies, mirroring the shapes a caller can hand over:
//!
//! - [`NamePattern::Literal`]: whole-name equality, case-insensitive
//! - [`NamePattern::Regex`]: unanchored regex search on the raw name

use std::fmt;

/// A single call-name criterion.
///
/// # Example
///
/// ```
/// use unless::NamePattern;
///
/// let literal = NamePattern::literal("TestCall");
/// assert!(literal.matches("testCall"));
/// assert!(!literal.matches("testCallFake"));
///
/// // Regexes see the name exactly as received.
/// let re = NamePattern::regex("^test").unwrap();
/// assert!(re.matches("testCall"));
/// assert!(!re.matches("TestCall"));
///
/// let re = NamePattern::regex_ignore_case("stc").unwrap();
/// assert!(re.matches("testCall"));
/// ```
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Case-insensitive equality with the whole call name.
    ///
    /// [`NamePattern::literal`] stores the lowercased form; matching folds
    /// both sides either way.
    Literal(String),
    /// Regular expression searched anywhere in the call name (RE2 semantics, linear time).
    Regex(regex::Regex),
}

impl NamePattern {
    /// Create a case-insensitive literal name match.
    pub fn literal(name: impl Into<String>) -> Self {
        Self::Literal(name.into().to_lowercase())
    }

    /// Create a regex name match.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the regex pattern is invalid.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        regex::Regex::new(pattern).map(Self::Regex)
    }

    /// Create a case-insensitive regex name match.
    ///
    /// Prepends `(?i)` to the pattern.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the regex pattern is invalid.
    pub fn regex_ignore_case(pattern: &str) -> Result<Self, regex::Error> {
        regex::Regex::new(&format!("(?i){pattern}")).map(Self::Regex)
    }

    /// Check the pattern against a call name.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Literal(literal) => eq_ignore_case(literal, name),
            Self::Regex(re) => re.is_match(name),
        }
    }

    /// An empty literal, which counts as no criterion at all.
    pub(crate) fn is_blank(&self) -> bool {
        matches!(self, Self::Literal(s) if s.is_empty())
    }

    /// Returns `true` for a regex criterion.
    #[must_use]
    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex(_))
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

impl From<regex::Regex> for NamePattern {
    fn from(re: regex::Regex) -> Self {
        Self::Regex(re)
    }
}

impl From<&str> for NamePattern {
    fn from(name: &str) -> Self {
        Self::literal(name)
    }
}

impl From<String> for NamePattern {
    fn from(name: String) -> Self {
        Self::literal(name)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "Literal(\"{v}\")"),
            Self::Regex(re) => write!(f, "Regex(\"{}\")", re.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_ignores_case() {
        let p = NamePattern::literal("TestCall");
        assert!(p.matches("testCall"));
        assert!(p.matches("TESTCALL"));
        assert!(!p.matches("TestCallFake"));
        assert!(!p.matches("Test"));
    }

    #[test]
    fn literal_variant_built_directly_ignores_case() {
        let p = NamePattern::Literal("TestCall".into());
        assert!(p.matches("TestCall"));
        assert!(p.matches("testCall"));
        assert!(p.matches("TESTCALL"));
        assert!(!p.matches("TestCallFake"));
    }

    #[test]
    fn blank_literal() {
        assert!(NamePattern::literal("").is_blank());
        assert!(!NamePattern::literal("x").is_blank());
        assert!(!NamePattern::regex("").unwrap().is_blank());
    }

    #[test]
    fn literal_is_whole_name() {
        let p = NamePattern::literal("call");
        assert!(!p.matches("testCall"));
    }

    #[test]
    fn literal_non_ascii() {
        let p = NamePattern::literal("ÜBERCALL");
        assert!(p.matches("überCall"));
    }

    #[test]
    fn regex_is_unanchored_and_case_sensitive() {
        let p = NamePattern::regex("stC").unwrap();
        assert!(p.matches("testCall"));
        assert!(!p.matches("TESTCALL"));
        assert!(!p.matches("other"));
    }

    #[test]
    fn regex_ignore_case() {
        let p = NamePattern::regex_ignore_case("stc").unwrap();
        assert!(p.matches("testCall"));
        assert!(p.matches("TESTCALL"));
    }

    #[test]
    fn invalid_regex() {
        assert!(NamePattern::regex("[bad").is_err());
    }

    #[test]
    fn from_conversions() {
        assert!(!NamePattern::from("Other").is_regex());
        assert!(NamePattern::from(regex::Regex::new("fake").unwrap()).is_regex());
    }

    #[test]
    fn display() {
        assert_eq!(
            NamePattern::literal("TestCall").to_string(),
            r#"Literal("testcall")"#
        );
        assert_eq!(
            NamePattern::regex("^test").unwrap().to_string(),
            r#"Regex("^test")"#
        );
    }
}
