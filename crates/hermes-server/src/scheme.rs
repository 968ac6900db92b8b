//! URI scheme names owned by the server.

use std::fmt;

use hermes_config::FALLBACK_SCHEME;

pub use hermes_config::sanitize_scheme;

/// A validated URI scheme: lowercase ASCII letters, digits, `.`, `-` and `+`,
/// starting with a letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scheme(String);

impl Scheme {
    /// Filters `input` down to a legal scheme, as defined by RFC 3986.
    ///
    /// Every character is lowercased, characters outside `[a-z0-9.+-]` are
    /// dropped, and leading non-letters are stripped. Returns `None` when
    /// nothing usable remains.
    #[must_use]
    pub fn sanitize(input: &str) -> Option<Self> {
        sanitize_scheme(input).map(Self)
    }

    /// The scheme bound when nothing else names one.
    #[must_use]
    pub fn fallback() -> Self {
        Self(FALLBACK_SCHEME.to_owned())
    }

    /// The scheme text without the `://` separator.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<str> for Scheme {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Scheme> for String {
    fn from(scheme: Scheme) -> Self {
        scheme.0
    }
}
