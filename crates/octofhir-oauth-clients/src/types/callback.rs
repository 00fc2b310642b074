//! Absolute callback URIs and the rules for comparing them.
//!
//! Every callback that reaches a client record, and every callback the
//! validator hands back, is an [`AbsoluteUri`]. Parsing goes through the
//! `url` crate, which lowercases the scheme and host and drops the scheme's
//! default port, so two spellings of the same target compare equal.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::{Host, Url};

// =============================================================================
// Uri Error
// =============================================================================

/// Reasons a string is not an acceptable absolute callback URI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    /// The input was empty or only whitespace.
    #[error("URI is empty")]
    Empty,

    /// The input carries leading/trailing whitespace or embedded control characters.
    #[error("URI contains whitespace or control characters")]
    Whitespace,

    /// The input has no scheme.
    #[error("URI is relative")]
    Relative,

    /// The input has a scheme but no authority (`mailto:`, `urn:`, `file:///`).
    #[error("URI has no host")]
    MissingHost,

    /// The input embeds credentials in the authority.
    #[error("URI must not contain user information")]
    UserInfo,

    /// The input could not be parsed at all.
    #[error("URI is malformed: {0}")]
    Malformed(String),
}

// =============================================================================
// Absolute Uri
// =============================================================================

/// A parsed, normalized URI with a scheme and a non-empty host.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AbsoluteUri(Url);

impl AbsoluteUri {
    /// Parses and normalizes an absolute URI.
    ///
    /// # Errors
    ///
    /// Returns a [`UriError`] if the input is empty, relative, has no host,
    /// carries userinfo, or is otherwise malformed.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        if input.trim().is_empty() {
            return Err(UriError::Empty);
        }
        // The url parser silently strips these; a callback carrying them is suspect.
        if input.trim() != input || input.contains(['\t', '\r', '\n']) {
            return Err(UriError::Whitespace);
        }

        let url = Url::parse(input).map_err(|e| match e {
            url::ParseError::RelativeUrlWithoutBase => UriError::Relative,
            url::ParseError::EmptyHost => UriError::MissingHost,
            other => UriError::Malformed(other.to_string()),
        })?;

        if url.cannot_be_a_base() || url.host_str().is_none_or(str::is_empty) {
            return Err(UriError::MissingHost);
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(UriError::UserInfo);
        }

        Ok(Self(url))
    }

    /// Returns the normalized string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying [`Url`].
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Consumes the wrapper and returns the underlying [`Url`].
    #[must_use]
    pub fn into_url(self) -> Url {
        self.0
    }

    /// Returns the lowercase scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Returns `true` for `http` URIs on the literal loopback addresses
    /// `127.0.0.1` and `[::1]`.
    ///
    /// `localhost` is deliberately not included; it can be resolved to a
    /// non-loopback interface.
    #[must_use]
    pub fn is_loopback_ip(&self) -> bool {
        if self.0.scheme() != "http" {
            return false;
        }
        match self.0.host() {
            Some(Host::Ipv4(ip)) => ip == Ipv4Addr::LOCALHOST,
            Some(Host::Ipv6(ip)) => ip == Ipv6Addr::LOCALHOST,
            _ => false,
        }
    }

    /// Compares two callbacks under the given matching mode.
    #[must_use]
    pub fn matches(&self, registered: &AbsoluteUri, matching: CallbackMatching) -> bool {
        match matching {
            CallbackMatching::Exact => self == registered,
            CallbackMatching::LoopbackAnyPort => {
                if self.is_loopback_ip() && registered.is_loopback_ip() {
                    eq_ignoring_port(&self.0, &registered.0)
                } else {
                    self == registered
                }
            }
        }
    }
}

fn eq_ignoring_port(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host() == b.host()
        && a.path() == b.path()
        && a.query() == b.query()
        && a.fragment() == b.fragment()
}

impl fmt::Debug for AbsoluteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AbsoluteUri")
            .field(&self.0.as_str())
            .finish()
    }
}

impl fmt::Display for AbsoluteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for AbsoluteUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AbsoluteUri {
    type Error = UriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for AbsoluteUri {
    type Error = UriError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AbsoluteUri> for String {
    fn from(uri: AbsoluteUri) -> Self {
        uri.0.into()
    }
}

impl AsRef<str> for AbsoluteUri {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

// =============================================================================
// Matching Mode
// =============================================================================

/// How a requested callback is compared with a registered one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackMatching {
    /// Full normalized URI equality: scheme, host, port, path, query and fragment.
    #[default]
    Exact,

    /// As `Exact`, except that the port of an `http` loopback IP literal is
    /// ignored (RFC 8252 section 7.3, native apps on ephemeral ports).
    LoopbackAnyPort,
}

impl CallbackMatching {
    /// Returns the configuration value for this mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::LoopbackAnyPort => "loopback_any_port",
        }
    }
}

impl fmt::Display for CallbackMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
