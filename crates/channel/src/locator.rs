//! Addresses for result channels.
//!
//! An asynchronous task may be long running and survive restarts, so the
//! side that eventually writes the result must be able to rebuild the sink
//! from a string stored with the original request. The grammar is
//! `<SCHEME>[;<opaque-suffix>]`: the scheme picks the channel type, the
//! suffix carries any connection details the scheme needs.

use serde::{Deserialize, Serialize};

const LOCAL_SCHEME: &str = "LOCAL";

/// A re-resolvable sink address such as `LOCAL`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsyncResultChannelSinkLocator(String);

impl AsyncResultChannelSinkLocator {
    /// The in-process channel.
    pub fn local() -> Self {
        Self(LOCAL_SCHEME.to_string())
    }

    /// Wrap a raw locator string.
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// Build from a scheme and suffix.
    pub fn from_parts(scheme: &str, suffix: &str) -> Self {
        Self(format!("{scheme};{suffix}"))
    }

    /// The channel type, i.e. everything before the first `;`.
    pub fn scheme(&self) -> &str {
        self.0.split_once(';').map_or(self.0.as_str(), |(scheme, _)| scheme)
    }

    /// Connection details after the first `;`, if any.
    pub fn suffix(&self) -> Option<&str> {
        self.0.split_once(';').map(|(_, suffix)| suffix)
    }

    /// Whether this addresses the in-process channel.
    pub fn is_local(&self) -> bool {
        self.scheme() == LOCAL_SCHEME
    }

    /// The raw string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AsyncResultChannelSinkLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for AsyncResultChannelSinkLocator {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
