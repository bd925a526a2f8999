//! Where a warp leads.

use serde::{Deserialize, Serialize};

/// A warp target: either a structured link (how and where to open it) or an
/// opaque URI the receiving application knows how to resolve.
///
/// Resolving the target is the receiver's concern; this type only guarantees
/// the descriptor is well formed. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Destination {
    /// Structured link: browser profile, window target, URL.
    Link {
        browser: String,
        target: String,
        url: String,
    },
    /// Opaque URI, e.g. `secondlife://Ahern/128/128`.
    Uri(String),
}

impl Destination {
    /// Structured link. Fails if `url` is empty.
    pub fn link(
        browser: impl Into<String>,
        target: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, DestinationError> {
        let url = url.into();
        if url.is_empty() {
            return Err(DestinationError::EmptyUrl);
        }
        Ok(Destination::Link {
            browser: browser.into(),
            target: target.into(),
            url,
        })
    }

    /// Opaque URI. Fails if empty or missing a scheme.
    pub fn uri(uri: impl Into<String>) -> Result<Self, DestinationError> {
        let uri = uri.into();
        if uri.is_empty() {
            return Err(DestinationError::EmptyUri);
        }
        match uri.split_once(':') {
            Some((scheme, _)) if !scheme.is_empty() => Ok(Destination::Uri(uri)),
            _ => Err(DestinationError::MissingScheme(uri)),
        }
    }

    /// The URL or URI text, whichever shape this is.
    pub fn address(&self) -> &str {
        match self {
            Destination::Link { url, .. } => url,
            Destination::Uri(uri) => uri,
        }
    }
}

/// Error validating a destination descriptor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DestinationError {
    #[error("destination url cannot be empty")]
    EmptyUrl,
    #[error("destination uri cannot be empty")]
    EmptyUri,
    #[error("destination uri has no scheme: {0}")]
    MissingScheme(String),
}
