//! Origin tagging for echo suppression.
//!
//! Every message a context publishes carries a [`Referer`]: the context's
//! address with the scheme stripped, plus a random instance id minted once
//! per process. A subscriber that sees its own tag on an inbound message is
//! looking at its own publication reflected back by the bus.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Origin tag attached to every outbound message.
///
/// Serialized as a two-element array: `["host/path", "<instance id>"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Referer {
    origin: String,
    instance: String,
}

impl Referer {
    /// Tag a context by its address, with a fresh random instance id.
    ///
    /// Two contexts serving the same address still get distinct tags.
    pub fn generate(address: &str) -> Self {
        Self {
            origin: origin_fragment(address),
            instance: Uuid::new_v4().to_string(),
        }
    }

    /// Rebuild a tag from known parts.
    pub fn from_parts(origin: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            instance: instance.into(),
        }
    }

    /// The address fragment, scheme and leading `www.` removed.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The per-process random component.
    pub fn instance(&self) -> &str {
        &self.instance
    }
}

impl fmt::Display for Referer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.origin, self.instance)
    }
}

impl From<(String, String)> for Referer {
    fn from((origin, instance): (String, String)) -> Self {
        Self { origin, instance }
    }
}

impl From<Referer> for (String, String) {
    fn from(referer: Referer) -> Self {
        (referer.origin, referer.instance)
    }
}

/// Strip the scheme and a leading `www.` from an address.
///
/// `https://www.example.com/hub` becomes `example.com/hub`. An address
/// without a scheme is returned as-is.
fn origin_fragment(address: &str) -> String {
    let rest = address
        .split_once("://")
        .map_or(address, |(_, rest)| rest);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);
    rest.to_string()
}
