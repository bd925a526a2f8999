//! Wire messages for the two-phase warp handshake.
//!
//! Four handshake kinds plus a presence broadcast, all JSON objects
//! discriminated by a `kind` field:
//!
//! ```text
//! initiator                        responder
//!   Warp ------------------------->  decide
//!        <------------------------- AckWarp { ok }
//!   Engage ----------------------->  decide
//!        <------------------------- AckEngage { ok }
//! ```
//!
//! Acks embed the message they acknowledge under `ref` and repeat its
//! session id at the top level.

use crate::{Destination, Payload, Referer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Correlation token scoping one handshake attempt.
///
/// Minted by the initiator, never regenerated mid-handshake, discarded once
/// the handshake reaches a terminal state. Cannot be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random session id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = SessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SessionIdError::Empty);
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for SessionId {
    type Error = SessionIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(SessionIdError::Empty);
        }
        Ok(Self(s))
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Error parsing a session id.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionIdError {
    #[error("session id cannot be empty")]
    Empty,
}

/// The user performing the warp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Opaque token or callback address the destination may use to verify
    /// the user.
    pub auth: String,
}

impl User {
    pub fn new(id: impl Into<String>, auth: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            auth: auth.into(),
        }
    }
}

/// First phase: request a jump to a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warp {
    pub session_id: SessionId,
    pub user: User,
    pub destination: Destination,
    /// Identifier of the portal the warp was triggered through, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal: Option<String>,
    pub referer: Referer,
}

impl Warp {
    pub fn new(session_id: SessionId, user: User, destination: Destination, referer: Referer) -> Self {
        Self {
            session_id,
            user,
            destination,
            portal: None,
            referer,
        }
    }
}

/// Second phase: the initiator confirms after a positive warp ack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engage {
    pub session_id: SessionId,
    pub user: User,
    pub referer: Referer,
}

impl Engage {
    /// Derive from the warp being confirmed, preserving its session id.
    pub fn from_warp(warp: &Warp, referer: Referer) -> Self {
        Self {
            session_id: warp.session_id.clone(),
            user: warp.user.clone(),
            referer,
        }
    }
}

/// Acknowledgement of a [`Warp`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckWarp {
    pub session_id: SessionId,
    pub ok: bool,
    /// The warp being acknowledged.
    #[serde(rename = "ref")]
    pub warp: Warp,
    pub referer: Referer,
}

impl AckWarp {
    /// Wrap an outcome around the warp it answers. The session id is copied
    /// from the warp, so the two always agree on construction.
    pub fn new(warp: Warp, ok: bool, referer: Referer) -> Self {
        Self {
            session_id: warp.session_id.clone(),
            ok,
            warp,
            referer,
        }
    }

    /// An ack must repeat the session id of the message it acknowledges.
    /// Decoded input can violate this; such acks are dropped.
    pub fn is_coherent(&self) -> bool {
        self.session_id == self.warp.session_id
    }
}

/// Acknowledgement of an [`Engage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckEngage {
    pub session_id: SessionId,
    pub ok: bool,
    /// The engage being acknowledged.
    #[serde(rename = "ref")]
    pub engage: Engage,
    pub referer: Referer,
}

impl AckEngage {
    pub fn new(engage: Engage, ok: bool, referer: Referer) -> Self {
        Self {
            session_id: engage.session_id.clone(),
            ok,
            engage,
            referer,
        }
    }

    pub fn is_coherent(&self) -> bool {
        self.session_id == self.engage.session_id
    }
}

/// Presence broadcast published once when a context joins the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announce {
    /// The announcing context's address.
    pub urn: String,
    pub referer: Referer,
}

/// Any protocol message, discriminated on the wire by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Warp(Warp),
    Engage(Engage),
    AckWarp(AckWarp),
    AckEngage(AckEngage),
    Announce(Announce),
}

impl Message {
    /// The origin tag of whichever variant this is.
    pub fn referer(&self) -> &Referer {
        match self {
            Message::Warp(m) => &m.referer,
            Message::Engage(m) => &m.referer,
            Message::AckWarp(m) => &m.referer,
            Message::AckEngage(m) => &m.referer,
            Message::Announce(m) => &m.referer,
        }
    }

    /// The session id, for the kinds that carry one.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Message::Warp(m) => Some(&m.session_id),
            Message::Engage(m) => Some(&m.session_id),
            Message::AckWarp(m) => Some(&m.session_id),
            Message::AckEngage(m) => Some(&m.session_id),
            Message::Announce(_) => None,
        }
    }

    /// Serialize to the wire encoding.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap()
    }

    /// Decode a raw bus payload.
    ///
    /// Any failure means "not a protocol message"; the caller keeps trying
    /// other handlers.
    pub fn decode(payload: &Payload) -> Result<Self, DecodeError> {
        match payload {
            Payload::Text(text) => Ok(serde_json::from_str(text)?),
            Payload::Object(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }
}

/// Why a payload is not a protocol message.
#[derive(Debug, thiserror::Error)]
#[error("not a protocol message: {0}")]
pub struct DecodeError(#[from] serde_json::Error);
