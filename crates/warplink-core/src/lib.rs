//! Envelope types for the Warplink two-phase warp handshake.
//!
//! A warp is a negotiated jump between two applications sharing a broadcast
//! bus: the initiator publishes a [`Warp`], the receiving side acknowledges,
//! the initiator confirms with an [`Engage`], and a final acknowledgement
//! seals the jump. This crate defines the wire messages and the JSON codec;
//! the handshake rules live in `warplink-engine`, and transports live under
//! `crates/connectors`.

mod destination;
mod message;
mod referer;

pub use destination::{Destination, DestinationError};
pub use message::{
    AckEngage, AckWarp, Announce, DecodeError, Engage, Message, SessionId, SessionIdError, User,
    Warp,
};
pub use referer::Referer;

/// A raw delivery from the bus, before protocol decoding.
///
/// Broadcast transports hand subscribers either serialized text or an
/// already structured object; dispatch accepts both.
#[derive(Debug, Clone)]
pub enum Payload {
    Text(String),
    Object(serde_json::Value),
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Object(value)
    }
}
