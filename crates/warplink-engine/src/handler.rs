//! Role callbacks driven by the engine.

use warplink_core::{AckEngage, AckWarp, Announce, Engage, SessionId, Warp};

/// What a receiver wants done with an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Acknowledge with `ok = true` and proceed.
    Accept,
    /// Acknowledge with `ok = false`; the handshake ends here.
    Decline,
    /// Not ours. The message is left unhandled for other subscribers.
    Ignore,
}

/// How a handshake ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Both phases acknowledged positively.
    Engaged,
    /// One side acknowledged with `ok = false`.
    Rejected,
    /// No acknowledgement arrived within the configured timeout.
    TimedOut,
    /// The handshake was cancelled locally.
    Cancelled,
}

/// Callbacks the engine drives as messages arrive.
///
/// Receiver-side decisions (`on_warp`, `on_engage`) steer the handshake;
/// sender-side hooks observe acknowledgements of messages this context
/// published. Exactly one of the four message hooks fires per dispatched
/// handshake message. `on_closed` fires once per session this engine owns,
/// on its terminal transition.
pub trait WarpHandler {
    /// An inbound warp request. Default: not ours.
    fn on_warp(&mut self, warp: &Warp) -> Decision {
        let _ = warp;
        Decision::Ignore
    }

    /// The initiator engaged a warp we previously accepted. Default: accept.
    ///
    /// [`Decision::Ignore`] is treated as [`Decision::Decline`] here; the
    /// session is already ours.
    fn on_engage(&mut self, engage: &Engage) -> Decision {
        let _ = engage;
        Decision::Accept
    }

    /// Our warp was acknowledged, positively or not.
    fn on_ack_warp(&mut self, ack: &AckWarp) {
        let _ = ack;
    }

    /// Our engage was acknowledged; the handshake is over.
    fn on_ack_engage(&mut self, ack: &AckEngage) {
        let _ = ack;
    }

    /// Another context announced itself on the bus.
    fn on_announce(&mut self, announce: &Announce) {
        let _ = announce;
    }

    /// A session this engine owned reached a terminal state.
    fn on_closed(&mut self, session: &SessionId, outcome: Outcome) {
        let _ = (session, outcome);
    }
}
