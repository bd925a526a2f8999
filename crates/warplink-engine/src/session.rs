//! Per-session handshake state.

use std::time::Instant;
use warplink_core::Warp;

/// Where an in-flight session stands. Terminal states are not phases; the
/// engine drops a session the moment it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// We initiated and are awaiting the warp acknowledgement.
    WarpSent,
    /// We engaged and are awaiting the final acknowledgement.
    EngageSent,
    /// We accepted a peer's warp and are awaiting their engage.
    WarpAcked,
}

#[derive(Debug)]
pub(crate) enum Session {
    /// We sent the warp and drive the handshake forward.
    Initiator {
        phase: InitiatorPhase,
        /// The warp as we sent it. The engage is derived from this copy,
        /// never from an echo off the bus.
        warp: Warp,
        started: Instant,
    },
    /// We accepted a peer's warp and wait for them to engage.
    Responder { started: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InitiatorPhase {
    WarpSent,
    EngageSent,
}

impl Session {
    pub(crate) fn phase(&self) -> SessionPhase {
        match self {
            Session::Initiator {
                phase: InitiatorPhase::WarpSent,
                ..
            } => SessionPhase::WarpSent,
            Session::Initiator {
                phase: InitiatorPhase::EngageSent,
                ..
            } => SessionPhase::EngageSent,
            Session::Responder { .. } => SessionPhase::WarpAcked,
        }
    }

    pub(crate) fn started(&self) -> Instant {
        match self {
            Session::Initiator { started, .. } | Session::Responder { started } => *started,
        }
    }
}
