//! Dispatch and session tracking.

use crate::handler::{Decision, Outcome, WarpHandler};
use crate::session::{InitiatorPhase, Session, SessionPhase};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use warplink_core::{
    AckEngage, AckWarp, Announce, Destination, Engage, Message, Payload, Referer, SessionId, User,
    Warp,
};

/// Engine tuning.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Drop in-flight sessions older than this on [`WarpEngine::sweep`].
    /// `None` (the default) never expires them.
    pub handshake_timeout: Option<Duration>,
}

/// Result of feeding one raw payload through the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The payload was ours. Publish each reply, in order.
    Handled(Vec<Message>),
    /// Not a protocol message, or not our session; try other handlers.
    Unhandled,
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled(_))
    }

    /// Replies to publish. Unhandled payloads produce none.
    pub fn into_replies(self) -> Vec<Message> {
        match self {
            Dispatch::Handled(replies) => replies,
            Dispatch::Unhandled => Vec::new(),
        }
    }
}

/// Protocol state engine for one context on the bus.
///
/// Sans-IO: payloads go in through [`WarpEngine::dispatch`], replies come
/// back as [`Message`]s for the caller to publish. One engine holds this
/// context's referer tag and every in-flight session it is party to, in
/// either role. Sessions leave the table on their terminal transition, so
/// the table stays bounded by the number of genuinely in-flight handshakes.
pub struct WarpEngine<H> {
    referer: Referer,
    config: EngineConfig,
    handler: H,
    sessions: HashMap<SessionId, Session>,
}

impl<H: WarpHandler> WarpEngine<H> {
    pub fn new(referer: Referer, config: EngineConfig, handler: H) -> Self {
        Self {
            referer,
            config,
            handler,
            sessions: HashMap::new(),
        }
    }

    pub fn referer(&self) -> &Referer {
        &self.referer
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Presence broadcast for this context.
    pub fn announce(&self, urn: impl Into<String>) -> Message {
        Message::Announce(Announce {
            urn: urn.into(),
            referer: self.referer.clone(),
        })
    }

    /// Start a handshake. Mints a fresh session id and returns it together
    /// with the warp to publish.
    pub fn initiate(
        &mut self,
        user: User,
        destination: Destination,
        portal: Option<String>,
    ) -> (SessionId, Message) {
        let session_id = SessionId::generate();
        let mut warp = Warp::new(
            session_id.clone(),
            user,
            destination,
            self.referer.clone(),
        );
        warp.portal = portal;
        self.sessions.insert(
            session_id.clone(),
            Session::Initiator {
                phase: InitiatorPhase::WarpSent,
                warp: warp.clone(),
                started: Instant::now(),
            },
        );
        tracing::debug!(session = %session_id, destination = warp.destination.address(), "warp initiated");
        (session_id, Message::Warp(warp))
    }

    /// In-flight phase of a session, if the engine still tracks it.
    pub fn phase(&self, session: &SessionId) -> Option<SessionPhase> {
        self.sessions.get(session).map(Session::phase)
    }

    /// Abort an in-flight session. Returns `false` if the engine does not
    /// track it.
    pub fn cancel(&mut self, session: &SessionId) -> bool {
        if self.sessions.remove(session).is_none() {
            return false;
        }
        tracing::debug!(session = %session, "handshake cancelled");
        self.handler.on_closed(session, Outcome::Cancelled);
        true
    }

    /// Expire in-flight sessions older than the configured timeout and
    /// return their ids. A no-op without a timeout.
    pub fn sweep(&mut self) -> Vec<SessionId> {
        let Some(timeout) = self.config.handshake_timeout else {
            return Vec::new();
        };
        let now = Instant::now();
        let stale: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, session)| now.duration_since(session.started()) >= timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            self.sessions.remove(id);
            tracing::debug!(session = %id, "handshake timed out");
            self.handler.on_closed(id, Outcome::TimedOut);
        }
        stale
    }

    /// Feed one raw bus delivery through the protocol.
    ///
    /// Never panics on malformed input: anything that does not decode is
    /// [`Dispatch::Unhandled`]. The engine's own echoes are swallowed.
    pub fn dispatch(&mut self, payload: &Payload) -> Dispatch {
        let message = match Message::decode(payload) {
            Ok(message) => message,
            Err(err) => {
                tracing::trace!(%err, "payload skipped");
                return Dispatch::Unhandled;
            }
        };

        if *message.referer() == self.referer {
            tracing::trace!("own echo suppressed");
            return Dispatch::Handled(Vec::new());
        }

        match message {
            Message::Warp(warp) => self.recv_warp(warp),
            Message::Engage(engage) => self.recv_engage(engage),
            Message::AckWarp(ack) => self.recv_ack_warp(ack),
            Message::AckEngage(ack) => self.recv_ack_engage(ack),
            Message::Announce(announce) => {
                self.handler.on_announce(&announce);
                Dispatch::Handled(Vec::new())
            }
        }
    }

    fn recv_warp(&mut self, warp: Warp) -> Dispatch {
        if self.sessions.contains_key(&warp.session_id) {
            // Duplicate delivery, or a warp reusing a session we already track.
            tracing::debug!(session = %warp.session_id, "warp for a known session dropped");
            return Dispatch::Handled(Vec::new());
        }
        match self.handler.on_warp(&warp) {
            Decision::Ignore => Dispatch::Unhandled,
            Decision::Decline => {
                tracing::debug!(session = %warp.session_id, "warp declined");
                let ack = AckWarp::new(warp, false, self.referer.clone());
                Dispatch::Handled(vec![Message::AckWarp(ack)])
            }
            Decision::Accept => {
                let session_id = warp.session_id.clone();
                self.sessions.insert(
                    session_id.clone(),
                    Session::Responder {
                        started: Instant::now(),
                    },
                );
                tracing::debug!(session = %session_id, "warp accepted");
                let ack = AckWarp::new(warp, true, self.referer.clone());
                Dispatch::Handled(vec![Message::AckWarp(ack)])
            }
        }
    }

    fn recv_engage(&mut self, engage: Engage) -> Dispatch {
        match self.sessions.get(&engage.session_id) {
            Some(Session::Responder { .. }) => {}
            Some(Session::Initiator { .. }) => {
                // Someone is engaging a session we initiated ourselves.
                tracing::warn!(session = %engage.session_id, "out-of-sequence engage dropped");
                return Dispatch::Handled(Vec::new());
            }
            None => return Dispatch::Unhandled,
        }

        let ok = self.handler.on_engage(&engage) == Decision::Accept;
        let session_id = engage.session_id.clone();
        self.sessions.remove(&session_id);
        let ack = AckEngage::new(engage, ok, self.referer.clone());
        let outcome = if ok { Outcome::Engaged } else { Outcome::Rejected };
        tracing::debug!(session = %session_id, ?outcome, "engage answered");
        self.handler.on_closed(&session_id, outcome);
        Dispatch::Handled(vec![Message::AckEngage(ack)])
    }

    fn recv_ack_warp(&mut self, ack: AckWarp) -> Dispatch {
        let Some(session) = self.sessions.get_mut(&ack.session_id) else {
            return Dispatch::Unhandled;
        };
        if !ack.is_coherent() {
            tracing::debug!(session = %ack.session_id, "ack_warp session mismatch, dropped");
            return Dispatch::Handled(Vec::new());
        }
        let Session::Initiator { phase, warp, .. } = session else {
            tracing::debug!(session = %ack.session_id, "ack_warp for a warp we did not send, dropped");
            return Dispatch::Handled(Vec::new());
        };
        if *phase != InitiatorPhase::WarpSent {
            tracing::debug!(session = %ack.session_id, "duplicate ack_warp dropped");
            return Dispatch::Handled(Vec::new());
        }

        self.handler.on_ack_warp(&ack);
        if ack.ok {
            let engage = Engage::from_warp(warp, self.referer.clone());
            *phase = InitiatorPhase::EngageSent;
            tracing::debug!(session = %ack.session_id, "warp acknowledged, engaging");
            Dispatch::Handled(vec![Message::Engage(engage)])
        } else {
            self.sessions.remove(&ack.session_id);
            tracing::debug!(session = %ack.session_id, "warp rejected by peer");
            self.handler.on_closed(&ack.session_id, Outcome::Rejected);
            Dispatch::Handled(Vec::new())
        }
    }

    fn recv_ack_engage(&mut self, ack: AckEngage) -> Dispatch {
        match self.sessions.get(&ack.session_id) {
            Some(Session::Initiator {
                phase: InitiatorPhase::EngageSent,
                ..
            }) => {}
            Some(_) => {
                tracing::debug!(session = %ack.session_id, "unexpected ack_engage dropped");
                return Dispatch::Handled(Vec::new());
            }
            None => return Dispatch::Unhandled,
        }
        if !ack.is_coherent() {
            tracing::debug!(session = %ack.session_id, "ack_engage session mismatch, dropped");
            return Dispatch::Handled(Vec::new());
        }

        self.sessions.remove(&ack.session_id);
        self.handler.on_ack_engage(&ack);
        let outcome = if ack.ok { Outcome::Engaged } else { Outcome::Rejected };
        tracing::debug!(session = %ack.session_id, ?outcome, "handshake closed");
        self.handler.on_closed(&ack.session_id, outcome);
        Dispatch::Handled(Vec::new())
    }
}
