//! End-to-end handshake scenarios between two engines sharing a bus.
//!
//! No transport here: messages are carried by hand as wire text, exactly as
//! a broadcast bus would deliver them.

use std::time::Duration;
use warplink_core::{
    AckWarp, Destination, Engage, Message, Payload, Referer, SessionId, User, Warp,
};
use warplink_engine::{
    Decision, Dispatch, EngineConfig, Outcome, SessionPhase, WarpEngine, WarpHandler,
};

/// Test handler with scripted decisions and call accounting.
struct Recorder {
    warp_decision: Decision,
    engage_decision: Decision,
    warps: usize,
    engages: usize,
    ack_warps: usize,
    ack_engages: usize,
    announces: usize,
    closed: Vec<(SessionId, Outcome)>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            warp_decision: Decision::Ignore,
            engage_decision: Decision::Accept,
            warps: 0,
            engages: 0,
            ack_warps: 0,
            ack_engages: 0,
            announces: 0,
            closed: Vec::new(),
        }
    }
}

impl Recorder {
    fn accepting() -> Self {
        Self {
            warp_decision: Decision::Accept,
            ..Self::default()
        }
    }

    fn callbacks(&self) -> usize {
        self.warps + self.engages + self.ack_warps + self.ack_engages
    }
}

impl WarpHandler for Recorder {
    fn on_warp(&mut self, _warp: &Warp) -> Decision {
        self.warps += 1;
        self.warp_decision
    }

    fn on_engage(&mut self, _engage: &Engage) -> Decision {
        self.engages += 1;
        self.engage_decision
    }

    fn on_ack_warp(&mut self, _ack: &AckWarp) {
        self.ack_warps += 1;
    }

    fn on_ack_engage(&mut self, _ack: &warplink_core::AckEngage) {
        self.ack_engages += 1;
    }

    fn on_announce(&mut self, _announce: &warplink_core::Announce) {
        self.announces += 1;
    }

    fn on_closed(&mut self, session: &SessionId, outcome: Outcome) {
        self.closed.push((session.clone(), outcome));
    }
}

fn engine(origin: &str, handler: Recorder) -> WarpEngine<Recorder> {
    WarpEngine::new(Referer::generate(origin), EngineConfig::default(), handler)
}

fn wire(message: &Message) -> Payload {
    Payload::Text(message.encode())
}

fn one_reply(dispatch: Dispatch) -> Message {
    match dispatch {
        Dispatch::Handled(mut replies) if replies.len() == 1 => replies.remove(0),
        other => panic!("expected exactly one reply, got {other:?}"),
    }
}

fn example_user() -> User {
    User::new("u1", "a")
}

fn example_destination() -> Destination {
    Destination::link("_blank", "_blank", "https://example.com/x").unwrap()
}

#[test]
fn full_handshake_engages_both_sides() {
    let mut traveler = engine("https://hub.local/alice", Recorder::default());
    let mut gate = engine("https://hub.local/gate", Recorder::accepting());

    let (session, warp) = traveler.initiate(example_user(), example_destination(), None);
    assert_eq!(traveler.phase(&session), Some(SessionPhase::WarpSent));

    let ack_warp = one_reply(gate.dispatch(&wire(&warp)));
    assert_eq!(gate.phase(&session), Some(SessionPhase::WarpAcked));
    let Message::AckWarp(ref ack) = ack_warp else {
        panic!("expected an ack_warp");
    };
    assert!(ack.ok);
    assert_eq!(ack.session_id, session);

    let engage = one_reply(traveler.dispatch(&wire(&ack_warp)));
    assert_eq!(traveler.phase(&session), Some(SessionPhase::EngageSent));
    let Message::Engage(ref e) = engage else {
        panic!("expected an engage");
    };
    assert_eq!(e.session_id, session);

    let ack_engage = one_reply(gate.dispatch(&wire(&engage)));
    assert_eq!(gate.phase(&session), None);
    assert_eq!(
        gate.handler().closed,
        vec![(session.clone(), Outcome::Engaged)]
    );

    assert_eq!(
        traveler.dispatch(&wire(&ack_engage)),
        Dispatch::Handled(Vec::new())
    );
    assert_eq!(traveler.phase(&session), None);
    assert_eq!(traveler.handler().closed, vec![(session, Outcome::Engaged)]);
}

#[test]
fn rejected_warp_never_engages() {
    let mut traveler = engine("https://hub.local/alice", Recorder::default());
    let mut gate = engine(
        "https://hub.local/gate",
        Recorder {
            warp_decision: Decision::Decline,
            ..Recorder::default()
        },
    );

    let (session, warp) = traveler.initiate(example_user(), example_destination(), None);
    let ack_warp = one_reply(gate.dispatch(&wire(&warp)));
    let Message::AckWarp(ref ack) = ack_warp else {
        panic!("expected an ack_warp");
    };
    assert!(!ack.ok);
    // A declined warp leaves no session behind on the gate.
    assert_eq!(gate.phase(&session), None);

    // The initiator closes the session without emitting an engage.
    assert_eq!(
        traveler.dispatch(&wire(&ack_warp)),
        Dispatch::Handled(Vec::new())
    );
    assert_eq!(traveler.phase(&session), None);
    assert_eq!(
        traveler.handler().closed,
        vec![(session.clone(), Outcome::Rejected)]
    );

    // A late duplicate of the ack references a session nobody tracks now.
    assert_eq!(traveler.dispatch(&wire(&ack_warp)), Dispatch::Unhandled);
}

#[test]
fn rejected_engage_aborts_both_sides() {
    let mut traveler = engine("https://hub.local/alice", Recorder::default());
    let mut gate = engine(
        "https://hub.local/gate",
        Recorder {
            warp_decision: Decision::Accept,
            engage_decision: Decision::Decline,
            ..Recorder::default()
        },
    );

    let (session, warp) = traveler.initiate(example_user(), example_destination(), None);
    let ack_warp = one_reply(gate.dispatch(&wire(&warp)));
    let engage = one_reply(traveler.dispatch(&wire(&ack_warp)));
    let ack_engage = one_reply(gate.dispatch(&wire(&engage)));

    let Message::AckEngage(ref ack) = ack_engage else {
        panic!("expected an ack_engage");
    };
    assert!(!ack.ok);
    assert_eq!(
        gate.handler().closed,
        vec![(session.clone(), Outcome::Rejected)]
    );

    traveler.dispatch(&wire(&ack_engage));
    assert_eq!(traveler.phase(&session), None);
    assert_eq!(traveler.handler().closed, vec![(session, Outcome::Rejected)]);
}

#[test]
fn each_kind_routes_to_exactly_one_callback() {
    let stranger = Referer::generate("https://elsewhere.example/ctx");
    let mut gate = engine("https://hub.local/gate", Recorder::accepting());

    let warp = Warp::new(
        SessionId::generate(),
        example_user(),
        example_destination(),
        stranger.clone(),
    );
    gate.dispatch(&wire(&Message::Warp(warp.clone())));
    assert_eq!(gate.handler().warps, 1);
    assert_eq!(gate.handler().callbacks(), 1);

    let engage = Engage::from_warp(&warp, stranger);
    gate.dispatch(&wire(&Message::Engage(engage)));
    assert_eq!(gate.handler().engages, 1);
    assert_eq!(gate.handler().callbacks(), 2);

    // Sender-side callbacks, driven by a full exchange.
    let mut traveler = engine("https://hub.local/alice", Recorder::default());
    let mut gate = engine("https://hub.local/gate", Recorder::accepting());
    let (_, warp) = traveler.initiate(example_user(), example_destination(), None);
    let ack_warp = one_reply(gate.dispatch(&wire(&warp)));
    let engage = one_reply(traveler.dispatch(&wire(&ack_warp)));
    assert_eq!(traveler.handler().ack_warps, 1);
    assert_eq!(traveler.handler().callbacks(), 1);

    let ack_engage = one_reply(gate.dispatch(&wire(&engage)));
    traveler.dispatch(&wire(&ack_engage));
    assert_eq!(traveler.handler().ack_engages, 1);
    assert_eq!(traveler.handler().callbacks(), 2);
}

#[test]
fn malformed_payloads_are_unhandled_not_fatal() {
    let mut gate = engine("https://hub.local/gate", Recorder::accepting());

    assert_eq!(
        gate.dispatch(&Payload::Text("not json{".to_string())),
        Dispatch::Unhandled
    );
    assert_eq!(
        gate.dispatch(&Payload::Text("\"just a string\"".to_string())),
        Dispatch::Unhandled
    );
    assert_eq!(
        gate.dispatch(&Payload::Object(serde_json::json!({ "kind": "mystery" }))),
        Dispatch::Unhandled
    );
    assert_eq!(gate.handler().callbacks(), 0);
}

#[test]
fn object_payloads_dispatch_like_text() {
    let mut gate = engine("https://hub.local/gate", Recorder::accepting());
    let warp = Warp::new(
        SessionId::generate(),
        example_user(),
        example_destination(),
        Referer::generate("https://elsewhere.example/ctx"),
    );
    let value = serde_json::from_str(&Message::Warp(warp).encode()).unwrap();
    assert!(gate.dispatch(&Payload::Object(value)).is_handled());
    assert_eq!(gate.handler().warps, 1);
}

#[test]
fn engage_without_prior_warp_is_not_ours() {
    let mut gate = engine("https://hub.local/gate", Recorder::accepting());
    let engage = Engage {
        session_id: SessionId::generate(),
        user: example_user(),
        referer: Referer::generate("https://elsewhere.example/ctx"),
    };
    // No locally accepted warp for this session: on a shared bus it belongs
    // to some other pair of peers, so it must not be acknowledged.
    assert_eq!(
        gate.dispatch(&wire(&Message::Engage(engage))),
        Dispatch::Unhandled
    );
    assert_eq!(gate.handler().engages, 0);
}

#[test]
fn engage_on_a_session_we_initiated_is_dropped() {
    let mut traveler = engine("https://hub.local/alice", Recorder::default());
    let (session, _) = traveler.initiate(example_user(), example_destination(), None);

    let forged = Engage {
        session_id: session.clone(),
        user: example_user(),
        referer: Referer::generate("https://elsewhere.example/ctx"),
    };
    assert_eq!(
        traveler.dispatch(&wire(&Message::Engage(forged))),
        Dispatch::Handled(Vec::new())
    );
    assert_eq!(traveler.handler().engages, 0);
    assert_eq!(traveler.phase(&session), Some(SessionPhase::WarpSent));
}

#[test]
fn duplicate_warp_is_acked_once() {
    let mut traveler = engine("https://hub.local/alice", Recorder::default());
    let mut gate = engine("https://hub.local/gate", Recorder::accepting());

    let (session, warp) = traveler.initiate(example_user(), example_destination(), None);
    let reply = one_reply(gate.dispatch(&wire(&warp)));
    let Message::AckWarp(ref ack) = reply else {
        panic!("expected an ack_warp");
    };
    assert!(ack.ok);

    // Redelivery: tolerated, but no second acknowledgement.
    assert_eq!(gate.dispatch(&wire(&warp)), Dispatch::Handled(Vec::new()));
    assert_eq!(gate.handler().warps, 1);
    assert_eq!(gate.phase(&session), Some(SessionPhase::WarpAcked));
}

#[test]
fn own_echo_is_swallowed() {
    let mut traveler = engine("https://hub.local/alice", Recorder::accepting());
    let (session, warp) = traveler.initiate(example_user(), example_destination(), None);

    // The bus reflected our own warp back at us.
    assert_eq!(traveler.dispatch(&wire(&warp)), Dispatch::Handled(Vec::new()));
    assert_eq!(traveler.handler().warps, 0);
    assert_eq!(traveler.phase(&session), Some(SessionPhase::WarpSent));
}

#[test]
fn incoherent_ack_is_dropped() {
    let mut traveler = engine("https://hub.local/alice", Recorder::default());
    let mut gate = engine("https://hub.local/gate", Recorder::accepting());

    let (session, warp) = traveler.initiate(example_user(), example_destination(), None);
    let ack_warp = one_reply(gate.dispatch(&wire(&warp)));
    let Message::AckWarp(mut ack) = ack_warp else {
        panic!("expected an ack_warp");
    };
    // Top-level session still ours, embedded warp swapped for another one.
    ack.warp.session_id = SessionId::generate();
    assert_eq!(
        traveler.dispatch(&wire(&Message::AckWarp(ack))),
        Dispatch::Handled(Vec::new())
    );
    assert_eq!(traveler.handler().ack_warps, 0);
    assert_eq!(traveler.phase(&session), Some(SessionPhase::WarpSent));
}

#[test]
fn unknown_session_acks_are_left_alone() {
    let mut traveler = engine("https://hub.local/alice", Recorder::default());
    let stranger = Referer::generate("https://elsewhere.example/ctx");
    let foreign_warp = Warp::new(
        SessionId::generate(),
        example_user(),
        example_destination(),
        stranger.clone(),
    );
    let ack = AckWarp::new(foreign_warp, true, stranger);
    assert_eq!(
        traveler.dispatch(&wire(&Message::AckWarp(ack))),
        Dispatch::Unhandled
    );
    assert_eq!(traveler.handler().ack_warps, 0);
}

#[test]
fn timed_out_session_ignores_late_acks() {
    let mut traveler = WarpEngine::new(
        Referer::generate("https://hub.local/alice"),
        EngineConfig {
            handshake_timeout: Some(Duration::ZERO),
        },
        Recorder::default(),
    );
    let mut gate = engine("https://hub.local/gate", Recorder::accepting());

    let (session, warp) = traveler.initiate(example_user(), example_destination(), None);
    let ack_warp = one_reply(gate.dispatch(&wire(&warp)));

    assert_eq!(traveler.sweep(), vec![session.clone()]);
    assert_eq!(
        traveler.handler().closed,
        vec![(session.clone(), Outcome::TimedOut)]
    );

    // The ack arrives after expiry: the session is gone, nothing revives it.
    assert_eq!(traveler.dispatch(&wire(&ack_warp)), Dispatch::Unhandled);
    assert_eq!(traveler.phase(&session), None);
}

#[test]
fn announcements_reach_the_handler() {
    let mut gate = engine("https://hub.local/gate", Recorder::accepting());
    let peer = engine("https://hub.local/alice", Recorder::default());
    let hello = peer.announce("https://hub.local/alice");
    assert!(gate.dispatch(&wire(&hello)).is_handled());
    assert_eq!(gate.handler().announces, 1);
    assert_eq!(gate.handler().callbacks(), 0);
}
