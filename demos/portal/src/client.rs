//! Event loop wiring a warp engine to a reflector connection.

use crate::Args;
use std::time::Duration;
use warplink_connector_ws::ReflectorClient;
use warplink_core::{Announce, Destination, Payload, Referer, SessionId, User, Warp};
use warplink_engine::{Decision, EngineConfig, Outcome, WarpEngine, WarpHandler};

/// Demo handler: gate policy plus terminal-state reporting.
struct Portal {
    accept: Option<String>,
    done: Option<Outcome>,
}

impl WarpHandler for Portal {
    fn on_warp(&mut self, warp: &Warp) -> Decision {
        let Some(prefix) = &self.accept else {
            return Decision::Ignore;
        };
        if warp.destination.address().starts_with(prefix) {
            tracing::info!(
                "{} warping in to {}",
                warp.user.id,
                warp.destination.address()
            );
            Decision::Accept
        } else {
            Decision::Ignore
        }
    }

    fn on_announce(&mut self, announce: &Announce) {
        tracing::info!("Peer on the bus: {}", announce.urn);
    }

    fn on_closed(&mut self, session: &SessionId, outcome: Outcome) {
        tracing::info!("Session {} closed: {:?}", session, outcome);
        self.done = Some(outcome);
    }
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let referer = Referer::generate(&args.address);
    let config = EngineConfig {
        handshake_timeout: args.timeout_secs.map(Duration::from_secs),
    };
    let handler = Portal {
        accept: args.accept.clone(),
        done: None,
    };
    let mut engine = WarpEngine::new(referer, config, handler);

    let mut link = ReflectorClient::connect(&args.reflector).await?;
    link.publish(&Payload::Text(engine.announce(args.address.clone()).encode()))
        .await?;

    let traveling = args.warp.is_some();
    if let Some(uri) = &args.warp {
        let destination = Destination::uri(uri.clone())?;
        let user = User::new(args.user.clone(), args.auth.clone());
        let (session, warp) = engine.initiate(user, destination, args.portal.clone());
        tracing::info!("Warping to {} (session {})", uri, session);
        link.publish(&Payload::Text(warp.encode())).await?;
    }

    let mut tick = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            payload = link.recv() => {
                let Some(payload) = payload? else {
                    tracing::info!("Reflector closed the connection");
                    break;
                };
                for reply in engine.dispatch(&payload).into_replies() {
                    link.publish(&Payload::Text(reply.encode())).await?;
                }
            }

            _ = tick.tick() => {
                for session in engine.sweep() {
                    tracing::warn!("Session {} expired", session);
                }
            }
        }

        // A traveler is done once its handshake closes; a gate keeps serving.
        if traveling && let Some(outcome) = engine.handler().done {
            if outcome == Outcome::Engaged {
                tracing::info!("Engaged. Safe travels.");
            } else {
                tracing::warn!("Warp failed: {:?}", outcome);
            }
            break;
        }
    }

    link.close().await.ok();
    Ok(())
}
