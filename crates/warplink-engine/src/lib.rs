//! Protocol state engine for the two-phase warp handshake.
//!
//! [`WarpEngine`] owns one context's referer tag and its table of in-flight
//! handshakes. It is sans-IO: feed raw bus payloads into
//! [`WarpEngine::dispatch`] and publish the replies it returns. The engine
//! tracks every session it is party to and rejects out-of-sequence messages
//! instead of blindly acknowledging them; messages for sessions it does not
//! own are left unhandled so other subscribers on a shared bus can take
//! them.

mod engine;
mod handler;
mod session;

pub use engine::{Dispatch, EngineConfig, WarpEngine};
pub use handler::{Decision, Outcome, WarpHandler};
pub use session::SessionPhase;
