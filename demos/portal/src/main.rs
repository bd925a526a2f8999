//! Warp handshake peer.
//!
//! Joins a reflector bus and plays either side of the handshake:
//! - gate: accept warps whose destination matches a prefix, stay up
//! - traveler: initiate a warp, report the outcome, exit
//!
//! Run a gate and a traveler against a reflector:
//!   cargo run -p warplink-demo-reflector -- --port 9400
//!   cargo run -p warplink-demo-portal -- --address https://hub.local/gate --accept hub://
//!   cargo run -p warplink-demo-portal -- --address https://hub.local/alice --warp hub://plaza/128/128

mod client;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Warp handshake peer.
#[derive(Debug, Parser)]
pub struct Args {
    /// Reflector to join.
    #[arg(long, default_value = "ws://127.0.0.1:9400")]
    pub reflector: String,

    /// This context's own address; tags every outbound message.
    #[arg(long)]
    pub address: String,

    /// Accept warps whose destination starts with this prefix (gate role).
    #[arg(long)]
    pub accept: Option<String>,

    /// Initiate a warp to this destination URI (traveler role).
    #[arg(long)]
    pub warp: Option<String>,

    /// Portal token to stamp on the outbound warp.
    #[arg(long)]
    pub portal: Option<String>,

    /// User id presented in the handshake.
    #[arg(long, default_value = "guest")]
    pub user: String,

    /// Auth token presented in the handshake.
    #[arg(long, default_value = "")]
    pub auth: String,

    /// Abandon unacknowledged handshakes after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("portal=info".parse()?))
        .init();

    let args = Args::parse();
    client::run(args).await
}
