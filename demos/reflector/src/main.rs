//! Broadcast reflector relay.
//!
//! Accepts websocket connections and re-broadcasts every text frame to every
//! other connected client, turning N sockets into one shared bus for warp
//! peers. The reflector never inspects frame contents.
//!
//! Run:
//!   cargo run -p warplink-demo-reflector -- --port 9400

mod server;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("reflector=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let port = parse_arg(&args, "--port").unwrap_or(9400);

    tracing::info!("Starting reflector on port {}", port);

    server::run(port).await
}

fn parse_arg(args: &[String], flag: &str) -> Option<u16> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
