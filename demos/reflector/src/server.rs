//! Relay loop: every inbound text frame goes to every other client.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};

/// A frame tagged with the connection it came from, so the relay can skip
/// echoing it back to its sender.
type Frame = (u64, Utf8Bytes);

pub async fn run(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = ([127, 0, 0, 1], port).into();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on ws://{}", addr);

    let (relay_tx, _) = broadcast::channel::<Frame>(64);
    let mut next_id: u64 = 0;

    loop {
        let (stream, client_addr) = listener.accept().await?;
        let relay_tx = relay_tx.clone();
        next_id += 1;
        let id = next_id;

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client_addr, id, relay_tx).await {
                tracing::warn!("Connection error: {}", e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    id: u64,
    relay_tx: broadcast::Sender<Frame>,
) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();
    let mut relay_rx = relay_tx.subscribe();

    tracing::info!("Client {} connected from {}", id, addr);

    loop {
        tokio::select! {
            msg = stream.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    _ => break,
                };

                if let Message::Text(text) = msg {
                    let _ = relay_tx.send((id, text));
                }
            }

            frame = relay_rx.recv() => {
                if let Ok((sender, text)) = frame
                    && sender != id
                {
                    sink.send(Message::Text(text)).await?;
                }
            }
        }
    }

    tracing::info!("Client {} disconnected", id);
    Ok(())
}
