//! In-process broadcast bus.
//!
//! Fans every published payload out to all subscriptions, including any held
//! by the publishing side itself, so peers must do their own echo
//! suppression. Delivery is best-effort: a subscription that falls behind
//! the buffer skips ahead, it does not fail.

use tokio::sync::broadcast;
use warplink_core::Payload;

/// Broadcast bus connecting peers within one process.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    tx: broadcast::Sender<Payload>,
}

impl MemoryBus {
    /// Create a bus buffering up to `capacity` payloads per subscription.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast to every current subscription. Fire-and-forget: publishing
    /// with no subscribers is not an error.
    pub fn publish(&self, payload: Payload) {
        let _ = self.tx.send(payload);
    }

    pub fn subscribe(&self) -> MemorySubscription {
        MemorySubscription {
            rx: self.tx.subscribe(),
        }
    }
}

/// One subscriber's view of the bus.
pub struct MemorySubscription {
    rx: broadcast::Receiver<Payload>,
}

impl MemorySubscription {
    /// Next payload, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Payload> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv): whatever is buffered
    /// right now, or `None`.
    pub fn try_recv(&mut self) -> Option<Payload> {
        loop {
            match self.rx.try_recv() {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscription lagged");
                }
                Err(_) => return None,
            }
        }
    }
}
