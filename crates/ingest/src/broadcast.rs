//! Subscriber registry and WebSocket fanout
//!
//! Every successfully persisted batch is rendered once and pushed to all
//! live subscribers. Fanout never blocks the ingestion path: delivery
//! goes through a bounded per-subscriber queue with `try_send`, and a
//! subscriber whose queue is closed or full is evicted instead of
//! stalling the others.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use satlink_wire::TelemetryRecord;

use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

/// Queue depth per subscriber before it counts as too slow
const SUBSCRIBER_QUEUE_DEPTH: usize = 64;

pub type SubscriberId = u64;

/// Thread-safe set of live subscriber handles.
///
/// Channel workers only ever see `broadcast`; the underlying map is
/// never exposed.
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, mpsc::Sender<String>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> SubscriberId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Add a subscriber. Idempotent: re-registering an existing id keeps
    /// the original handle.
    pub fn register(&self, id: SubscriberId, sender: mpsc::Sender<String>) {
        self.subscribers.entry(id).or_insert(sender);
    }

    /// Remove a subscriber. No-op on unknown ids, safe to call twice.
    pub fn unregister(&self, id: SubscriberId) {
        self.subscribers.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Push one persisted batch to every live subscriber. Returns how
    /// many subscribers were handed the frame; failed ones are evicted
    /// without affecting the rest.
    pub fn broadcast(&self, batch: &[TelemetryRecord]) -> usize {
        if self.subscribers.is_empty() {
            return 0;
        }

        let frame = render_batch(batch);
        let mut evicted = Vec::new();
        let mut delivered = 0;

        for entry in self.subscribers.iter() {
            if entry.value().try_send(frame.clone()).is_ok() {
                delivered += 1;
            } else {
                evicted.push(*entry.key());
            }
        }

        for id in evicted {
            self.unregister(id);
            warn!(subscriber = id, "Evicted subscriber after failed send");
        }

        delivered
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a batch as the subscriber wire format: four comma-joined
/// fields per record, each record terminated by a colon.
pub fn render_batch(batch: &[TelemetryRecord]) -> String {
    let mut out = String::with_capacity(batch.len() * 32);
    for r in batch {
        out.push_str(&format!(
            "{},{},{},{}:",
            r.satellite_id, r.temperature, r.battery_voltage, r.altitude
        ));
    }
    out
}

/// Accept subscriber connections until shutdown
pub async fn run_subscriber_server(
    listener: TcpListener,
    registry: Arc<SubscriberRegistry>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let registry = Arc::clone(&registry);
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_subscriber(stream, registry, shutdown).await {
                                debug!(peer = %peer, error = %e, "Subscriber connection ended with error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "Failed to accept subscriber connection"),
                }
            }
        }
    }
    info!("Subscriber server stopped");
}

/// Own one subscriber connection from registration to disconnect
async fn serve_subscriber(
    stream: TcpStream,
    registry: Arc<SubscriberRegistry>,
    shutdown: CancellationToken,
) -> Result<(), WsError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut write, mut read) = ws.split();

    let id = registry.next_id();
    let (tx, mut rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
    registry.register(id, tx);
    info!(subscriber = id, "Subscriber connected");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = write.send(WsMessage::Close(None)).await;
                break;
            }
            frame = rx.recv() => {
                match frame {
                    Some(text) => {
                        if write.send(WsMessage::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    // Sender gone: evicted by a failed broadcast
                    None => break,
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    // Inbound frames are ignored; the duplex connection
                    // exists for server pushes only
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    registry.unregister(id);
    info!(subscriber = id, "Subscriber disconnected");
    Ok(())
}
