//! Per-channel UDP listener and flush worker
//!
//! One `ChannelWorker` owns one UDP port (one logical satellite
//! downlink). Decoded records go into the channel's `Batcher`; full or
//! timed-out batches travel over a bounded mpsc channel to the flush
//! worker, which persists and then broadcasts. The bounded channel is
//! the backpressure point: pool exhaustion delays flushes instead of
//! dropping records.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use satlink_wire::{decode, TelemetryRecord};

use crate::batch::Batcher;
use crate::broadcast::SubscriberRegistry;
use crate::error::IngestError;
use crate::sink::BatchStore;

/// Receive buffer: packets are 19 bytes, anything longer is malformed
/// but must still be read to be rejected by length
const RECV_BUF_SIZE: usize = 64;

/// In-flight flushed batches per channel before the listener awaits
const FLUSH_QUEUE_DEPTH: usize = 4;

pub struct ChannelWorker {
    port: u16,
    socket: UdpSocket,
    batcher: Arc<Batcher>,
    flush_tx: mpsc::Sender<Vec<TelemetryRecord>>,
    flush_interval: Duration,
}

impl ChannelWorker {
    /// Bind the channel's UDP port and wire it to a flush queue
    pub async fn bind(
        listen_addr: &str,
        port: u16,
        batcher: Arc<Batcher>,
        flush_interval: Duration,
    ) -> Result<(Self, mpsc::Receiver<Vec<TelemetryRecord>>), IngestError> {
        let socket = UdpSocket::bind((listen_addr, port)).await?;
        let (flush_tx, flush_rx) = mpsc::channel(FLUSH_QUEUE_DEPTH);
        Ok((
            Self {
                port,
                socket,
                batcher,
                flush_tx,
                flush_interval,
            },
            flush_rx,
        ))
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr, IngestError> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive loop: runs until shutdown, then hands off any partial
    /// batch before exiting. Transient receive failures are logged and
    /// the loop keeps going, so one channel's socket hiccup never takes
    /// the service down.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(port = self.port, "Listening for telemetry");

        let mut buf = [0u8; RECV_BUF_SIZE];
        let mut timer = interval_at(
            Instant::now() + self.flush_interval,
            self.flush_interval,
        );
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {
                    // Timer flush: no-op while the batch is empty
                    if let Some(batch) = self.batcher.take() {
                        trace!(port = self.port, records = batch.len(), "Timer flush");
                        if self.flush_tx.send(batch).await.is_err() {
                            break;
                        }
                    }
                }
                received = self.socket.recv_from(&mut buf) => {
                    let (len, addr) = match received {
                        Ok(r) => r,
                        Err(e) => {
                            warn!(port = self.port, error = %e, "UDP receive failed");
                            continue;
                        }
                    };

                    match decode(&buf[..len]) {
                        Ok((_header, record)) => {
                            trace!(
                                port = self.port,
                                from = %addr,
                                satellite_id = record.satellite_id,
                                "Received telemetry"
                            );
                            // Header is routing metadata only; downstream
                            // keeps the four telemetry fields
                            if let Some(batch) = self.batcher.append(record) {
                                timer.reset();
                                if self.flush_tx.send(batch).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            warn!(port = self.port, from = %addr, error = %e, "Dropping malformed datagram");
                        }
                    }
                }
            }
        }

        // Final flush: shutdown must not strand accumulated records
        if let Some(batch) = self.batcher.take() {
            let _ = self.flush_tx.send(batch).await;
        }
        info!(port = self.port, "Channel listener stopped");
    }
}

/// Drain flushed batches for one channel: persist, then fan out.
///
/// Exits when the listener drops its sender, after draining every
/// remaining batch (including the shutdown flush).
pub async fn run_flush_worker<S: BatchStore + ?Sized>(
    port: u16,
    mut flush_rx: mpsc::Receiver<Vec<TelemetryRecord>>,
    sink: Arc<S>,
    registry: Arc<SubscriberRegistry>,
) {
    while let Some(batch) = flush_rx.recv().await {
        match sink.store(&batch).await {
            Ok(()) => {
                info!(port, records = batch.len(), "Batch persisted");
                // Subscribers only ever see data that committed
                let delivered = registry.broadcast(&batch);
                trace!(port, delivered, "Batch broadcast");
            }
            Err(e) => {
                // Rolled back; records for this flush interval are lost
                // by design (no durable requeue in this service)
                error!(port, records = batch.len(), error = %e, "Batch write failed");
            }
        }
    }
}
