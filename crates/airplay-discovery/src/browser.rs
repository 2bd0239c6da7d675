//! Discovery engine: a receive task feeding a single-writer registry task.

use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use airplay_core::error::{DiscoveryError, Error};
use airplay_core::{AirplayDevice, DeviceType, Result};
use airplay_mdns::{class, first_label, rtype, DnsMessage, Question, Rdata};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tracing::{debug, error, info, trace};

use crate::config::DiscoveryConfig;
use crate::registry::DeviceRegistry;
use crate::socket::bind_multicast;
use crate::traits::DatagramSocket;

/// Browses for AirPlay services and yields registry snapshots.
///
/// Each relevant datagram produces one snapshot of every known device. The
/// receive task does not read the next datagram until the registry task has
/// handed that snapshot over. With the default snapshot depth of 1 that means
/// the consumer has taken it, so a slow consumer throttles discovery instead
/// of falling behind.
///
/// A socket error or malformed datagram ends the receive task; the error is
/// returned from [`stop`](Self::stop) and the snapshot stream ends.
pub struct DiscoveryEngine {
    snapshots: mpsc::Receiver<Vec<AirplayDevice>>,
    shutdown_tx: watch::Sender<bool>,
    receive_task: Option<JoinHandle<Result<()>>>,
    registry_task: Option<JoinHandle<()>>,
}

impl DiscoveryEngine {
    /// Join the multicast group described by `config` and start browsing.
    pub async fn start(config: DiscoveryConfig) -> Result<Self> {
        let socket = bind_multicast(&config)?;
        Self::with_socket(socket, config).await
    }

    /// Start browsing over an already prepared socket.
    pub async fn with_socket<S>(socket: S, config: DiscoveryConfig) -> Result<Self>
    where
        S: DatagramSocket + 'static,
    {
        let query = browse_query(&config).to_bytes()?;
        let target = SocketAddr::V4(config.group_addr());
        socket.send_to(&query, target).await?;
        info!(
            "Sent browse query for {} to {}",
            config.service_types.join(", "),
            target
        );

        let (message_tx, message_rx) = mpsc::channel(1);
        let (snapshot_tx, snapshots) = mpsc::channel(config.snapshot_depth.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let receive_task = tokio::spawn(receive_loop(
            socket,
            config.recv_buffer_size,
            message_tx,
            shutdown_rx,
        ));
        let registry_task = tokio::spawn(registry_loop(
            DeviceRegistry::new(),
            message_rx,
            snapshot_tx,
        ));

        Ok(Self {
            snapshots,
            shutdown_tx,
            receive_task: Some(receive_task),
            registry_task: Some(registry_task),
        })
    }

    /// Wait for the next registry snapshot.
    ///
    /// Returns `None` once the engine has stopped.
    pub async fn next_snapshot(&mut self) -> Option<Vec<AirplayDevice>> {
        self.snapshots.recv().await
    }

    /// Stop both tasks. Returns the error that ended the receive task, if any.
    pub async fn stop(&mut self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.registry_task.take() {
            handle.abort();
        }
        match self.receive_task.take() {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Ok(()),
                Err(e) => Err(DiscoveryError::Receive(e.to_string()).into()),
            },
            None => Ok(()),
        }
    }
}

impl Stream for DiscoveryEngine {
    type Item = Vec<AirplayDevice>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.snapshots.poll_recv(cx)
    }
}

impl Drop for DiscoveryEngine {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.registry_task.take() {
            handle.abort();
        }
    }
}

/// One PTR question per configured service type.
pub fn browse_query(config: &DiscoveryConfig) -> DnsMessage {
    let mut msg = DnsMessage::new();
    msg.id = config.query_id;
    for service in &config.service_types {
        msg.add_question(Question::new(service.as_str(), rtype::PTR, class::IN));
    }
    msg
}

/// Whether a message announces one of the browsed service kinds.
pub fn is_relevant(msg: &DnsMessage) -> bool {
    msg.answers.iter().any(|record| {
        matches!(record.rdata, Rdata::Ptr(_))
            && DeviceType::from_service_label(first_label(&record.name)).is_some()
    })
}

/// A decoded message and the signal that its snapshot was delivered.
type Handoff = (DnsMessage, oneshot::Sender<()>);

async fn receive_loop<S: DatagramSocket>(
    socket: S,
    max_len: usize,
    messages: mpsc::Sender<Handoff>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        tokio::select! {
            received = socket.recv_from(max_len) => {
                let (datagram, from) = received.map_err(|e| {
                    error!("mDNS receive failed: {}", e);
                    e
                })?;

                let msg = DnsMessage::parse(&datagram).map_err(|e| {
                    error!("Malformed mDNS datagram from {}: {}", from, e);
                    Error::from(e)
                })?;

                if !is_relevant(&msg) {
                    trace!("Discarding {} byte datagram from {}", datagram.len(), from);
                    continue;
                }

                debug!(
                    "Forwarding datagram from {} ({} answers, {} extras)",
                    from,
                    msg.answers.len(),
                    msg.extras.len()
                );
                let (delivered_tx, delivered_rx) = oneshot::channel();
                if messages.send((msg, delivered_tx)).await.is_err() {
                    debug!("Registry task gone, stopping receive loop");
                    return Ok(());
                }

                // Hold the socket until the snapshot for this datagram is out.
                tokio::select! {
                    delivered = delivered_rx => {
                        if delivered.is_err() {
                            debug!("Registry task gone, stopping receive loop");
                            return Ok(());
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Discovery receive loop shutting down");
                        return Ok(());
                    }
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    debug!("Discovery receive loop shutting down");
                    return Ok(());
                }
            }
        }
    }
}

async fn registry_loop(
    mut registry: DeviceRegistry,
    mut messages: mpsc::Receiver<Handoff>,
    snapshots: mpsc::Sender<Vec<AirplayDevice>>,
) {
    while let Some((msg, delivered)) = messages.recv().await {
        if registry.apply(&msg) {
            debug!("Registry updated, {} devices known", registry.len());
        }
        if snapshots.send(registry.snapshot()).await.is_err() {
            debug!("Snapshot consumer dropped, stopping registry task");
            break;
        }
        // Capacity comes back only once the consumer drains the queue.
        match snapshots.reserve().await {
            Ok(permit) => drop(permit),
            Err(_) => {
                debug!("Snapshot consumer dropped, stopping registry task");
                break;
            }
        }
        let _ = delivered.send(());
    }
}
