//! Trait definitions for the discovery transport (enables mocking in tests).

use std::net::SocketAddr;

use airplay_core::Result;
use async_trait::async_trait;

/// A datagram endpoint joined to the mDNS group.
///
/// Implemented for [`tokio::net::UdpSocket`]; tests substitute in-memory
/// sockets or mocks.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait DatagramSocket: Send + Sync {
    /// Send one datagram to `target`.
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize>;

    /// Wait for the next datagram. Returns the payload and its sender.
    async fn recv_from(&self, max_len: usize) -> Result<(Vec<u8>, SocketAddr)>;
}
