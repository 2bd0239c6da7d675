//! Multicast UDP socket setup.

use std::net::{IpAddr, SocketAddr};

use airplay_core::error::DiscoveryError;
use airplay_core::Result;
use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::config::DiscoveryConfig;
use crate::traits::DatagramSocket;

/// Bind the mDNS port and join the configured multicast group.
///
/// Address and port reuse are enabled so the engine can coexist with a
/// system responder already listening on 5353.
pub fn bind_multicast(config: &DiscoveryConfig) -> Result<UdpSocket> {
    let bind_addr = SocketAddr::new(IpAddr::V4(config.interface), config.port);
    let socket_err = |e: std::io::Error| DiscoveryError::Socket(e.to_string());

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(socket_err)?;

    if let Err(e) = socket.set_reuse_address(true) {
        warn!("Failed to set SO_REUSEADDR: {}", e);
    }

    #[cfg(unix)]
    if let Err(e) = socket.set_reuse_port(true) {
        warn!("Failed to set SO_REUSEPORT: {}", e);
    }

    socket.set_nonblocking(true).map_err(socket_err)?;
    socket.bind(&bind_addr.into()).map_err(socket_err)?;
    socket
        .join_multicast_v4(&config.group, &config.interface)
        .map_err(socket_err)?;
    if let Err(e) = socket.set_multicast_loop_v4(true) {
        warn!("Failed to enable multicast loopback: {}", e);
    }

    debug!(
        "Joined {} on interface {} (bound {})",
        config.group, config.interface, bind_addr
    );

    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket).map_err(socket_err)?)
}

#[async_trait]
impl DatagramSocket for UdpSocket {
    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize> {
        Ok(UdpSocket::send_to(self, buf, target)
            .await
            .map_err(|e| DiscoveryError::Send(e.to_string()))?)
    }

    async fn recv_from(&self, max_len: usize) -> Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; max_len];
        let (len, from) = UdpSocket::recv_from(self, &mut buf)
            .await
            .map_err(|e| DiscoveryError::Receive(e.to_string()))?;
        buf.truncate(len);
        Ok((buf, from))
    }
}
