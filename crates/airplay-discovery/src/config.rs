//! Discovery configuration.

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::{AIRPLAY_SERVICE_TYPE, RAOP_SERVICE_TYPE};

/// mDNS multicast group (RFC 6762).
pub const MDNS_GROUP: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// mDNS port.
pub const MDNS_PORT: u16 = 5353;

/// Largest datagram an mDNS responder may send.
pub const MAX_DATAGRAM_SIZE: usize = 9000;

/// Settings for a [`DiscoveryEngine`](crate::DiscoveryEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub group: Ipv4Addr,
    pub port: u16,
    /// Local interface used to join the group. `0.0.0.0` lets the OS pick.
    pub interface: Ipv4Addr,
    /// Service types asked for in the bootstrap query, one PTR question each.
    pub service_types: Vec<String>,
    pub recv_buffer_size: usize,
    pub query_id: u16,
    /// Snapshots buffered for the consumer before the engine blocks.
    pub snapshot_depth: usize,
}

impl DiscoveryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, group: Ipv4Addr) -> Self {
        self.group = group;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn interface(mut self, interface: Ipv4Addr) -> Self {
        self.interface = interface;
        self
    }

    /// Replace the browsed service types.
    pub fn service_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    pub fn query_id(mut self, id: u16) -> Self {
        self.query_id = id;
        self
    }

    /// Set snapshot channel depth. Clamped to at least 1.
    pub fn snapshot_depth(mut self, depth: usize) -> Self {
        self.snapshot_depth = depth.max(1);
        self
    }

    /// Destination for outgoing queries.
    pub fn group_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.group, self.port)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            group: MDNS_GROUP,
            port: MDNS_PORT,
            interface: Ipv4Addr::UNSPECIFIED,
            service_types: vec![RAOP_SERVICE_TYPE.to_string(), AIRPLAY_SERVICE_TYPE.to_string()],
            recv_buffer_size: MAX_DATAGRAM_SIZE,
            query_id: 0,
            snapshot_depth: 1,
        }
    }
}
