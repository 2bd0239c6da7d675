//! # airplay-discovery
//!
//! Multicast DNS browsing for AirPlay receivers and iOS remotes.
//!
//! This crate provides:
//! - A device registry that folds PTR/SRV/TXT/A records into devices
//! - A discovery engine that owns the multicast socket and streams snapshots
//! - Trait-based socket access for testing with mocks
//!
//! ## Example
//!
//! ```ignore
//! use airplay_discovery::{DiscoveryConfig, DiscoveryEngine};
//!
//! let mut engine = DiscoveryEngine::start(DiscoveryConfig::default()).await?;
//! while let Some(devices) = engine.next_snapshot().await {
//!     for device in devices {
//!         println!("{}", device);
//!     }
//! }
//! ```

mod browser;
mod config;
mod registry;
mod socket;
mod traits;

pub use browser::{browse_query, is_relevant, DiscoveryEngine};
pub use config::{DiscoveryConfig, MAX_DATAGRAM_SIZE, MDNS_GROUP, MDNS_PORT};
pub use registry::DeviceRegistry;
pub use socket::bind_multicast;
pub use traits::DatagramSocket;

/// AirPlay service type for mDNS discovery.
pub const AIRPLAY_SERVICE_TYPE: &str = "_airplay._tcp.local.";

/// RAOP (Remote Audio Output Protocol) service type.
pub const RAOP_SERVICE_TYPE: &str = "_raop._tcp.local.";

/// Service announced by iOS Remote apps waiting to pair.
pub const TOUCH_REMOTE_SERVICE_TYPE: &str = "_touch-remote._tcp.local.";

/// Service type constants.
pub mod service_types {
    pub use super::AIRPLAY_SERVICE_TYPE as AIRPLAY;
    pub use super::RAOP_SERVICE_TYPE as RAOP;
    pub use super::TOUCH_REMOTE_SERVICE_TYPE as TOUCH_REMOTE;
}
