//! # airplay-core
//!
//! Core types and error definitions shared across the AirPlay crates.
//!
//! This crate provides:
//! - The discovered device model and its TXT flag accessors
//! - Common error types

pub mod device;
pub mod error;

pub use device::{is_routable, AirplayDevice, DeviceType};
pub use error::{DiscoveryError, DnsError, Error, PairingError, ParseError, Result, RtspError};
