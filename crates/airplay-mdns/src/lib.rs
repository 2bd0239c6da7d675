//! # airplay-mdns
//!
//! Just enough of the DNS wire format (RFC 1035) to browse for AirPlay
//! services over multicast DNS.
//!
//! - [`DnsMessage::parse`] decodes a datagram, following compression pointers
//! - [`DnsMessage::to_bytes`] encodes every section, without compression
//! - `Display` renders a message the way `dig` would

mod display;
pub mod message;
mod reader;
mod writer;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use display::{class_name, opcode_name, rcode_name, type_name};
pub use message::{class, first_label, labels, rtype, DnsMessage, Question, Rdata, ResourceRecord, Srv};
