//! # airplay-rtsp
//!
//! Control-channel client for AirPlay receivers.
//!
//! This crate provides:
//! - Request/response formatting for `RTSP/1.0` and `HTTP/1.1`
//! - A TCP transport with connect and response timeouts
//! - Sessions with the `OPTIONS *` check and Digest authentication

mod connection;
mod request;
mod response;
mod session;
mod traits;

pub use connection::{RtspConnection, DEFAULT_TIMEOUT};
pub use request::{Protocol, RtspMethod, RtspRequest};
pub use response::RtspResponse;
pub use session::{AirplaySession, SessionConfig, DEFAULT_USER_AGENT};
pub use traits::RtspTransport;
