//! Error types for AirPlay discovery and control.

use thiserror::Error;

/// Primary error type for all AirPlay operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("DNS error: {0}")]
    Dns(#[from] DnsError),

    #[error("Pairing error: {0}")]
    Pairing(#[from] PairingError),

    #[error("RTSP error: {0}")]
    Rtsp(#[from] RtspError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Operation timed out")]
    Timeout,
}

/// Errors raised by the multicast discovery engine.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Socket setup failed: {0}")]
    Socket(String),

    #[error("Failed to send query: {0}")]
    Send(String),

    #[error("Failed to receive datagram: {0}")]
    Receive(String),

    #[error("Discovery engine stopped")]
    Closed,
}

/// Malformed or unencodable DNS messages.
///
/// Decoding never yields a partial message: the first of these aborts the
/// whole attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("read of {needed} bytes at offset {offset} runs past end of {len}-byte buffer")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("expected to consume {expected} bytes, ended up at {actual}")]
    TrailingBytes { expected: usize, actual: usize },

    #[error("invalid label type 0x{byte:02x} at offset {offset}")]
    InvalidLabel { byte: u8, offset: usize },

    #[error("too many compression pointers in name at offset {0}")]
    PointerLoop(usize),

    #[error("invalid RDATA length {length} for record type {rtype}")]
    RdataLength { rtype: u16, length: usize },

    #[error("label exceeds 63 bytes: {0}")]
    LabelTooLong(String),

    #[error("empty label in name: {0}")]
    EmptyLabel(String),

    #[error("TXT string exceeds 255 bytes ({0} bytes)")]
    TxtTooLong(usize),

    #[error("RDATA exceeds 65535 bytes ({0} bytes)")]
    RdataTooLong(usize),

    #[error("record type {0} has a typed payload and cannot be written raw")]
    RawKnownType(u16),
}

/// Errors during remote pairing.
#[derive(Error, Debug)]
pub enum PairingError {
    #[error("Invalid PIN")]
    BadPin,

    #[error("Invalid pairing response: {0}")]
    InvalidPairingResponse(String),

    #[error("DAAP parsing error: {0}")]
    Daap(String),
}

/// Errors during RTSP/HTTP control-channel communication.
#[derive(Error, Debug)]
pub enum RtspError {
    #[error("Connection refused")]
    ConnectionRefused,

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("Password required")]
    PasswordRequired,

    #[error("Password invalid")]
    PasswordInvalid,

    #[error("Authentication not supported")]
    AuthUnsupported,

    #[error("Airplay server did not respond to OPTIONS request")]
    NoOptions,

    #[error("Airplay server reported invalid OPTIONS")]
    InvalidOptions,
}

/// Parsing errors for various formats.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;
