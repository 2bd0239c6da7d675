//! # airplay-crypto
//!
//! Hashing primitives for AirPlay control-channel authentication and remote
//! pairing.
//!
//! This crate provides:
//! - Digest challenge parsing and `Authorization` header computation
//! - MD5 hex helpers

pub mod digest;

pub use digest::{md5_hex, DigestChallenge};
