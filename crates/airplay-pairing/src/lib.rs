//! # airplay-pairing
//!
//! Pairing with Remote apps that advertise `_touch-remote._tcp`.
//!
//! This crate provides:
//! - DAAP tag/length/value decoding and pretty-printing
//! - Pairing-code derivation from the advertised `Pair` flag and a PIN
//! - The `/pair` exchange returning the Remote's name, type and GUID

pub mod daap;
mod remote;

pub use daap::{DaapTags, DaapValue};
pub use remote::{pair, pair_over, pairing_code, Remote};
