//! Traits for control-channel transport abstraction.

use airplay_core::error::Result;
use async_trait::async_trait;

use crate::{RtspRequest, RtspResponse};

/// One request/response round trip on a control connection.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait RtspTransport: Send + Sync {
    /// Send a request stamped with `cseq` and wait for its response.
    async fn send(&mut self, request: RtspRequest, cseq: u32) -> Result<RtspResponse>;

    /// Check if connected.
    fn is_connected(&self) -> bool;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;
}
