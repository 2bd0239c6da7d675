//! Plain TCP control connection.

use std::net::SocketAddr;
use std::time::Duration;

use airplay_core::error::{Error as CoreError, Result, RtspError};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::traits::RtspTransport;
use crate::{RtspRequest, RtspResponse};

/// Default time allowed for connecting and for each response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// RTSP/HTTP connection to an AirPlay receiver.
pub struct RtspConnection {
    addr: SocketAddr,
    timeout: Duration,
    stream: Option<BufReader<TcpStream>>,
}

impl RtspConnection {
    /// Create new connection (not yet connected).
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timeout: DEFAULT_TIMEOUT,
            stream: None,
        }
    }

    /// Set the connect and response timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect to the receiver.
    pub async fn connect(&mut self) -> Result<()> {
        let stream = timeout(self.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| CoreError::Timeout)?
            .map_err(|e| {
                tracing::debug!("Connect to {} failed: {}", self.addr, e);
                RtspError::ConnectionRefused
            })?;
        tracing::debug!("Connected to {}", self.addr);
        self.stream = Some(BufReader::new(stream));
        Ok(())
    }

    /// Send request and receive response.
    pub async fn send(&mut self, request: RtspRequest, cseq: u32) -> Result<RtspResponse> {
        let response_timeout = self.timeout;
        let stream = self.stream.as_mut().ok_or(RtspError::ConnectionRefused)?;

        let request_data = request.serialize(cseq);
        tracing::debug!(
            "-> {} {} {} (cseq={})",
            request.method.as_str(),
            request.uri,
            request.protocol.as_str(),
            cseq
        );

        stream.get_mut().write_all(&request_data).await?;
        stream.get_mut().flush().await?;

        let response_data = timeout(response_timeout, read_response(stream))
            .await
            .map_err(|_| CoreError::Timeout)??;

        let response = RtspResponse::parse(&response_data)?;
        tracing::debug!(
            "<- {} {} (cseq={:?})",
            response.status_code,
            response.status_text,
            response.cseq()
        );

        // Verify CSeq matches (warning only, HTTP responses usually omit it)
        if let Some(echoed) = response.cseq() {
            if echoed != cseq {
                tracing::warn!("CSeq mismatch: expected {}, got {}", cseq, echoed);
            }
        }

        Ok(response)
    }

    /// Close the connection.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.get_mut().shutdown().await;
        }
        Ok(())
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Get the remote address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Read one response: header lines up to the blank line, then a
/// `Content-Length` body.
async fn read_response(reader: &mut BufReader<TcpStream>) -> Result<Vec<u8>> {
    let mut response_data = Vec::new();

    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(RtspError::ConnectionClosed.into());
        }
        response_data.extend_from_slice(line.as_bytes());

        if line == "\r\n" || line == "\n" {
            break;
        }
    }

    let header_str = String::from_utf8_lossy(&response_data);
    let content_length = header_str
        .lines()
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim().eq_ignore_ascii_case("Content-Length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    if content_length > 0 {
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => CoreError::from(RtspError::ConnectionClosed),
            _ => CoreError::from(e),
        })?;
        response_data.extend_from_slice(&body);
    }

    Ok(response_data)
}

#[async_trait]
impl RtspTransport for RtspConnection {
    async fn send(&mut self, request: RtspRequest, cseq: u32) -> Result<RtspResponse> {
        RtspConnection::send(self, request, cseq).await
    }

    fn is_connected(&self) -> bool {
        RtspConnection::is_connected(self)
    }

    async fn close(&mut self) -> Result<()> {
        RtspConnection::close(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::net::TcpListener;

    fn test_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 7000)
    }

    /// Accept one connection, read one request head, reply with `reply`.
    async fn serve_once(reply: &'static [u8]) -> (SocketAddr, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                    return head;
                }
                head.push_str(&line);
                if line == "\r\n" {
                    break;
                }
            }
            let _ = reader.get_mut().write_all(reply).await;
            head
        });
        (addr, handle)
    }

    mod connection_lifecycle {
        use super::*;

        #[test]
        fn new_is_not_connected() {
            let conn = RtspConnection::new(test_addr());
            assert!(!conn.is_connected());
            assert_eq!(conn.addr(), test_addr());
        }

        #[tokio::test]
        async fn connect_fails_on_refused() {
            // Bind then drop to get a port with nothing listening.
            let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
            let mut conn = RtspConnection::new(addr);
            let result = conn.connect().await;
            assert!(matches!(result, Err(CoreError::Rtsp(RtspError::ConnectionRefused))));
        }

        #[tokio::test]
        async fn send_without_connect_fails() {
            let mut conn = RtspConnection::new(test_addr());
            let result = conn.send(RtspRequest::options(), 1).await;
            assert!(result.is_err());
        }

        #[tokio::test]
        async fn close_disconnects() {
            let (addr, _server) = serve_once(b"RTSP/1.0 200 OK\r\n\r\n").await;
            let mut conn = RtspConnection::new(addr);
            conn.connect().await.unwrap();
            assert!(conn.is_connected());
            conn.close().await.unwrap();
            assert!(!conn.is_connected());
        }
    }

    mod round_trip {
        use super::*;

        #[tokio::test]
        async fn reads_headers_and_body() {
            let (addr, server) =
                serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").await;
            let mut conn = RtspConnection::new(addr);
            conn.connect().await.unwrap();

            let response = conn.send(RtspRequest::server_info(), 7).await.unwrap();
            assert_eq!(response.status_code, 200);
            assert_eq!(response.body_text(), "hello");

            let head = server.await.unwrap();
            assert!(head.starts_with("GET /server-info HTTP/1.1\r\n"));
            assert!(head.contains("CSeq: 7\r\n"));
        }

        #[tokio::test]
        async fn eof_before_response_is_connection_closed() {
            let (addr, _server) = serve_once(b"").await;
            let mut conn = RtspConnection::new(addr);
            conn.connect().await.unwrap();

            let result = conn.send(RtspRequest::options(), 1).await;
            assert!(matches!(result, Err(CoreError::Rtsp(RtspError::ConnectionClosed))));
        }

        #[tokio::test]
        async fn silent_peer_times_out() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let _server = tokio::spawn(async move {
                let (_stream, _) = listener.accept().await.unwrap();
                std::future::pending::<()>().await;
            });

            let mut conn = RtspConnection::new(addr).with_timeout(Duration::from_millis(100));
            conn.connect().await.unwrap();
            let result = conn.send(RtspRequest::options(), 1).await;
            assert!(matches!(result, Err(CoreError::Timeout)));
        }
    }
}
