//! Authenticated control session with an AirPlay receiver.
//!
//! A session owns one transport, stamps every request with the fixed
//! headers receivers expect, and answers `401 Unauthorized` with a single
//! Digest retry.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use airplay_core::error::{Error as CoreError, ParseError, Result, RtspError};
use airplay_core::AirplayDevice;
use airplay_crypto::DigestChallenge;
use uuid::Uuid;

use crate::connection::{RtspConnection, DEFAULT_TIMEOUT};
use crate::traits::RtspTransport;
use crate::{RtspMethod, RtspRequest, RtspResponse};

/// Default `User-Agent` header value.
pub const DEFAULT_USER_AGENT: &str = "airplay-rs/1.0";

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Receiver password, if one is configured.
    pub password: Option<String>,
    pub user_agent: String,
    /// `X-Apple-Session-ID` value. Generated when absent.
    pub session_id: Option<String>,
    /// Connect and per-response timeout.
    pub timeout: Duration,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            password: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            session_id: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Progress of one request through the Digest exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthPhase {
    /// Sent without credentials.
    NoChallenge,
    /// Sent with credentials from a challenge cached by an earlier request.
    Challenged,
    /// Resent with credentials from this request's own `401`.
    Retried,
}

/// Control session over an [`RtspTransport`].
pub struct AirplaySession<T: RtspTransport = RtspConnection> {
    transport: T,
    session_id: String,
    password: Option<String>,
    user_agent: String,
    cseq: u32,
    challenge: Option<DigestChallenge>,
}

impl AirplaySession<RtspConnection> {
    /// Connect over TCP and verify the receiver with `OPTIONS *`.
    pub async fn dial(addr: SocketAddr, config: SessionConfig) -> Result<Self> {
        let mut connection = RtspConnection::new(addr).with_timeout(config.timeout);
        connection.connect().await?;
        Self::over(connection, config).await
    }

    /// Dial a discovered device at its resolved address and port.
    pub async fn dial_device(device: &AirplayDevice, config: SessionConfig) -> Result<Self> {
        let ip = device.ip.ok_or(ParseError::MissingField("ip"))?;
        tracing::debug!("Dialing {} at {}:{}", device.name, ip, device.port);
        Self::dial(SocketAddr::new(IpAddr::V4(ip), device.port), config).await
    }
}

impl<T: RtspTransport> AirplaySession<T> {
    /// Wrap a transport without any handshake.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let session_id = config
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string().to_uppercase());

        Self {
            transport,
            session_id,
            password: config.password,
            user_agent: config.user_agent,
            cseq: 0,
            challenge: None,
        }
    }

    /// Wrap a connected transport and run the `OPTIONS *` check.
    ///
    /// The receiver must answer 200 and list `ANNOUNCE` in `Public`.
    pub async fn over(transport: T, config: SessionConfig) -> Result<Self> {
        let mut session = Self::new(transport, config);
        session.check_options().await?;
        Ok(session)
    }

    async fn check_options(&mut self) -> Result<()> {
        let response = match self.make_request(RtspRequest::options()).await {
            Ok(response) => response,
            Err(CoreError::Rtsp(RtspError::ConnectionClosed)) | Err(CoreError::Timeout) => {
                return Err(RtspError::NoOptions.into());
            }
            Err(e) => return Err(e),
        };

        if response.status_code != 200 {
            tracing::warn!("OPTIONS answered with {}", response.status_code);
            return Err(RtspError::NoOptions.into());
        }

        if !response.allows("ANNOUNCE") {
            return Err(RtspError::InvalidOptions.into());
        }

        Ok(())
    }

    /// Send a request, retrying once with Digest credentials on the first
    /// `401`.
    ///
    /// A `401` fails with `PasswordRequired` when no password is set, with
    /// `PasswordInvalid` once credentials have already been sent, and with
    /// `AuthUnsupported` when the challenge is missing or not Digest.
    pub async fn make_request(&mut self, request: RtspRequest) -> Result<RtspResponse> {
        let mut phase = if self.challenge.is_some() {
            AuthPhase::Challenged
        } else {
            AuthPhase::NoChallenge
        };

        loop {
            let response = self.send_once(request.clone()).await?;
            if !response.is_unauthorized() {
                return Ok(response);
            }

            if self.password.as_deref().map_or(true, str::is_empty) {
                return Err(RtspError::PasswordRequired.into());
            }

            match phase {
                AuthPhase::NoChallenge => {
                    let challenge = response
                        .digest_challenge()
                        .ok_or(RtspError::AuthUnsupported)?;
                    tracing::debug!(
                        "Digest challenge for realm {:?}, retrying {} {}",
                        challenge.realm,
                        request.method.as_str(),
                        request.uri
                    );
                    self.challenge = Some(challenge);
                    phase = AuthPhase::Retried;
                }
                AuthPhase::Challenged | AuthPhase::Retried => {
                    tracing::warn!("Receiver rejected credentials for {}", request.uri);
                    return Err(RtspError::PasswordInvalid.into());
                }
            }
        }
    }

    /// `RTSP/1.0` request with an empty body.
    pub async fn rtsp_request(
        &mut self,
        method: RtspMethod,
        uri: impl Into<String>,
    ) -> Result<RtspResponse> {
        self.make_request(RtspRequest::new(method, uri)).await
    }

    /// `HTTP/1.1` request with an empty body.
    pub async fn http_request(
        &mut self,
        method: RtspMethod,
        uri: impl Into<String>,
    ) -> Result<RtspResponse> {
        self.make_request(RtspRequest::http(method, uri)).await
    }

    /// Fetch `/server-info` and return its body.
    pub async fn server_info(&mut self) -> Result<Vec<u8>> {
        let response = self.make_request(RtspRequest::server_info()).await?;
        response.ensure_success()?;
        Ok(response.body.unwrap_or_default())
    }

    async fn send_once(&mut self, request: RtspRequest) -> Result<RtspResponse> {
        let mut request = request
            .header("User-Agent", self.user_agent.as_str())
            .header("X-Apple-Session-ID", self.session_id.as_str());

        if let (Some(challenge), Some(password)) = (&self.challenge, &self.password) {
            let authorization =
                challenge.authorization(password, request.method.as_str(), &request.uri);
            request = request.header("Authorization", authorization);
        }

        self.cseq += 1;
        self.transport.send(request, self.cseq).await
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Cached Digest challenge, once the receiver has sent one.
    pub fn challenge(&self) -> Option<&DigestChallenge> {
        self.challenge.as_ref()
    }

    /// Sequence number of the last request sent.
    pub fn cseq(&self) -> u32 {
        self.cseq
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }
}
