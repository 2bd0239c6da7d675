//! Responses from a receiver's control channel.
//!
//! AirPlay receivers answer RTSP methods with `RTSP/1.0` and the `/pair`,
//! `/server-info` endpoints with `HTTP/1.1`. Both share one layout: a status
//! line, `Name: value` headers, a blank line, then `Content-Length` bytes.

use std::collections::HashMap;

use airplay_core::error::{Result, RtspError};
use airplay_crypto::DigestChallenge;

const HEAD_END: &[u8] = b"\r\n\r\n";

/// A decoded status line, headers and body.
#[derive(Debug, Clone)]
pub struct RtspResponse {
    /// Protocol token from the status line, e.g. `RTSP/1.0` or `HTTP/1.1`.
    pub version: String,
    pub status_code: u16,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl RtspResponse {
    /// Decode one complete response.
    ///
    /// The buffer must hold the whole head and at least `Content-Length`
    /// body bytes; anything after the body is ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let split = data
            .windows(HEAD_END.len())
            .position(|w| w == HEAD_END)
            .ok_or_else(|| invalid("no blank line after headers"))?;
        let head = std::str::from_utf8(&data[..split])
            .map_err(|_| invalid("headers are not UTF-8"))?;

        let (status_line, header_lines) = head.split_once("\r\n").unwrap_or((head, ""));
        let (version, status_code, status_text) = parse_status_line(status_line)?;

        let headers: HashMap<String, String> = header_lines
            .split("\r\n")
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        let mut response = Self {
            version,
            status_code,
            status_text,
            headers,
            body: None,
        };

        let wanted = response.content_length().unwrap_or(0);
        if wanted > 0 {
            let rest = &data[split + HEAD_END.len()..];
            let body = rest.get(..wanted).ok_or_else(|| {
                invalid(format!("body has {} of {} bytes", rest.len(), wanted))
            })?;
            response.body = Some(body.to_vec());
        }

        Ok(response)
    }

    /// 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// `401`, the receiver wants credentials.
    pub fn is_unauthorized(&self) -> bool {
        self.status_code == 401
    }

    /// Whether this came back over HTTP rather than RTSP.
    pub fn is_http(&self) -> bool {
        self.version.starts_with("HTTP/")
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn cseq(&self) -> Option<u32> {
        self.header("CSeq").and_then(|v| v.parse().ok())
    }

    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length").and_then(|v| v.parse().ok())
    }

    /// Digest challenge carried by `WWW-Authenticate`, if there is one.
    pub fn digest_challenge(&self) -> Option<DigestChallenge> {
        self.header("WWW-Authenticate").and_then(DigestChallenge::parse)
    }

    /// Methods listed in the `Public` header of an `OPTIONS` answer.
    pub fn public_methods(&self) -> impl Iterator<Item = &str> {
        self.header("Public")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    /// Whether `Public` lists `method`.
    pub fn allows(&self, method: &str) -> bool {
        self.public_methods().any(|m| m == method)
    }

    /// Body as text, lossily decoded. Empty when there is no body.
    pub fn body_text(&self) -> String {
        self.body
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// `UnexpectedStatus` unless 2xx.
    pub fn ensure_success(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(RtspError::UnexpectedStatus(self.status_code).into())
        }
    }
}

fn invalid(reason: impl Into<String>) -> RtspError {
    RtspError::InvalidResponse(reason.into())
}

/// `<version> <code>[ <text>]`, where version is `RTSP/x` or `HTTP/x`.
fn parse_status_line(line: &str) -> Result<(String, u16, String)> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("RTSP/") && !version.starts_with("HTTP/") {
        return Err(invalid(format!("unknown protocol in status line {:?}", line)).into());
    }

    let code = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| invalid(format!("no status code in {:?}", line)))?;
    let text = parts.next().unwrap_or_default().to_string();

    Ok((version.to_string(), code, text))
}
