//! RTSP/HTTP request formatting.

use std::collections::HashMap;
use std::fmt::Write;

/// Request methods used on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtspMethod {
    Options,
    Announce,
    Setup,
    Record,
    Teardown,
    GetParameter,
    SetParameter,
    Get,
    Post,
}

impl RtspMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Options => "OPTIONS",
            Self::Announce => "ANNOUNCE",
            Self::Setup => "SETUP",
            Self::Record => "RECORD",
            Self::Teardown => "TEARDOWN",
            Self::GetParameter => "GET_PARAMETER",
            Self::SetParameter => "SET_PARAMETER",
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Protocol named in the request line. AirPlay receivers answer both on the
/// same port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Rtsp,
    Http,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rtsp => "RTSP/1.0",
            Self::Http => "HTTP/1.1",
        }
    }
}

/// Control-channel request builder.
#[derive(Debug, Clone)]
pub struct RtspRequest {
    pub method: RtspMethod,
    pub uri: String,
    pub protocol: Protocol,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl RtspRequest {
    /// New `RTSP/1.0` request.
    pub fn new(method: RtspMethod, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            protocol: Protocol::Rtsp,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// New `HTTP/1.1` request.
    pub fn http(method: RtspMethod, uri: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Http,
            ..Self::new(method, uri)
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize to wire format.
    ///
    /// Format:
    /// ```text
    /// METHOD URI RTSP/1.0\r\n
    /// CSeq: N\r\n
    /// Content-Length: M\r\n
    /// Header: Value\r\n
    /// ...
    /// \r\n
    /// [body]
    /// ```
    pub fn serialize(&self, cseq: u32) -> Vec<u8> {
        let mut head = String::new();

        // Writing into a String cannot fail.
        let _ = write!(head, "{} {} {}\r\n", self.method.as_str(), self.uri, self.protocol.as_str());
        let _ = write!(head, "CSeq: {}\r\n", cseq);
        let _ = write!(
            head,
            "Content-Length: {}\r\n",
            self.body.as_ref().map(Vec::len).unwrap_or(0)
        );

        // Other headers (sorted for consistent output in tests)
        let mut sorted_headers: Vec<_> = self
            .headers
            .iter()
            .filter(|(k, _)| {
                !k.eq_ignore_ascii_case("CSeq") && !k.eq_ignore_ascii_case("Content-Length")
            })
            .collect();
        sorted_headers.sort_by(|a, b| a.0.cmp(b.0));

        for (key, value) in sorted_headers {
            let _ = write!(head, "{}: {}\r\n", key, value);
        }

        // Blank line ending headers
        head.push_str("\r\n");

        let mut out = head.into_bytes();
        if let Some(ref body) = self.body {
            out.extend_from_slice(body);
        }
        out
    }

    // Factory methods for common requests

    /// `OPTIONS *`, used to check a receiver's capabilities.
    pub fn options() -> Self {
        Self::new(RtspMethod::Options, "*")
    }

    /// `GET /server-info` over HTTP.
    pub fn server_info() -> Self {
        Self::http(RtspMethod::Get, "/server-info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod request_building {
        use super::*;

        #[test]
        fn new_creates_rtsp_request() {
            let req = RtspRequest::new(RtspMethod::Options, "*");
            assert_eq!(req.method, RtspMethod::Options);
            assert_eq!(req.uri, "*");
            assert_eq!(req.protocol, Protocol::Rtsp);
            assert!(req.headers.is_empty());
            assert!(req.body.is_none());
        }

        #[test]
        fn http_sets_protocol() {
            let req = RtspRequest::http(RtspMethod::Get, "/server-info");
            assert_eq!(req.protocol, Protocol::Http);
            assert_eq!(req.uri, "/server-info");
        }

        #[test]
        fn header_adds_header() {
            let req = RtspRequest::options().header("X-Custom", "value");
            assert_eq!(req.headers.get("X-Custom"), Some(&"value".to_string()));
        }
    }

    mod serialization {
        use super::*;

        fn text(req: &RtspRequest, cseq: u32) -> String {
            String::from_utf8(req.serialize(cseq)).unwrap()
        }

        #[test]
        fn rtsp_request_line() {
            let t = text(&RtspRequest::options(), 1);
            assert!(t.starts_with("OPTIONS * RTSP/1.0\r\n"));
        }

        #[test]
        fn http_request_line() {
            let t = text(&RtspRequest::server_info(), 1);
            assert!(t.starts_with("GET /server-info HTTP/1.1\r\n"));
        }

        #[test]
        fn always_carries_cseq_and_content_length() {
            let t = text(&RtspRequest::options(), 42);
            assert!(t.contains("CSeq: 42\r\n"));
            assert!(t.contains("Content-Length: 0\r\n"));
            assert!(t.ends_with("\r\n\r\n"));
        }

        #[test]
        fn caller_cannot_duplicate_framing_headers() {
            let req = RtspRequest::options()
                .header("CSeq", "99")
                .header("Content-Length", "5");
            let t = text(&req, 3);
            assert_eq!(t.matches("CSeq").count(), 1);
            assert!(t.contains("CSeq: 3\r\n"));
            assert!(t.contains("Content-Length: 0\r\n"));
        }

        #[test]
        fn headers_are_sorted() {
            let req = RtspRequest::options()
                .header("X-Apple-Session-ID", "abc")
                .header("User-Agent", "airplay-rs/1.0");
            let t = text(&req, 1);
            let ua = t.find("User-Agent").unwrap();
            let sid = t.find("X-Apple-Session-ID").unwrap();
            assert!(ua < sid);
        }

        #[test]
        fn body_follows_blank_line() {
            let req = RtspRequest::new(RtspMethod::Post, "/test").body(vec![1, 2, 3]);
            let data = req.serialize(1);
            assert!(String::from_utf8_lossy(&data).contains("Content-Length: 3\r\n"));
            assert_eq!(&data[data.len() - 7..], b"\r\n\r\n\x01\x02\x03");
        }
    }
}
