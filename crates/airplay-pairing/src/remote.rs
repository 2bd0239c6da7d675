//! Pairing with a Remote app advertised over `_touch-remote._tcp`.
//!
//! The Remote shows a four digit PIN. We prove knowledge of it by hashing
//! the advertised `Pair` value with the PIN digits and asking the Remote's
//! HTTP endpoint for `/pair`. It answers with a DAAP `cmpa` container
//! describing itself.

use std::net::{IpAddr, SocketAddr};

use airplay_core::error::{PairingError, ParseError, Result};
use airplay_core::AirplayDevice;
use airplay_crypto::md5_hex;
use airplay_rtsp::{
    AirplaySession, RtspConnection, RtspMethod, RtspRequest, RtspTransport, SessionConfig,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::daap::DaapTags;

/// Characters left bare in the `servicename` query value.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A paired Remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    /// `cmnm`, e.g. "Mobile Computing Device".
    pub name: String,
    /// `cmty`, e.g. "iPhone".
    pub kind: String,
    /// `cmpg` rendered as uppercase hex.
    pub guid: String,
}

/// Pairing code sent to the Remote: uppercase hex MD5 of the `Pair` flag
/// followed by each PIN digit and a NUL.
pub fn pairing_code(pair_flag: &str, pin: &str) -> std::result::Result<String, PairingError> {
    let digits = pin.as_bytes();
    if digits.len() != 4 || !digits.iter().all(u8::is_ascii_digit) {
        return Err(PairingError::BadPin);
    }

    let mut code = pair_flag.as_bytes().to_vec();
    for digit in digits {
        code.push(*digit);
        code.push(0);
    }

    Ok(md5_hex(&code).to_uppercase())
}

/// Pair with a discovered Remote over a fresh TCP connection.
pub async fn pair(device: &AirplayDevice, pin: &str) -> Result<Remote> {
    let ip = device.ip.ok_or(ParseError::MissingField("ip"))?;
    let mut connection = RtspConnection::new(SocketAddr::new(IpAddr::V4(ip), device.port));
    connection.connect().await?;
    pair_over(connection, device, pin).await
}

/// Pair over an already connected transport. The transport is closed
/// afterwards.
pub async fn pair_over<T: RtspTransport>(
    transport: T,
    device: &AirplayDevice,
    pin: &str,
) -> Result<Remote> {
    let pair_flag = device.pairing_code().ok_or(ParseError::MissingField("Pair"))?;
    let code = pairing_code(pair_flag, pin)?;

    let uri = format!(
        "/pair?pairingcode={}&servicename={}",
        code,
        utf8_percent_encode(&device.name, QUERY_VALUE)
    );
    let request = RtspRequest::http(RtspMethod::Get, uri)
        .header("Host", host(device))
        .header("Viewer-Only-Client", "1");

    tracing::debug!("Pairing with remote {}", device.name);
    let mut session = AirplaySession::new(transport, SessionConfig::default());
    let result = session.make_request(request).await;
    let _ = session.close().await;
    let response = result?;

    if response.status_code != 200 {
        tracing::warn!(
            "Remote {} refused pairing with status {}",
            device.name,
            response.status_code
        );
        return Err(PairingError::BadPin.into());
    }

    let tags = DaapTags::parse(response.body.as_deref().unwrap_or_default())?;
    let remote = remote_from_tags(&tags)?;
    tracing::info!("Paired with {} ({})", remote.name, remote.kind);
    Ok(remote)
}

fn remote_from_tags(tags: &DaapTags) -> std::result::Result<Remote, PairingError> {
    let cmpa = tags
        .container("cmpa")
        .ok_or_else(|| PairingError::InvalidPairingResponse("missing cmpa container".to_string()))?;

    let field = |tag: &str| {
        cmpa.get(tag)
            .ok_or_else(|| PairingError::InvalidPairingResponse(format!("missing {}", tag)))
    };

    let name = field("cmnm")?.as_str().unwrap_or_default().into_owned();
    let kind = field("cmty")?.as_str().unwrap_or_default().into_owned();
    let guid = field("cmpg")?
        .as_bytes()
        .unwrap_or_default()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect();

    Ok(Remote { name, kind, guid })
}

fn host(device: &AirplayDevice) -> String {
    match device.ip {
        Some(ip) => format!("{}:{}", ip, device.port),
        None => format!("{}:{}", device.hostname.trim_end_matches('.'), device.port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airplay_core::error::{Error, RtspError};
    use airplay_core::DeviceType;
    use airplay_rtsp::RtspResponse;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    const PAIRING_RESPONSE: &str = "636d70610000003d636d7067000000083ae031c80b6318c9636d6e6d000000174d6f62696c6520436f6d707574696e6720446576696365636d7479000000066950686f6e65";

    /// Answers from a fixed script and records each request.
    struct ScriptedTransport {
        script: VecDeque<RtspResponse>,
        sent: Arc<Mutex<Vec<RtspRequest>>>,
        closed: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl RtspTransport for ScriptedTransport {
        async fn send(&mut self, request: RtspRequest, _cseq: u32) -> Result<RtspResponse> {
            self.sent.lock().unwrap().push(request);
            self.script
                .pop_front()
                .ok_or_else(|| RtspError::ConnectionClosed.into())
        }

        fn is_connected(&self) -> bool {
            !*self.closed.lock().unwrap()
        }

        async fn close(&mut self) -> Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn scripted(
        responses: Vec<RtspResponse>,
    ) -> (ScriptedTransport, Arc<Mutex<Vec<RtspRequest>>>, Arc<Mutex<bool>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(false));
        let transport = ScriptedTransport {
            script: responses.into(),
            sent: sent.clone(),
            closed: closed.clone(),
        };
        (transport, sent, closed)
    }

    fn http_response(status_code: u16, body: Option<Vec<u8>>) -> RtspResponse {
        RtspResponse {
            version: "HTTP/1.1".to_string(),
            status_code,
            status_text: String::new(),
            headers: HashMap::new(),
            body,
        }
    }

    fn remote_device() -> AirplayDevice {
        let mut device = AirplayDevice::new("0123456789ABCDEF@My iPhone", DeviceType::Remote);
        device.hostname = "My-iPhone.local.".to_string();
        device.ip = Some("192.168.1.30".parse().unwrap());
        device.port = 50508;
        device
            .flags
            .insert("Pair".to_string(), "8C2B3A6A7C4D1E0F".to_string());
        device
    }

    mod code {
        use super::*;

        #[test]
        fn hashes_flag_and_pin_digits() {
            assert_eq!(
                pairing_code("8C2B3A6A7C4D1E0F", "1234").unwrap(),
                "B726DCBD12E648115D8162483F39C11B"
            );
        }

        #[test]
        fn empty_flag() {
            assert_eq!(
                pairing_code("", "0000").unwrap(),
                "B209DEBE8CB90FEFF9ED8B7017213780"
            );
        }

        #[test]
        fn rejects_malformed_pins() {
            for pin in ["", "123", "12345", "12a4", "１２３４"] {
                assert!(
                    matches!(pairing_code("X", pin), Err(PairingError::BadPin)),
                    "pin {:?} accepted",
                    pin
                );
            }
        }
    }

    mod pairing {
        use super::*;

        #[tokio::test]
        async fn decodes_remote_description() {
            let body = hex::decode(PAIRING_RESPONSE).unwrap();
            let (transport, sent, closed) = scripted(vec![http_response(200, Some(body))]);

            let remote = pair_over(transport, &remote_device(), "1234").await.unwrap();
            assert_eq!(
                remote,
                Remote {
                    name: "Mobile Computing Device".to_string(),
                    kind: "iPhone".to_string(),
                    guid: "3AE031C80B6318C9".to_string(),
                }
            );
            assert!(*closed.lock().unwrap());

            let sent = sent.lock().unwrap();
            assert_eq!(sent.len(), 1);
            let request = &sent[0];
            assert_eq!(request.method, RtspMethod::Get);
            assert_eq!(
                request.uri,
                "/pair?pairingcode=B726DCBD12E648115D8162483F39C11B&servicename=0123456789ABCDEF%40My%20iPhone"
            );
            assert_eq!(request.headers.get("Viewer-Only-Client").unwrap(), "1");
            assert_eq!(request.headers.get("Host").unwrap(), "192.168.1.30:50508");
        }

        #[tokio::test]
        async fn non_200_is_bad_pin() {
            let (transport, _sent, closed) = scripted(vec![http_response(404, None)]);
            let result = pair_over(transport, &remote_device(), "1234").await;
            assert!(matches!(result, Err(Error::Pairing(PairingError::BadPin))));
            assert!(*closed.lock().unwrap());
        }

        #[tokio::test]
        async fn malformed_pin_sends_nothing() {
            let (transport, sent, _closed) = scripted(vec![]);
            let result = pair_over(transport, &remote_device(), "12").await;
            assert!(matches!(result, Err(Error::Pairing(PairingError::BadPin))));
            assert!(sent.lock().unwrap().is_empty());
        }

        #[tokio::test]
        async fn missing_cmpa_is_invalid_response() {
            let mut body = b"cmnm".to_vec();
            body.extend_from_slice(&2u32.to_be_bytes());
            body.extend_from_slice(b"hi");
            let (transport, _sent, _closed) = scripted(vec![http_response(200, Some(body))]);

            let result = pair_over(transport, &remote_device(), "1234").await;
            assert!(matches!(
                result,
                Err(Error::Pairing(PairingError::InvalidPairingResponse(_)))
            ));
        }

        #[tokio::test]
        async fn empty_body_is_invalid_response() {
            let (transport, _sent, _closed) = scripted(vec![http_response(200, None)]);
            let result = pair_over(transport, &remote_device(), "1234").await;
            assert!(matches!(
                result,
                Err(Error::Pairing(PairingError::InvalidPairingResponse(_)))
            ));
        }

        #[tokio::test]
        async fn truncated_daap_is_daap_error() {
            let body = hex::decode(PAIRING_RESPONSE).unwrap();
            let (transport, _sent, _closed) =
                scripted(vec![http_response(200, Some(body[..20].to_vec()))]);

            let result = pair_over(transport, &remote_device(), "1234").await;
            assert!(matches!(result, Err(Error::Pairing(PairingError::Daap(_)))));
        }

        #[tokio::test]
        async fn missing_pair_flag() {
            let mut device = remote_device();
            device.flags.clear();
            let (transport, _sent, _closed) = scripted(vec![]);

            let result = pair_over(transport, &device, "1234").await;
            assert!(matches!(
                result,
                Err(Error::Parse(ParseError::MissingField("Pair")))
            ));
        }

        #[tokio::test]
        async fn pair_without_address_fails() {
            let mut device = remote_device();
            device.ip = None;
            let result = pair(&device, "1234").await;
            assert!(matches!(result, Err(Error::Parse(ParseError::MissingField("ip")))));
        }
    }

    #[test]
    fn host_falls_back_to_hostname() {
        let mut device = remote_device();
        device.ip = None;
        assert_eq!(host(&device), "My-iPhone.local:50508");
    }
}
