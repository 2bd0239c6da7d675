//! Digest authentication (RFC 2069 style, no qop) for password-protected
//! AirPlay receivers.
//!
//! The scheme uses MD5:
//!   HA1 = MD5(username:realm:password)
//!   HA2 = MD5(method:uri)
//!   response = MD5(HA1:nonce:HA2)

use md5::{Digest, Md5};

/// Realm and nonce from a `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value.
    ///
    /// Returns `None` unless the scheme is `Digest` and both `realm` and
    /// `nonce` are present. Parameter values may be quoted or bare.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(char::is_whitespace).unwrap_or((header, ""));
        if !scheme.eq_ignore_ascii_case("Digest") {
            return None;
        }

        Some(Self {
            realm: extract_field(params, "realm")?,
            nonce: extract_field(params, "nonce")?,
        })
    }

    /// Username the receiver expects for this realm.
    ///
    /// RAOP receivers use realm `raop` and accept `iTunes`; AirPlay video
    /// receivers use realm `Airplay`. Anything else gets an empty username.
    pub fn username(&self) -> &'static str {
        match self.realm.as_str() {
            "raop" => "iTunes",
            "Airplay" => "Airplay",
            _ => "",
        }
    }

    /// The `response` hash for one request.
    pub fn response(&self, password: &str, method: &str, uri: &str) -> String {
        let ha1 = md5_hex(format!("{}:{}:{}", self.username(), self.realm, password).as_bytes());
        let ha2 = md5_hex(format!("{}:{}", method, uri).as_bytes());
        md5_hex(format!("{}:{}:{}", ha1, self.nonce, ha2).as_bytes())
    }

    /// Complete `Authorization` header value for one request.
    pub fn authorization(&self, password: &str, method: &str, uri: &str) -> String {
        format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", response=\"{}\"",
            self.username(),
            self.realm,
            self.nonce,
            uri,
            self.response(password, method, uri)
        )
    }
}

/// Extract a parameter value from a comma-separated challenge parameter list.
fn extract_field(params: &str, field: &str) -> Option<String> {
    params.split(',').find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case(field) {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

/// Compute MD5 hex digest of the given input.
pub fn md5_hex(input: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(input);
    let result = hasher.finalize();
    // Format as lowercase hex
    result.iter().map(|b| format!("{:02x}", b)).collect()
}
