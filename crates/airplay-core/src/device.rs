//! Device representation and TXT flag accessors.

use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;

/// Kind of service a device was announced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// Announced as `_raop` or `_airplay`.
    Airplay,
    /// Announced as `_touch-remote` (an iOS Remote app awaiting pairing).
    Remote,
}

impl DeviceType {
    /// Map a DNS-SD service label (e.g. `_raop`) to a device type.
    ///
    /// Unknown labels yield `None` and are ignored by discovery.
    pub fn from_service_label(label: &str) -> Option<Self> {
        match label {
            "_raop" | "_airplay" => Some(Self::Airplay),
            "_touch-remote" => Some(Self::Remote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Airplay => "airplay",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device assembled from PTR, SRV, TXT and A records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirplayDevice {
    /// First label of the service instance name, e.g. `0024369AC88C@Living Room`.
    pub name: String,
    /// SRV target, e.g. `Living-Room.local.`. Empty until an SRV record arrives.
    pub hostname: String,
    /// Last globally routable IPv4 address seen for the hostname.
    pub ip: Option<Ipv4Addr>,
    /// SRV port, 0 until an SRV record arrives.
    pub port: u16,
    pub device_type: DeviceType,
    /// TXT `key=value` entries.
    pub flags: HashMap<String, String>,
}

impl AirplayDevice {
    pub fn new(name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            name: name.into(),
            hostname: String::new(),
            ip: None,
            port: 0,
            device_type,
            flags: HashMap::new(),
        }
    }

    /// Raw TXT flag value.
    pub fn flag(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    // --- Audio format ---

    /// Number of audio channels (`ch`), 0 if absent or unparseable.
    pub fn audio_channels(&self) -> i32 {
        self.flag_number("ch")
    }

    /// Sample rate in Hz (`sr`), 0 if absent or unparseable.
    pub fn sample_rate(&self) -> i32 {
        self.flag_number("sr")
    }

    /// Bits per sample (`ss`), 0 if absent or unparseable.
    pub fn sample_size(&self) -> i32 {
        self.flag_number("ss")
    }

    /// Supported codecs from `cn` (0=PCM, 1=ALAC, 2=AAC, 3=AAC-ELD).
    pub fn compression_types(&self) -> Vec<i32> {
        self.flag_list("cn")
    }

    /// Supported encryption types from `et` (0=none, 1=RSA, 3=FairPlay, ...).
    pub fn encryption_types(&self) -> Vec<i32> {
        self.flag_list("et")
    }

    /// Supported metadata types from `md` (0=text, 1=artwork, 2=progress).
    pub fn metadata_types(&self) -> Vec<i32> {
        self.flag_list("md")
    }

    /// Transports from `tp`, e.g. `["TCP", "UDP"]`.
    pub fn transports(&self) -> Vec<String> {
        self.flag("tp")
            .map(|tp| tp.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default()
    }

    // --- Access ---

    pub fn password_required(&self) -> bool {
        self.flag("pw") == Some("true")
    }

    /// Whether the receiver advertises digest authentication (`da`).
    pub fn digest_auth(&self) -> bool {
        self.flag("da") == Some("true")
    }

    // --- Versions ---

    /// Device model from `am`, e.g. `AirPort4,107`.
    pub fn model(&self) -> Option<&str> {
        self.flag("am")
    }

    /// Server version from `vs`.
    pub fn server_version(&self) -> Option<&str> {
        self.flag("vs")
    }

    /// Protocol version from `vn`.
    pub fn protocol_version(&self) -> Option<&str> {
        self.flag("vn")
    }

    /// Firmware version from `fv`.
    pub fn firmware_version(&self) -> Option<&str> {
        self.flag("fv")
    }

    pub fn txt_version(&self) -> Option<&str> {
        self.flag("txtvers")
    }

    // --- Remote pairing (`_touch-remote`) ---

    pub fn remote_device_name(&self) -> Option<&str> {
        self.flag("DvNm")
    }

    pub fn remote_device_type(&self) -> Option<&str> {
        self.flag("DvTy")
    }

    pub fn remote_name(&self) -> Option<&str> {
        self.flag("RemN")
    }

    pub fn remote_version(&self) -> Option<&str> {
        self.flag("RemV")
    }

    /// Pairing code the remote expects to be hashed with the PIN.
    pub fn pairing_code(&self) -> Option<&str> {
        self.flag("Pair")
    }

    fn flag_number(&self, key: &str) -> i32 {
        self.flag(key)
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(0)
    }

    fn flag_list(&self, key: &str) -> Vec<i32> {
        self.flag(key)
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().parse::<i32>().unwrap_or(-1))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for AirplayDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.device_type)?;
        if !self.hostname.is_empty() {
            write!(f, " host={}", self.hostname)?;
        }
        match self.ip {
            Some(ip) => write!(f, " addr={}:{}", ip, self.port)?,
            None => write!(f, " port={}", self.port)?,
        }

        let mut keys: Vec<_> = self.flags.keys().collect();
        keys.sort();
        for key in keys {
            write!(f, "\n  {}={}", key, self.flags[key])?;
        }
        Ok(())
    }
}

/// Whether an IPv4 address is usable to reach a device.
///
/// Rejects loopback, link-local (169.254/16), multicast, broadcast and the
/// unspecified address. Private ranges are accepted.
pub fn is_routable(ip: Ipv4Addr) -> bool {
    !(ip.is_loopback()
        || ip.is_link_local()
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_unspecified())
}
