//! DNS message model: header, questions and typed resource records.

use std::net::{Ipv4Addr, Ipv6Addr};

/// Resource record type codes handled by this crate.
pub mod rtype {
    pub const A: u16 = 1;
    pub const PTR: u16 = 12;
    pub const TXT: u16 = 16;
    pub const AAAA: u16 = 28;
    pub const SRV: u16 = 33;
    pub const NSEC: u16 = 47;
    pub const ANY: u16 = 255;
}

/// Class codes.
pub mod class {
    pub const IN: u16 = 1;
    pub const ANY: u16 = 255;
}

/// A full DNS message, header included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsMessage {
    /// Matches a response to its query. Always 0 in mDNS.
    pub id: u16,
    pub is_response: bool,
    pub opcode: u8,
    pub is_authoritative: bool,
    pub is_truncated: bool,
    pub is_recursion_desired: bool,
    pub is_recursion_available: bool,
    /// Reserved bit, must be false.
    pub is_zero: bool,
    pub rcode: u8,

    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    /// Authority section.
    pub authorities: Vec<ResourceRecord>,
    /// Additional section.
    pub extras: Vec<ResourceRecord>,
}

impl DnsMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_question(&mut self, question: Question) {
        self.questions.push(question);
    }

    pub fn add_answer(&mut self, record: ResourceRecord) {
        self.answers.push(record);
    }

    pub fn add_authority(&mut self, record: ResourceRecord) {
        self.authorities.push(record);
    }

    pub fn add_extra(&mut self, record: ResourceRecord) {
        self.extras.push(record);
    }

    /// Answer records followed by additional records, in message order.
    pub fn answers_and_extras(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.answers.iter().chain(self.extras.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Dot-terminated domain name, e.g. `_raop._tcp.local.`.
    pub name: String,
    pub qtype: u16,
    pub class: u16,
}

impl Question {
    pub fn new(name: impl Into<String>, qtype: u16, class: u16) -> Self {
        Self {
            name: name.into(),
            qtype,
            class,
        }
    }
}

/// A resource record. Its type code is derived from the payload variant, so
/// the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    /// Class without the cache-flush bit.
    pub class: u16,
    /// mDNS cache-flush bit (high bit of the class field).
    pub cache_clear: bool,
    /// Time to live in seconds.
    pub ttl: u32,
    pub rdata: Rdata,
}

impl ResourceRecord {
    pub fn new(name: impl Into<String>, ttl: u32, rdata: Rdata) -> Self {
        Self {
            name: name.into(),
            class: class::IN,
            cache_clear: false,
            ttl,
            rdata,
        }
    }

    /// Record type code.
    pub fn rtype(&self) -> u16 {
        self.rdata.rtype()
    }
}

/// Typed record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rdata {
    A(Ipv4Addr),
    Ptr(String),
    /// Ordered `key=value` byte strings.
    Txt(Vec<Vec<u8>>),
    Aaaa(Ipv6Addr),
    Srv(Srv),
    /// Any other type; the payload is kept undecoded. Codes with a typed
    /// variant above are refused by the encoder.
    Unknown { rtype: u16, data: Vec<u8> },
}

impl Rdata {
    /// Raw payload for a type without its own variant. `None` for A, PTR,
    /// TXT, AAAA and SRV.
    pub fn unknown(code: u16, data: Vec<u8>) -> Option<Self> {
        if Self::is_typed(code) {
            None
        } else {
            Some(Self::Unknown { rtype: code, data })
        }
    }

    /// Whether `code` decodes into a typed variant.
    pub fn is_typed(code: u16) -> bool {
        matches!(
            code,
            rtype::A | rtype::PTR | rtype::TXT | rtype::AAAA | rtype::SRV
        )
    }

    pub fn rtype(&self) -> u16 {
        match self {
            Self::A(_) => rtype::A,
            Self::Ptr(_) => rtype::PTR,
            Self::Txt(_) => rtype::TXT,
            Self::Aaaa(_) => rtype::AAAA,
            Self::Srv(_) => rtype::SRV,
            Self::Unknown { rtype, .. } => *rtype,
        }
    }
}

/// Service locator payload (RFC 2782).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Srv {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

/// Split a dot-terminated name into its labels, dropping the root label.
pub fn labels(name: &str) -> impl Iterator<Item = &str> {
    name.split('.').filter(|label| !label.is_empty())
}

/// First label of a name (`Foo` for `Foo._raop._tcp.local.`), empty for the root.
pub fn first_label(name: &str) -> &str {
    labels(name).next().unwrap_or("")
}
