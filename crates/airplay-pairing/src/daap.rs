//! DAAP tag/length/value decoding.
//!
//! Format: [Tag: 4 bytes][Length: 4 bytes big-endian][Value: Length bytes]
//! repeated to the end of the buffer. Container tags hold another run of
//! triples; every other tag holds raw bytes.

use std::borrow::Cow;
use std::fmt;

use airplay_core::error::PairingError;

/// Tags whose payload is itself a tag list.
pub const CONTAINER_TAGS: [&str; 15] = [
    "cmst", "mlog", "agal", "mlcl", "mshl", "mlit", "abro", "abar", "apso", "caci", "avdb", "cmgt",
    "aply", "adbs", "cmpa",
];

/// Deepest container nesting accepted from the wire.
pub const MAX_DEPTH: usize = 32;

/// Check if a tag is decoded recursively.
pub fn is_container(tag: &str) -> bool {
    CONTAINER_TAGS.contains(&tag)
}

/// One decoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaapValue {
    Container(DaapTags),
    Bytes(Vec<u8>),
}

impl DaapValue {
    /// Leaf payload as text, lossily decoded.
    pub fn as_str(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Bytes(bytes) => Some(String::from_utf8_lossy(bytes)),
            Self::Container(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Container(_) => None,
        }
    }

    pub fn as_container(&self) -> Option<&DaapTags> {
        match self {
            Self::Container(tags) => Some(tags),
            Self::Bytes(_) => None,
        }
    }
}

/// Tag to value mapping, kept in wire order. A repeated tag replaces the
/// earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaapTags {
    items: Vec<(String, DaapValue)>,
}

impl DaapTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a buffer of consecutive tag/length/value triples.
    ///
    /// Containers nested more than [`MAX_DEPTH`] levels are rejected.
    pub fn parse(data: &[u8]) -> Result<Self, PairingError> {
        Self::parse_at(data, 0)
    }

    fn parse_at(data: &[u8], depth: usize) -> Result<Self, PairingError> {
        if depth > MAX_DEPTH {
            return Err(PairingError::Daap(format!(
                "nesting too deep (more than {} containers)",
                MAX_DEPTH
            )));
        }

        let mut tags = Self::new();
        let mut i = 0;

        while i < data.len() {
            if i + 8 > data.len() {
                return Err(PairingError::Daap(format!(
                    "truncated header at offset {} ({} bytes left)",
                    i,
                    data.len() - i
                )));
            }

            let tag = String::from_utf8_lossy(&data[i..i + 4]).into_owned();
            let len = u32::from_be_bytes([data[i + 4], data[i + 5], data[i + 6], data[i + 7]]) as usize;
            i += 8;

            if len > data.len() - i {
                return Err(PairingError::Daap(format!(
                    "{}: truncated value (expected {} bytes, got {})",
                    tag,
                    len,
                    data.len() - i
                )));
            }

            let payload = &data[i..i + len];
            i += len;

            let value = if is_container(&tag) {
                DaapValue::Container(Self::parse_at(payload, depth + 1)?)
            } else {
                DaapValue::Bytes(payload.to_vec())
            };
            tags.insert(tag, value);
        }

        Ok(tags)
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, tag: impl Into<String>, value: DaapValue) {
        let tag = tag.into();
        match self.items.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = value,
            None => self.items.push((tag, value)),
        }
    }

    pub fn get(&self, tag: &str) -> Option<&DaapValue> {
        self.items.iter().find(|(t, _)| t == tag).map(|(_, v)| v)
    }

    /// Nested container for `tag`.
    pub fn container(&self, tag: &str) -> Option<&DaapTags> {
        self.get(tag).and_then(DaapValue::as_container)
    }

    /// Leaf payload for `tag` as text.
    pub fn string(&self, tag: &str) -> Option<String> {
        self.get(tag)
            .and_then(DaapValue::as_str)
            .map(Cow::into_owned)
    }

    pub fn bytes(&self, tag: &str) -> Option<&[u8]> {
        self.get(tag).and_then(DaapValue::as_bytes)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DaapValue)> {
        self.items.iter().map(|(t, v)| (t.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        for (tag, value) in &self.items {
            for _ in 0..indent {
                f.write_str("\t")?;
            }
            match value {
                DaapValue::Container(tags) => {
                    writeln!(f, "{}:", tag)?;
                    tags.write_indented(f, indent + 1)?;
                }
                DaapValue::Bytes(bytes) => {
                    writeln!(f, "{}: {}", tag, String::from_utf8_lossy(bytes))?;
                }
            }
        }
        Ok(())
    }
}

/// Tab-indented dump, one tag per line.
impl fmt::Display for DaapTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
