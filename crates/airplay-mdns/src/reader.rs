//! Decoding of raw datagrams into [`DnsMessage`]s.
//!
//! Names may use RFC 1035 §4.1.4 compression: a two-byte field with the top
//! two bits set holds a 14-bit absolute offset into the same buffer where the
//! rest of the name continues.

use std::net::{Ipv4Addr, Ipv6Addr};

use airplay_core::error::DnsError;

use crate::message::{rtype, DnsMessage, Question, Rdata, ResourceRecord, Srv};

/// Upper bound on compression jumps while reading one name.
const MAX_POINTER_JUMPS: usize = 128;

/// Size of the fixed header.
const HEADER_LEN: usize = 12;

impl DnsMessage {
    /// Decode a complete message.
    ///
    /// Fails if any field runs past the end of `buffer`, or if bytes remain
    /// after the last declared record.
    pub fn parse(buffer: &[u8]) -> Result<Self, DnsError> {
        let mut reader = Reader::new(buffer);
        let mut msg = DnsMessage::new();

        msg.id = reader.u16()?;

        let flags = reader.u8()?;
        msg.is_response = flags & 0x80 != 0;
        msg.opcode = (flags >> 3) & 0x0F;
        msg.is_authoritative = flags & 0x04 != 0;
        msg.is_truncated = flags & 0x02 != 0;
        msg.is_recursion_desired = flags & 0x01 != 0;

        let flags = reader.u8()?;
        msg.is_recursion_available = flags & 0x80 != 0;
        msg.is_zero = flags & 0x40 != 0;
        msg.rcode = flags & 0x0F;

        let qdcount = reader.u16()?;
        let ancount = reader.u16()?;
        let nscount = reader.u16()?;
        let arcount = reader.u16()?;
        debug_assert_eq!(reader.offset, HEADER_LEN);

        for _ in 0..qdcount {
            let name = reader.name()?;
            let qtype = reader.u16()?;
            let class = reader.u16()?;
            msg.questions.push(Question { name, qtype, class });
        }
        for _ in 0..ancount {
            msg.answers.push(reader.record()?);
        }
        for _ in 0..nscount {
            msg.authorities.push(reader.record()?);
        }
        for _ in 0..arcount {
            msg.extras.push(reader.record()?);
        }

        if reader.offset != buffer.len() {
            return Err(DnsError::TrailingBytes {
                expected: buffer.len(),
                actual: reader.offset,
            });
        }

        Ok(msg)
    }
}

/// Cursor over a message buffer.
struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DnsError> {
        let bytes = slice(self.buf, self.offset, n)?;
        self.offset += n;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, DnsError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DnsError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, DnsError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn name(&mut self) -> Result<String, DnsError> {
        let (name, end) = read_name(self.buf, self.offset)?;
        self.offset = end;
        Ok(name)
    }

    fn record(&mut self) -> Result<ResourceRecord, DnsError> {
        let name = self.name()?;
        let rtype = self.u16()?;
        let raw_class = self.u16()?;
        let ttl = self.u32()?;
        let length = self.u16()? as usize;

        let start = self.offset;
        let data = self.take(length)?;
        let rdata = decode_rdata(self.buf, rtype, start, data)?;

        Ok(ResourceRecord {
            name,
            class: raw_class & 0x7FFF,
            cache_clear: raw_class & 0x8000 != 0,
            ttl,
            rdata,
        })
    }
}

fn slice(buf: &[u8], offset: usize, n: usize) -> Result<&[u8], DnsError> {
    buf.get(offset..offset + n).ok_or(DnsError::Truncated {
        offset,
        needed: n,
        len: buf.len(),
    })
}

/// Read a possibly-compressed name starting at `start`.
///
/// Returns the dot-terminated name and the offset just past its in-place
/// encoding (after the first pointer, if one was followed).
fn read_name(buf: &[u8], start: usize) -> Result<(String, usize), DnsError> {
    let mut name = String::new();
    let mut pos = start;
    let mut end = None;
    let mut jumps = 0;

    loop {
        let length = slice(buf, pos, 1)?[0];
        match length & 0xC0 {
            0x00 => {
                if length == 0 {
                    pos += 1;
                    break;
                }
                let label = slice(buf, pos + 1, length as usize)?;
                name.push_str(&String::from_utf8_lossy(label));
                name.push('.');
                pos += 1 + length as usize;
            }
            0xC0 => {
                let low = slice(buf, pos + 1, 1)?[0];
                if end.is_none() {
                    end = Some(pos + 2);
                }
                jumps += 1;
                if jumps > MAX_POINTER_JUMPS {
                    return Err(DnsError::PointerLoop(start));
                }
                pos = (((length & 0x3F) as usize) << 8) | low as usize;
            }
            _ => {
                return Err(DnsError::InvalidLabel {
                    byte: length,
                    offset: pos,
                })
            }
        }
    }

    if name.is_empty() {
        name.push('.');
    }
    Ok((name, end.unwrap_or(pos)))
}

/// Decode the payload of one record. `data` is the RDATA window starting at
/// absolute offset `start`; embedded names may point outside of it.
fn decode_rdata(buf: &[u8], rtype: u16, start: usize, data: &[u8]) -> Result<Rdata, DnsError> {
    let bad_length = || DnsError::RdataLength {
        rtype,
        length: data.len(),
    };
    let window_end = start + data.len();

    let rdata = match rtype {
        rtype::A => {
            let octets: [u8; 4] = data.try_into().map_err(|_| bad_length())?;
            Rdata::A(Ipv4Addr::from(octets))
        }
        rtype::AAAA => {
            let octets: [u8; 16] = data.try_into().map_err(|_| bad_length())?;
            Rdata::Aaaa(Ipv6Addr::from(octets))
        }
        rtype::PTR => {
            let (name, end) = read_name(buf, start)?;
            if end > window_end {
                return Err(bad_length());
            }
            Rdata::Ptr(name)
        }
        rtype::SRV => {
            if data.len() < 7 {
                return Err(bad_length());
            }
            let (target, end) = read_name(buf, start + 6)?;
            if end > window_end {
                return Err(bad_length());
            }
            Rdata::Srv(Srv {
                priority: u16::from_be_bytes([data[0], data[1]]),
                weight: u16::from_be_bytes([data[2], data[3]]),
                port: u16::from_be_bytes([data[4], data[5]]),
                target,
            })
        }
        rtype::TXT => {
            let mut entries = Vec::new();
            let mut i = 0;
            while i < data.len() {
                let len = data[i] as usize;
                let entry = data.get(i + 1..i + 1 + len).ok_or_else(bad_length)?;
                entries.push(entry.to_vec());
                i += 1 + len;
            }
            Rdata::Txt(entries)
        }
        _ => Rdata::Unknown {
            rtype,
            data: data.to_vec(),
        },
    };

    Ok(rdata)
}
