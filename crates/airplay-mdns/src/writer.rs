//! Encoding of [`DnsMessage`]s into wire format.
//!
//! Names are always written in full; compression is a decoder-only concern.

use airplay_core::error::DnsError;

use crate::message::{labels, DnsMessage, Question, Rdata, ResourceRecord};

const MAX_LABEL_LEN: usize = 63;

impl DnsMessage {
    /// Serialize every section of the message.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DnsError> {
        let mut buf = Vec::with_capacity(512);

        buf.extend_from_slice(&self.id.to_be_bytes());

        let mut flags = (self.opcode & 0x0F) << 3;
        if self.is_response {
            flags |= 0x80;
        }
        if self.is_authoritative {
            flags |= 0x04;
        }
        if self.is_truncated {
            flags |= 0x02;
        }
        if self.is_recursion_desired {
            flags |= 0x01;
        }
        buf.push(flags);

        let mut flags = self.rcode & 0x0F;
        if self.is_recursion_available {
            flags |= 0x80;
        }
        if self.is_zero {
            flags |= 0x40;
        }
        buf.push(flags);

        for count in [
            self.questions.len(),
            self.answers.len(),
            self.authorities.len(),
            self.extras.len(),
        ] {
            buf.extend_from_slice(&(count as u16).to_be_bytes());
        }

        for question in &self.questions {
            write_question(&mut buf, question)?;
        }
        for record in self
            .answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.extras)
        {
            write_record(&mut buf, record)?;
        }

        Ok(buf)
    }
}

fn write_question(buf: &mut Vec<u8>, question: &Question) -> Result<(), DnsError> {
    write_name(buf, &question.name)?;
    buf.extend_from_slice(&question.qtype.to_be_bytes());
    buf.extend_from_slice(&question.class.to_be_bytes());
    Ok(())
}

fn write_record(buf: &mut Vec<u8>, record: &ResourceRecord) -> Result<(), DnsError> {
    write_name(buf, &record.name)?;
    buf.extend_from_slice(&record.rtype().to_be_bytes());

    let mut class = record.class & 0x7FFF;
    if record.cache_clear {
        class |= 0x8000;
    }
    buf.extend_from_slice(&class.to_be_bytes());
    buf.extend_from_slice(&record.ttl.to_be_bytes());

    let rdata = encode_rdata(&record.rdata)?;
    let length = u16::try_from(rdata.len()).map_err(|_| DnsError::RdataTooLong(rdata.len()))?;
    buf.extend_from_slice(&length.to_be_bytes());
    buf.extend_from_slice(&rdata);
    Ok(())
}

fn encode_rdata(rdata: &Rdata) -> Result<Vec<u8>, DnsError> {
    let mut out = Vec::new();
    match rdata {
        Rdata::A(addr) => out.extend_from_slice(&addr.octets()),
        Rdata::Aaaa(addr) => out.extend_from_slice(&addr.octets()),
        Rdata::Ptr(target) => write_name(&mut out, target)?,
        Rdata::Srv(srv) => {
            out.extend_from_slice(&srv.priority.to_be_bytes());
            out.extend_from_slice(&srv.weight.to_be_bytes());
            out.extend_from_slice(&srv.port.to_be_bytes());
            write_name(&mut out, &srv.target)?;
        }
        Rdata::Txt(entries) => {
            for entry in entries {
                let len = u8::try_from(entry.len()).map_err(|_| DnsError::TxtTooLong(entry.len()))?;
                out.push(len);
                out.extend_from_slice(entry);
            }
        }
        Rdata::Unknown { rtype, .. } if Rdata::is_typed(*rtype) => {
            return Err(DnsError::RawKnownType(*rtype));
        }
        Rdata::Unknown { data, .. } => out.extend_from_slice(data),
    }
    Ok(out)
}

/// Write `name` as length-prefixed labels followed by the root byte.
///
/// A single trailing dot is optional; any other empty label is an error.
fn write_name(buf: &mut Vec<u8>, name: &str) -> Result<(), DnsError> {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if !trimmed.is_empty() {
        if trimmed.split('.').any(str::is_empty) {
            return Err(DnsError::EmptyLabel(name.to_string()));
        }
        for label in labels(trimmed) {
            if label.len() > MAX_LABEL_LEN {
                return Err(DnsError::LabelTooLong(label.to_string()));
            }
            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
    }
    buf.push(0);
    Ok(())
}
