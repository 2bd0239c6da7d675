//! Human-readable, `dig`-like rendering of messages.
//!
//! ```text
//! ;; opcode: QUERY, status: NOERROR, id: 0
//! ;; flags: qr aa; QUERY: 0, ANSWER: 1, AUTHORITY: 0, ADDITIONAL: 0
//!
//! ;; ANSWER SECTION:
//! _services._dns-sd._udp.local.	4500	IN	 PTR	_apple-mobdev._tcp.local.
//! ```

use std::fmt;

use crate::message::{DnsMessage, Question, Rdata, ResourceRecord};

pub fn opcode_name(opcode: u8) -> Option<&'static str> {
    match opcode {
        0 => Some("QUERY"),
        1 => Some("IQUERY"),
        2 => Some("STATUS"),
        _ => None,
    }
}

pub fn rcode_name(rcode: u8) -> Option<&'static str> {
    match rcode {
        0 => Some("NOERROR"),
        1 => Some("FORMERR"),
        2 => Some("SERVFAIL"),
        3 => Some("NXDOMAIN"),
        4 => Some("NOTIMPL"),
        5 => Some("REFUSED"),
        _ => None,
    }
}

pub fn class_name(class: u16) -> Option<&'static str> {
    match class {
        1 => Some("IN"),
        2 => Some("CS"),
        3 => Some("CH"),
        4 => Some("HS"),
        254 => Some("NONE"),
        255 => Some("ANY"),
        _ => None,
    }
}

pub fn type_name(rtype: u16) -> Option<&'static str> {
    let name = match rtype {
        1 => "A",
        2 => "NS",
        3 => "MD",
        4 => "MF",
        5 => "CNAME",
        6 => "SOA",
        7 => "MB",
        8 => "MG",
        9 => "MR",
        10 => "NULL",
        11 => "WKS",
        12 => "PTR",
        13 => "HINFO",
        14 => "MINFO",
        15 => "MX",
        16 => "TXT",
        28 => "AAAA",
        33 => "SRV",
        47 => "NSEC",
        252 => "AXFR",
        253 => "MAILB",
        254 => "MAILA",
        255 => "ANY",
        _ => return None,
    };
    Some(name)
}

struct Code(Option<&'static str>, u16);

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(name) => f.write_str(name),
            None => write!(f, "UNKNOWN: {}", self.1),
        }
    }
}

impl fmt::Display for DnsMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            ";; opcode: {}, status: {}, id: {}",
            Code(opcode_name(self.opcode), self.opcode as u16),
            Code(rcode_name(self.rcode), self.rcode as u16),
            self.id
        )?;

        f.write_str(";; flags:")?;
        for (set, flag) in [
            (self.is_response, " qr"),
            (self.is_authoritative, " aa"),
            (self.is_truncated, " tc"),
            (self.is_recursion_desired, " rd"),
            (self.is_recursion_available, " ra"),
            (self.is_zero, " z"),
        ] {
            if set {
                f.write_str(flag)?;
            }
        }
        writeln!(
            f,
            "; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}",
            self.questions.len(),
            self.answers.len(),
            self.authorities.len(),
            self.extras.len()
        )?;

        if !self.questions.is_empty() {
            f.write_str("\n;; QUESTION SECTION:\n")?;
            for q in &self.questions {
                writeln!(f, "{}", q)?;
            }
        }
        for (title, records) in [
            ("ANSWER", &self.answers),
            ("AUTHORITY", &self.authorities),
            ("ADDITIONAL", &self.extras),
        ] {
            if records.is_empty() {
                continue;
            }
            writeln!(f, "\n;; {} SECTION:", title)?;
            for rr in records {
                writeln!(f, "{}", rr)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            ";{}\t{}\t {}",
            self.name,
            Code(class_name(self.class), self.class),
            Code(type_name(self.qtype), self.qtype)
        )
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t {}",
            self.name,
            self.ttl,
            Code(class_name(self.class), self.class),
            Code(type_name(self.rtype()), self.rtype())
        )?;
        match &self.rdata {
            Rdata::Unknown { data, .. } => write!(f, "\t\\# {}", data.len()),
            rdata => write!(f, "\t{}", rdata),
        }
    }
}

impl fmt::Display for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rdata::A(addr) => write!(f, "{}", addr),
            Rdata::Aaaa(addr) => write!(f, "{}", addr),
            Rdata::Ptr(name) => f.write_str(name),
            Rdata::Srv(srv) => write!(
                f,
                "{} {} {} {}",
                srv.priority, srv.weight, srv.port, srv.target
            ),
            Rdata::Txt(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{:?}", String::from_utf8_lossy(entry))?;
                }
                Ok(())
            }
            Rdata::Unknown { data, .. } => write!(f, "<{} bytes>", data.len()),
        }
    }
}
