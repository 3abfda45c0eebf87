//! Packet parser for the `<node_id>,<session_id>,<seq>,<msg_type>` wire format
//!
//! The parser is deliberately permissive about *which* identity a packet
//! claims. Detecting identity conflicts is the classifier's job.

use std::fmt;

use crate::error::ParseError;
use crate::types::{Datagram, PacketRecord};

/// Number of comma-separated fields in a valid payload.
pub const FIELD_COUNT: usize = 4;

/// The four wire fields of a valid payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub node_id: String,
    pub session_id: u16,
    pub seq: u32,
    pub msg_type: String,
}

impl Payload {
    /// Attach gateway-side metadata to build a [`PacketRecord`].
    pub fn into_record(self, payload_len: usize, arrival: f64) -> PacketRecord {
        PacketRecord {
            node_id: self.node_id,
            session_id: self.session_id,
            seq: self.seq,
            msg_type: self.msg_type,
            payload_len,
            arrival,
        }
    }
}

/// Re-serializes the payload in wire order.
impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.node_id, self.session_id, self.seq, self.msg_type)
    }
}

/// Parse raw datagram bytes into a [`Payload`].
///
/// Rejects payloads that are not strict UTF-8, that do not split into exactly
/// four fields after trimming, that have an empty node id or message type, or
/// whose numeric fields are not integers within `u16` / `u32` range.
pub fn parse_payload(bytes: &[u8]) -> Result<Payload, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::Encoding)?.trim();

    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != FIELD_COUNT {
        return Err(ParseError::FieldCount { found: parts.len() });
    }

    let node_id = parts[0];
    let msg_type = parts[3];
    if node_id.is_empty() {
        return Err(ParseError::EmptyField { field: "node_id" });
    }
    if msg_type.is_empty() {
        return Err(ParseError::EmptyField { field: "msg_type" });
    }

    let session_id = parse_bounded(parts[1], "session_id", u16::MAX as u64)? as u16;
    let seq = parse_bounded(parts[2], "seq", u32::MAX as u64)? as u32;

    Ok(Payload { node_id: node_id.to_string(), session_id, seq, msg_type: msg_type.to_string() })
}

/// Parse a datagram and stamp it with its length and arrival time.
pub fn parse_datagram(datagram: &Datagram) -> Result<PacketRecord, ParseError> {
    parse_payload(&datagram.payload).map(|p| p.into_record(datagram.len(), datagram.arrival))
}

/// Parse a signed decimal integer and check it lies in `[0, max]`.
///
/// Integers too large for `i128` are still integers, so they are reported as
/// out of range rather than malformed. Digit separators (`1_0`) are not
/// accepted.
fn parse_bounded(raw: &str, field: &'static str, max: u64) -> Result<u64, ParseError> {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::NotAnInteger { field, value: raw.to_string() });
    }

    let out_of_range = || ParseError::OutOfRange { field, value: raw.to_string() };
    let value: i128 = raw.parse().map_err(|_| out_of_range())?;
    if value < 0 || value > max as i128 {
        return Err(out_of_range());
    }
    Ok(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_valid_payload() {
        let payload = parse_payload(b"ecg_01,41237,1024,ECG").unwrap();
        assert_eq!(payload.node_id, "ecg_01");
        assert_eq!(payload.session_id, 41237);
        assert_eq!(payload.seq, 1024);
        assert_eq!(payload.msg_type, "ECG");
    }

    #[test]
    fn trims_whitespace_around_payload_and_fields() {
        let payload = parse_payload(b"  ecg_01 , 7 ,\t3 , ECG \r\n").unwrap();
        assert_eq!(payload.to_string(), "ecg_01,7,3,ECG");
    }

    #[test]
    fn accepts_range_boundaries() {
        let payload = parse_payload(b"n,65535,4294967295,T").unwrap();
        assert_eq!(payload.session_id, u16::MAX);
        assert_eq!(payload.seq, u32::MAX);

        let payload = parse_payload(b"n,0,0,T").unwrap();
        assert_eq!((payload.session_id, payload.seq), (0, 0));
    }

    #[test]
    fn accepts_explicit_plus_sign() {
        let payload = parse_payload(b"n,+7,+0,T").unwrap();
        assert_eq!((payload.session_id, payload.seq), (7, 0));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert_eq!(parse_payload(&[0xff, 0xfe, b',']), Err(ParseError::Encoding));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(parse_payload(b"a,1,2,T,extra"), Err(ParseError::FieldCount { found: 5 }));
        assert_eq!(parse_payload(b"a,1,2"), Err(ParseError::FieldCount { found: 3 }));
        assert_eq!(parse_payload(b""), Err(ParseError::FieldCount { found: 1 }));
        assert_eq!(parse_payload(b"a,1,2,T,"), Err(ParseError::FieldCount { found: 5 }));
    }

    #[test]
    fn rejects_empty_identity_or_type() {
        assert_eq!(parse_payload(b" ,1,2,T"), Err(ParseError::EmptyField { field: "node_id" }));
        assert_eq!(parse_payload(b"a,1,2, "), Err(ParseError::EmptyField { field: "msg_type" }));
    }

    #[test]
    fn rejects_non_integer_fields() {
        assert!(matches!(
            parse_payload(b"a,x,2,T"),
            Err(ParseError::NotAnInteger { field: "session_id", .. })
        ));
        assert!(matches!(
            parse_payload(b"a,1,abc,T"),
            Err(ParseError::NotAnInteger { field: "seq", .. })
        ));
        assert!(matches!(
            parse_payload(b"a,1,2.5,T"),
            Err(ParseError::NotAnInteger { field: "seq", .. })
        ));
        assert!(matches!(
            parse_payload(b"a,,2,T"),
            Err(ParseError::NotAnInteger { field: "session_id", .. })
        ));
        assert!(matches!(
            parse_payload(b"a,1_0,1,T"),
            Err(ParseError::NotAnInteger { field: "session_id", .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_fields() {
        assert!(matches!(
            parse_payload(b"a,70000,2,T"),
            Err(ParseError::OutOfRange { field: "session_id", .. })
        ));
        assert!(matches!(
            parse_payload(b"a,-1,2,T"),
            Err(ParseError::OutOfRange { field: "session_id", .. })
        ));
        assert!(matches!(
            parse_payload(b"a,1,4294967296,T"),
            Err(ParseError::OutOfRange { field: "seq", .. })
        ));
        assert!(matches!(
            parse_payload(b"a,1,999999999999999999999999999999999999999999,T"),
            Err(ParseError::OutOfRange { field: "seq", .. })
        ));
    }

    #[test]
    fn parse_datagram_carries_length_and_arrival() {
        let datagram = Datagram::new(b"ecg_01,7,0,ECG".to_vec(), None, 12.5);
        let record = parse_datagram(&datagram).unwrap();
        assert_eq!(record.payload_len, 14);
        assert_eq!(record.arrival, 12.5);
        assert_eq!(record.node_id, "ecg_01");
    }

    proptest! {
        #[test]
        fn reserializing_reproduces_trimmed_text(
            node_id in "[a-z][a-z0-9_]{0,15}",
            session_id in any::<u16>(),
            seq in any::<u32>(),
            msg_type in "[A-Z]{1,8}",
            pad in "[ \t]{0,3}",
        ) {
            let wire = format!("{node_id},{session_id},{seq},{msg_type}");
            let padded = format!("{pad}{wire}{pad}\n");
            let payload = parse_payload(padded.as_bytes()).unwrap();
            prop_assert_eq!(payload.to_string(), wire);
        }

        #[test]
        fn parser_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
            let _ = parse_payload(&bytes);
        }
    }
}
