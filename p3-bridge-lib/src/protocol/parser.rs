//! P3 record parser: one unescaped frame payload in, one [`Record`] out.
//!
//! The parser is a pure transformation. Malformed payloads come back as
//! a [`ParseError`] with a reason code; a CRC mismatch is not an error —
//! the record is surfaced with `crc.ok == false` so downstream observers
//! can count and investigate while still seeing the timing data.

use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

use crate::protocol::crc;
use crate::protocol::record::{Field, Record};
use crate::protocol::tables::{self, TypeTag};
use crate::protocol::wire;

/// Header (version + tor + flags) plus the trailing CRC.
const MIN_PAYLOAD: usize = 7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("payload too short: {len} bytes, need at least {MIN_PAYLOAD}")]
    TooShort { len: usize },
    #[error(
        "truncated field: tof 0x{tof:02x} length {length} overruns body ({parsed} fields parsed)"
    )]
    TruncatedField { tof: u8, length: u16, parsed: usize },
}

pub fn parse(payload: &[u8]) -> Result<Record, ParseError> {
    if payload.len() < MIN_PAYLOAD {
        return Err(ParseError::TooShort { len: payload.len() });
    }

    let crc = crc::validate(payload);
    let version = payload[0];
    let tor = u16::from_le_bytes([payload[1], payload[2]]);
    let flags = u16::from_le_bytes([payload[3], payload[4]]);
    let body = &payload[5..payload.len() - 2];

    let mut fields = Vec::new();
    let mut offset = 0;
    while offset < body.len() {
        if body.len() - offset < 3 {
            return Err(ParseError::TruncatedField {
                tof: body[offset],
                length: 0,
                parsed: fields.len(),
            });
        }
        let tof = body[offset];
        let length = u16::from_le_bytes([body[offset + 1], body[offset + 2]]);
        let start = offset + 3;
        let end = start + usize::from(length);
        if end > body.len() {
            return Err(ParseError::TruncatedField { tof, length, parsed: fields.len() });
        }
        let raw = body[start..end].to_vec();
        let (tof_name, type_tag) = resolve(tor, tof, &raw);
        let value = decode_value(type_tag, &raw);
        fields.push(Field { tof, tof_name, length, type_tag, raw, value });
        offset = end;
    }

    Ok(Record {
        version,
        tor,
        tor_name: tables::tor_name(tor),
        flags,
        fields,
        crc,
        received_at: Utc::now(),
    })
}

/// Table lookup, falling back to the printable heuristic for untyped
/// fields: mostly-printable data becomes a UTF-8 string, anything else
/// a lowercase hex string tagged `bytes`.
fn resolve(tor: u16, tof: u8, raw: &[u8]) -> (String, TypeTag) {
    if let Some((name, tag)) = tables::lookup_tof(tor, tof) {
        return (name.to_string(), tag);
    }
    let tag = if wire::mostly_printable(raw) { TypeTag::Str } else { TypeTag::Bytes };
    (tables::tof_fallback_name(tof), tag)
}

fn decode_value(tag: TypeTag, raw: &[u8]) -> Value {
    match tag {
        TypeTag::U8 => Value::from(wire::uint_le(raw) as u8),
        TypeTag::U16 => Value::from(wire::u16_le(raw)),
        TypeTag::U32 => Value::from(wire::u32_le(raw)),
        TypeTag::U64 => Value::from(wire::uint_le(raw)),
        TypeTag::I16 => Value::from(wire::i16_le(raw)),
        TypeTag::I32 => Value::from(wire::i32_le(raw)),
        TypeTag::Hex | TypeTag::Bytes => Value::from(hex::encode(raw)),
        TypeTag::Str => Value::from(String::from_utf8_lossy(raw).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc::crc16;
    use crate::protocol::tables::TOR_PASSING;

    /// Build a payload from header + TLV body, appending a valid CRC.
    fn payload(version: u8, tor: u16, flags: u16, body: &[u8]) -> Vec<u8> {
        let mut p = vec![version];
        p.extend_from_slice(&tor.to_le_bytes());
        p.extend_from_slice(&flags.to_le_bytes());
        p.extend_from_slice(body);
        let sum = crc16(&p);
        p.extend_from_slice(&sum.to_le_bytes());
        p
    }

    #[test]
    fn minimum_frame_parses_to_empty_fields() {
        let rec = parse(&payload(4, TOR_PASSING, 0, &[])).unwrap();
        assert_eq!(rec.version, 4);
        assert_eq!(rec.tor_name, "passing");
        assert!(rec.fields.is_empty());
        assert!(rec.crc.ok);
    }

    #[test]
    fn too_short_payload_is_rejected() {
        assert_eq!(parse(&[4, 1, 0, 0, 0, 0]), Err(ParseError::TooShort { len: 6 }));
    }

    #[test]
    fn passing_field_zero_extends() {
        // tof 0x01 declared u32, carried in a single byte.
        let rec = parse(&payload(4, TOR_PASSING, 0, &[0x01, 0x01, 0x00, 0x01])).unwrap();
        assert_eq!(rec.fields.len(), 1);
        assert_eq!(rec.fields[0].tof_name, "passingNumber");
        assert_eq!(rec.fields[0].value, serde_json::json!(1));
        assert!(rec.crc.ok);
    }

    #[test]
    fn crc_mismatch_still_yields_record() {
        let mut p = payload(4, TOR_PASSING, 0, &[0x01, 0x01, 0x00, 0x01]);
        let n = p.len();
        p[n - 2] = 0;
        p[n - 1] = 0;
        let rec = parse(&p).unwrap();
        assert!(!rec.crc.ok);
        assert_eq!(rec.crc.received, 0x0000);
        assert_eq!(rec.crc.computed, crc16(&p[..n - 2]));
        assert_eq!(rec.fields.len(), 1);
    }

    #[test]
    fn truncated_field_is_terminal() {
        // Second field claims 200 bytes of data that are not there.
        let body = [0x01, 0x01, 0x00, 0x01, 0x05, 0xC8, 0x00];
        let err = parse(&payload(4, TOR_PASSING, 0, &body)).unwrap_err();
        assert_eq!(err, ParseError::TruncatedField { tof: 0x05, length: 200, parsed: 1 });
    }

    #[test]
    fn zero_length_fields_decode_to_defaults() {
        // u32-typed and string-typed fields with no data.
        let body = [0x01, 0x00, 0x00, 0x44, 0x00, 0x00];
        let rec = parse(&payload(4, TOR_PASSING, 0, &body)).unwrap();
        assert_eq!(rec.fields[0].value, serde_json::json!(0));
        assert_eq!(rec.fields[1].value, serde_json::json!(""));
        assert!(rec.fields[1].raw.is_empty());
    }

    #[test]
    fn transponder_renders_as_lowercase_hex() {
        let body = [0x03, 0x04, 0x00, 0x2A, 0xC9, 0x04, 0x00];
        let rec = parse(&payload(4, TOR_PASSING, 0, &body)).unwrap();
        assert_eq!(rec.fields[0].tof_name, "transponder");
        assert_eq!(rec.fields[0].value, serde_json::json!("2ac90400"));
    }

    #[test]
    fn untyped_binary_falls_back_to_hex_bytes() {
        let body = [0x42, 0x04, 0x00, 0x00, 0x01, 0x02, 0x03];
        let rec = parse(&payload(4, TOR_PASSING, 0, &body)).unwrap();
        assert_eq!(rec.fields[0].tof_name, "tof_0x42");
        assert_eq!(rec.fields[0].type_tag, TypeTag::Bytes);
        assert_eq!(rec.fields[0].value, serde_json::json!("00010203"));
    }

    #[test]
    fn untyped_printable_falls_back_to_string() {
        let body = [0x42, 0x05, 0x00, b'h', b'e', b'l', b'l', b'o'];
        let rec = parse(&payload(4, TOR_PASSING, 0, &body)).unwrap();
        assert_eq!(rec.fields[0].type_tag, TypeTag::Str);
        assert_eq!(rec.fields[0].value, serde_json::json!("hello"));
    }

    #[test]
    fn unknown_tor_keeps_synthetic_name() {
        let rec = parse(&payload(4, 0x0777, 0, &[])).unwrap();
        assert_eq!(rec.tor_name, "tor_0x0777");
    }
}
