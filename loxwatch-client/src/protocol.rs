// Loxwatch Client - Miniserver websocket client
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Miniserver wire format
//!
//! Every payload the Miniserver sends is announced by an 8-byte binary
//! header:
//!
//! ```text
//! ┌──────┬────────────┬──────┬──────────┬──────────────────┐
//! │ 0x03 │ identifier │ info │ reserved │ length (u32, LE) │
//! └──────┴────────────┴──────┴──────────┴──────────────────┘
//! ```
//!
//! The payload follows as the next websocket message, except for
//! keepalive responses which have none. Value-event tables are packed
//! 24-byte records of a binary UUID and a little-endian `f64`.

use loxwatch::Event;
use serde_json::Value;

use crate::error::ProtocolError;

/// First byte of every message header
pub const HEADER_MARKER: u8 = 0x03;

/// Size of a message header in bytes
pub const HEADER_LEN: usize = 8;

/// Size of one value-event record in bytes
pub const VALUE_EVENT_LEN: usize = 24;

/// Info flag: length is an estimate and an exact header follows
const INFO_ESTIMATED: u8 = 0x80;

/// Kind of payload announced by a header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Text = 0,
    BinaryFile = 1,
    ValueEvents = 2,
    TextEvents = 3,
    DaytimerEvents = 4,
    OutOfService = 5,
    Keepalive = 6,
    WeatherEvents = 7,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::Text),
            1 => Ok(MessageType::BinaryFile),
            2 => Ok(MessageType::ValueEvents),
            3 => Ok(MessageType::TextEvents),
            4 => Ok(MessageType::DaytimerEvents),
            5 => Ok(MessageType::OutOfService),
            6 => Ok(MessageType::Keepalive),
            7 => Ok(MessageType::WeatherEvents),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

impl MessageType {
    /// Whether a payload message follows the header
    pub fn has_payload(&self) -> bool {
        !matches!(self, MessageType::Keepalive | MessageType::OutOfService)
    }
}

/// Decoded message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub kind: MessageType,
    /// Announced payload length in bytes
    pub length: u32,
    /// Length is an estimate; the exact header comes next
    pub estimated: bool,
}

impl MessageHeader {
    /// Parse a header from a binary websocket message
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != HEADER_LEN || bytes[0] != HEADER_MARKER {
            return Err(ProtocolError::InvalidHeader);
        }
        let kind = MessageType::try_from(bytes[1])?;
        let length = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok(Self {
            kind,
            length,
            estimated: bytes[2] & INFO_ESTIMATED != 0,
        })
    }
}

/// Render a 16-byte binary UUID in Miniserver notation
/// (`0b734138-037d-034e-ffff403fb0c34b9e`)
pub fn format_uuid(bytes: &[u8; 16]) -> String {
    let data1 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let data2 = u16::from_le_bytes([bytes[4], bytes[5]]);
    let data3 = u16::from_le_bytes([bytes[6], bytes[7]]);
    format!(
        "{:08x}-{:04x}-{:04x}-{}",
        data1,
        data2,
        data3,
        hex::encode(&bytes[8..16])
    )
}

/// Decode a value-event table into events
pub fn parse_value_events(payload: &[u8]) -> Result<Vec<Event>, ProtocolError> {
    if payload.len() % VALUE_EVENT_LEN != 0 {
        return Err(ProtocolError::TruncatedTable {
            len: payload.len(),
            record: VALUE_EVENT_LEN,
        });
    }

    Ok(payload
        .chunks_exact(VALUE_EVENT_LEN)
        .map(|record| {
            let mut uuid = [0u8; 16];
            uuid.copy_from_slice(&record[..16]);
            let mut value = [0u8; 8];
            value.copy_from_slice(&record[16..24]);
            Event::new(format_uuid(&uuid), f64::from_le_bytes(value))
        })
        .collect())
}

/// `LL` response to a text command
#[derive(Debug, Clone, PartialEq)]
pub struct LlResponse {
    /// Echo of the command
    pub control: String,
    /// Response value (string for most commands)
    pub value: Value,
    /// Status code (200 on success)
    pub code: u16,
}

impl LlResponse {
    /// Parse a text message of the form `{"LL": {...}}`
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| ProtocolError::MalformedResponse(e.to_string()))?;
        let ll = root
            .get("LL")
            .ok_or_else(|| ProtocolError::MalformedResponse("missing LL object".to_string()))?;

        let control = ll
            .get("control")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let value = ll.get("value").cloned().unwrap_or(Value::Null);

        // Firmware versions disagree on the key casing and on string vs number
        let code = ll
            .get("Code")
            .or_else(|| ll.get("code"))
            .and_then(|code| match code {
                Value::String(s) => s.parse::<u16>().ok(),
                Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
                _ => None,
            })
            .ok_or_else(|| ProtocolError::MalformedResponse("missing code".to_string()))?;

        Ok(Self {
            control,
            value,
            code,
        })
    }

    pub fn is_success(&self) -> bool {
        self.code == 200
    }

    /// Value as text, empty when it is not a string
    pub fn value_str(&self) -> &str {
        self.value.as_str().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kind: u8, info: u8, len: u32) -> Vec<u8> {
        let mut bytes = vec![HEADER_MARKER, kind, info, 0];
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes
    }

    #[test]
    fn test_parse_header() {
        let parsed = MessageHeader::parse(&header(2, 0, 48)).unwrap();
        assert_eq!(parsed.kind, MessageType::ValueEvents);
        assert_eq!(parsed.length, 48);
        assert!(!parsed.estimated);
    }

    #[test]
    fn test_parse_estimated_header() {
        let parsed = MessageHeader::parse(&header(1, INFO_ESTIMATED, 1_000_000)).unwrap();
        assert_eq!(parsed.kind, MessageType::BinaryFile);
        assert!(parsed.estimated);
    }

    #[test]
    fn test_invalid_headers() {
        assert_eq!(
            MessageHeader::parse(&[0x03, 0, 0]),
            Err(ProtocolError::InvalidHeader)
        );
        let mut wrong_marker = header(2, 0, 0);
        wrong_marker[0] = 0x04;
        assert_eq!(
            MessageHeader::parse(&wrong_marker),
            Err(ProtocolError::InvalidHeader)
        );
        assert_eq!(
            MessageHeader::parse(&header(42, 0, 0)),
            Err(ProtocolError::UnknownMessageType(42))
        );
    }

    #[test]
    fn test_keepalive_has_no_payload() {
        assert!(!MessageType::Keepalive.has_payload());
        assert!(MessageType::ValueEvents.has_payload());
        assert!(MessageType::Text.has_payload());
    }

    #[test]
    fn test_format_uuid() {
        let bytes = [
            0x38, 0x41, 0x73, 0x0b, 0x7d, 0x03, 0x4e, 0x03, 0xff, 0xff, 0x40, 0x3f, 0xb0, 0xc3,
            0x4b, 0x9e,
        ];
        assert_eq!(format_uuid(&bytes), "0b734138-037d-034e-ffff403fb0c34b9e");
    }

    #[test]
    fn test_parse_value_events() {
        let mut payload = Vec::new();
        for (seed, value) in [(1u8, 42.0f64), (2u8, -1.5f64)] {
            payload.extend_from_slice(&[seed; 16]);
            payload.extend_from_slice(&value.to_le_bytes());
        }

        let events = parse_value_events(&payload).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].uuid, "01010101-0101-0101-0101010101010101");
        assert_eq!(events[0].value, 42.0);
        assert_eq!(events[1].uuid, "02020202-0202-0202-0202020202020202");
        assert_eq!(events[1].value, -1.5);
    }

    #[test]
    fn test_parse_truncated_table() {
        let result = parse_value_events(&[0u8; 30]);
        assert_eq!(
            result,
            Err(ProtocolError::TruncatedTable {
                len: 30,
                record: VALUE_EVENT_LEN
            })
        );
    }

    #[test]
    fn test_parse_ll_response() {
        let text = r#"{"LL": {"control": "jdev/sys/getkey", "value": "41424344", "Code": "200"}}"#;
        let response = LlResponse::parse(text).unwrap();
        assert_eq!(response.control, "jdev/sys/getkey");
        assert_eq!(response.value_str(), "41424344");
        assert!(response.is_success());
    }

    #[test]
    fn test_parse_ll_response_numeric_code() {
        let text = r#"{"LL": {"control": "authenticate/abc", "value": "", "code": 401}}"#;
        let response = LlResponse::parse(text).unwrap();
        assert_eq!(response.code, 401);
        assert!(!response.is_success());
    }

    #[test]
    fn test_parse_malformed_response() {
        assert!(matches!(
            LlResponse::parse("{\"rooms\": {}}"),
            Err(ProtocolError::MalformedResponse(_))
        ));
        assert!(matches!(
            LlResponse::parse("not json"),
            Err(ProtocolError::MalformedResponse(_))
        ));
    }
}
