//! # Header Parser
//!
//! Decodes the fixed 40-byte cleartext header by walking [`FIELD_ORDER`].
//!
//! ## Validation
//! - The magic constant must match the active [`ProtocolVariant`]
//! - A zero payload length is a malformed header, never an empty payload
//! - The payload length is bounded before the payload buffer is allocated

use crate::config::MAX_PAYLOAD_SIZE;
use crate::core::structure::{
    Flags, HeaderField, MacAddress, FIELD_ORDER, HEADER_LENGTH, IV_LENGTH, MAC_LENGTH,
    MAGIC_LENGTH,
};
use crate::core::variant::ProtocolVariant;
use crate::error::{constants, InformError, Result};
use serde::Serialize;
use tracing::trace;

/// Typed view of a parsed header plus the exact bytes it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InformHeader {
    #[serde(serialize_with = "serialize_ascii")]
    pub magic: [u8; MAGIC_LENGTH],
    pub packet_version: u32,
    pub mac: MacAddress,
    pub flags: Flags,
    #[serde(serialize_with = "serialize_hex")]
    pub iv: [u8; IV_LENGTH],
    pub payload_version: u32,
    pub payload_length: u32,
    #[serde(skip)]
    raw: [u8; HEADER_LENGTH],
}

/// Parser bound to one protocol variant and a payload size ceiling.
#[derive(Debug, Clone)]
pub struct HeaderParser<'a> {
    variant: &'a ProtocolVariant,
    max_payload_size: usize,
}

impl<'a> HeaderParser<'a> {
    pub fn new(variant: &'a ProtocolVariant) -> Self {
        Self {
            variant,
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }

    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn variant(&self) -> &'a ProtocolVariant {
        self.variant
    }

    /// Parse the header at the start of `buf`.
    ///
    /// Returns the header and the number of bytes consumed, which is always
    /// [`HEADER_LENGTH`] on success.
    pub fn parse(&self, buf: &[u8]) -> Result<(InformHeader, usize)> {
        let head = buf
            .get(..HEADER_LENGTH)
            .ok_or_else(|| InformError::incomplete(constants::ERR_HEADER_TOO_SHORT))?;

        let mut raw = [0u8; HEADER_LENGTH];
        raw.copy_from_slice(head);

        let mut header = InformHeader {
            magic: [0; MAGIC_LENGTH],
            packet_version: 0,
            mac: MacAddress::default(),
            flags: Flags::default(),
            iv: [0; IV_LENGTH],
            payload_version: 0,
            payload_length: 0,
            raw,
        };

        let mut off = 0;
        for spec in FIELD_ORDER.iter() {
            let curr = &head[off..off + spec.length];
            match spec.field {
                HeaderField::Magic => {
                    header.magic.copy_from_slice(curr);
                    if header.magic != self.variant.magic {
                        return Err(InformError::InvalidMagic {
                            expected: self.variant.magic,
                            found: header.magic,
                        });
                    }
                }
                HeaderField::PayloadLength => {
                    header.payload_length = be_u32(curr);
                }
                field => header.update(field, curr),
            }
            off += spec.length;
        }

        if header.payload_length == 0 {
            return Err(InformError::incomplete(constants::ERR_NO_PAYLOAD_LENGTH));
        }
        let declared = header.payload_length as usize;
        if declared > self.max_payload_size {
            return Err(InformError::OversizedPacket(declared));
        }

        trace!(
            variant = %self.variant.name,
            mac = %header.mac,
            flags = %header.flags,
            payload_length = declared,
            "Parsed inform header"
        );

        Ok((header, off))
    }
}

impl InformHeader {
    /// Build a header from field values; the raw snapshot is encoded from them.
    pub fn new(
        variant: &ProtocolVariant,
        packet_version: u32,
        mac: MacAddress,
        flags: Flags,
        iv: [u8; IV_LENGTH],
        payload_version: u32,
        payload_length: u32,
    ) -> Self {
        let mut header = InformHeader {
            magic: variant.magic,
            packet_version,
            mac,
            flags,
            iv,
            payload_version,
            payload_length,
            raw: [0; HEADER_LENGTH],
        };
        header.raw = header.encode();
        header
    }

    /// Apply one decoded field. Magic and payload length are handled by the parser.
    fn update(&mut self, field: HeaderField, data: &[u8]) {
        match field {
            HeaderField::PacketVersion => self.packet_version = be_u32(data),
            HeaderField::Mac => {
                let mut octets = [0u8; MAC_LENGTH];
                octets.copy_from_slice(data);
                self.mac = MacAddress(octets);
            }
            HeaderField::Flags => self.flags = Flags(u16::from_be_bytes([data[0], data[1]])),
            HeaderField::Iv => self.iv.copy_from_slice(data),
            HeaderField::PayloadVersion => self.payload_version = be_u32(data),
            HeaderField::Magic | HeaderField::PayloadLength => {}
        }
    }

    fn encode(&self) -> [u8; HEADER_LENGTH] {
        let mut out = [0u8; HEADER_LENGTH];
        let mut off = 0;
        for spec in FIELD_ORDER.iter() {
            let dst = &mut out[off..off + spec.length];
            match spec.field {
                HeaderField::Magic => dst.copy_from_slice(&self.magic),
                HeaderField::PacketVersion => dst.copy_from_slice(&self.packet_version.to_be_bytes()),
                HeaderField::Mac => dst.copy_from_slice(&self.mac.octets()),
                HeaderField::Flags => dst.copy_from_slice(&self.flags.bits().to_be_bytes()),
                HeaderField::Iv => dst.copy_from_slice(&self.iv),
                HeaderField::PayloadVersion => {
                    dst.copy_from_slice(&self.payload_version.to_be_bytes())
                }
                HeaderField::PayloadLength => {
                    dst.copy_from_slice(&self.payload_length.to_be_bytes())
                }
            }
            off += spec.length;
        }
        out
    }

    /// Re-encode the header fields into wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_LENGTH] {
        self.encode()
    }

    /// The bytes this header was parsed from (or encoded to), used as AEAD
    /// associated data.
    pub fn raw(&self) -> &[u8; HEADER_LENGTH] {
        &self.raw
    }
}

#[inline]
fn be_u32(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}

fn serialize_ascii<S>(bytes: &[u8; MAGIC_LENGTH], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

fn serialize_hex<S>(bytes: &[u8; IV_LENGTH], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn sample_header() -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LENGTH);
        buf.extend_from_slice(b"TNBU");
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&[0xf0, 0x9f, 0xc2, 0x79, 0x63, 0x90]);
        buf.extend_from_slice(&0x0005u16.to_be_bytes());
        buf.extend_from_slice(&[0xAA; IV_LENGTH]);
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&32u32.to_be_bytes());
        buf
    }

    #[test]
    fn test_parse_fields() {
        let buf = sample_header();
        let (header, consumed) = HeaderParser::new(&ProtocolVariant::UNIFI)
            .parse(&buf)
            .unwrap();

        assert_eq!(consumed, HEADER_LENGTH);
        assert_eq!(&header.magic, b"TNBU");
        assert_eq!(header.packet_version, 0);
        assert_eq!(header.mac.to_string(), "f0:9f:c2:79:63:90");
        assert_eq!(header.flags, Flags(0x0005));
        assert_eq!(header.iv, [0xAA; IV_LENGTH]);
        assert_eq!(header.payload_version, 1);
        assert_eq!(header.payload_length, 32);
        assert_eq!(header.raw().as_slice(), buf.as_slice());
    }

    #[test]
    fn test_encode_reproduces_input() {
        let buf = sample_header();
        let (header, _) = HeaderParser::new(&ProtocolVariant::UNIFI)
            .parse(&buf)
            .unwrap();
        assert_eq!(header.to_bytes().as_slice(), buf.as_slice());
    }

    #[test]
    fn test_invalid_magic() {
        let mut buf = sample_header();
        buf[..4].copy_from_slice(b"ABCD");
        let err = HeaderParser::new(&ProtocolVariant::UNIFI)
            .parse(&buf)
            .unwrap_err();
        match err {
            InformError::InvalidMagic { expected, found } => {
                assert_eq!(&expected, b"TNBU");
                assert_eq!(&found, b"ABCD");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_length_payload_is_incomplete() {
        let mut buf = sample_header();
        buf[36..40].copy_from_slice(&0u32.to_be_bytes());
        let err = HeaderParser::new(&ProtocolVariant::UNIFI)
            .parse(&buf)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "incomplete packet: header does not define payload length"
        );
    }

    #[test]
    fn test_short_buffer_is_incomplete() {
        let buf = sample_header();
        for len in [0, 1, 4, 39] {
            let err = HeaderParser::new(&ProtocolVariant::UNIFI)
                .parse(&buf[..len])
                .unwrap_err();
            assert!(matches!(err, InformError::IncompletePacket(_)));
        }
    }

    #[test]
    fn test_oversized_declared_length() {
        let mut buf = sample_header();
        buf[36..40].copy_from_slice(&4096u32.to_be_bytes());
        let err = HeaderParser::new(&ProtocolVariant::UNIFI)
            .with_max_payload_size(1024)
            .parse(&buf)
            .unwrap_err();
        assert!(matches!(err, InformError::OversizedPacket(4096)));
    }

    #[test]
    fn test_new_header_encodes_raw() {
        let header = InformHeader::new(
            &ProtocolVariant::UNIFI,
            0,
            MacAddress([1, 2, 3, 4, 5, 6]),
            Flags(0x01),
            [7; IV_LENGTH],
            1,
            16,
        );
        let (parsed, _) = HeaderParser::new(&ProtocolVariant::UNIFI)
            .parse(header.raw())
            .unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_summary_serializes_readable_fields() {
        let buf = sample_header();
        let (header, _) = HeaderParser::new(&ProtocolVariant::UNIFI)
            .parse(&buf)
            .unwrap();
        let json = serde_json::to_value(&header).unwrap();
        assert_eq!(json["magic"], "TNBU");
        assert_eq!(json["mac"], "f0:9f:c2:79:63:90");
        assert_eq!(json["flags"], 5);
        assert_eq!(json["iv"], "aa".repeat(IV_LENGTH));
        assert!(json.get("raw").is_none());
    }
}
