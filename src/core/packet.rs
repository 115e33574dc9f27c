//! # Packet Assembly
//!
//! [`Packet`] pairs a parsed header with its payload and runs the decode
//! pipeline on demand: decrypt, unpad, then decompress.
//!
//! ## Readers
//! - [`read_packet`] and [`read_packet_async`] take exactly one packet off a stream
//! - [`PacketReader`] carries the variant, its alternates and the size limit
//!
//! Bytes past the declared payload length are never consumed.

use crate::config::{DecoderConfig, MAX_PAYLOAD_SIZE};
use crate::core::header::{HeaderParser, InformHeader};
use crate::core::structure::{Flags, MacAddress, HEADER_LENGTH, IV_LENGTH, MAGIC_LENGTH};
use crate::core::variant::ProtocolVariant;
use crate::error::{constants, InformError, Result};
use crate::utils::{compression, crypto};
use bytes::Bytes;
use serde::Serialize;
use std::io::{self, Read};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, instrument, warn};

/// A decoded inform packet: cleartext header fields plus the still encrypted
/// and/or compressed payload.
///
/// Use [`Packet::data`] to obtain the cleartext payload; it is recomputed on
/// every call and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_version: u32,
    pub payload_version: u32,
    pub mac: MacAddress,
    pub flags: Flags,
    pub iv: [u8; IV_LENGTH],
    pub payload: Bytes,

    header_bytes: [u8; HEADER_LENGTH],
    variant: ProtocolVariant,
    max_output: usize,
}

/// Header fields of a packet in a serializable form.
#[derive(Debug, Clone, Serialize)]
pub struct PacketSummary {
    pub variant: String,
    pub packet_version: u32,
    pub payload_version: u32,
    pub mac: MacAddress,
    pub flags: Flags,
    pub flag_names: String,
    pub iv: String,
    pub payload_length: usize,
}

impl Packet {
    pub(crate) fn assemble(
        header: InformHeader,
        payload: Bytes,
        variant: ProtocolVariant,
        max_output: usize,
    ) -> Self {
        Self {
            packet_version: header.packet_version,
            payload_version: header.payload_version,
            mac: header.mac,
            flags: header.flags,
            iv: header.iv,
            payload,
            header_bytes: *header.raw(),
            variant,
            max_output,
        }
    }

    /// Decode a packet held entirely in memory using the default variant.
    ///
    /// Bytes after the declared payload are ignored.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        PacketReader::default().read_bytes(buf)
    }

    /// Cleartext payload: decrypt, unpad and decompress as the flags demand.
    pub fn data(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.data_with(key, &self.variant)
    }

    /// Like [`Packet::data`], but interpret the flags with `variant`.
    #[instrument(skip_all, level = "debug", fields(variant = %variant.name, flags = %self.flags))]
    pub fn data_with(&self, key: &[u8], variant: &ProtocolVariant) -> Result<Vec<u8>> {
        let res = match variant.cipher_mode(self.flags) {
            Some(mode) => crypto::decrypt(key, &self.iv, &self.header_bytes, &self.payload, mode)?,
            None => self.payload.to_vec(),
        };

        // Unsupported bits are compression bits, so they fail after crypto.
        let unsupported = variant.unsupported_bits(self.flags);
        if unsupported != 0 {
            return Err(InformError::UnsupportedFlag(format!(
                "{} is not implemented by variant '{}'",
                Flags(unsupported),
                variant.name
            )));
        }

        let stages = variant.compression_stages(self.flags);
        compression::decompress_stages(res, &stages, self.max_output)
    }

    /// Try each candidate whose magic matches this packet, in order, and
    /// return the first successful decode together with the variant used.
    ///
    /// When every candidate fails, the first candidate's error is returned.
    pub fn data_with_variants<'v>(
        &self,
        key: &[u8],
        candidates: &'v [ProtocolVariant],
    ) -> Result<(Vec<u8>, &'v ProtocolVariant)> {
        let magic = &self.header_bytes[..MAGIC_LENGTH];
        let mut first_err = None;

        for variant in candidates.iter().filter(|v| v.magic.as_slice() == magic) {
            match self.data_with(key, variant) {
                Ok(data) => return Ok((data, variant)),
                Err(e) => {
                    debug!(variant = %variant.name, error = %e, "Variant did not decode");
                    first_err.get_or_insert(e);
                }
            }
        }

        Err(first_err.unwrap_or_else(|| {
            InformError::ConfigError(constants::ERR_NO_MATCHING_VARIANT.to_string())
        }))
    }

    /// The cleartext header exactly as received.
    pub fn header_bytes(&self) -> &[u8; HEADER_LENGTH] {
        &self.header_bytes
    }

    pub fn variant(&self) -> &ProtocolVariant {
        &self.variant
    }

    /// Wire form: header bytes followed by the payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LENGTH + self.payload.len());
        out.extend_from_slice(&self.header_bytes);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn summary(&self) -> PacketSummary {
        PacketSummary {
            variant: self.variant.name.to_string(),
            packet_version: self.packet_version,
            payload_version: self.payload_version,
            mac: self.mac,
            flags: self.flags,
            flag_names: self.variant.describe(self.flags),
            iv: hex::encode(self.iv),
            payload_length: self.payload.len(),
        }
    }
}

/// Read one packet from `r` using the default variant.
///
/// The reader is read from twice: once for the fixed-size header and once for
/// the payload whose length the header declares. It is not read to EOF.
pub fn read_packet<R: Read>(r: R) -> Result<Packet> {
    PacketReader::default().read(r)
}

/// Async counterpart of [`read_packet`].
pub async fn read_packet_async<R: AsyncRead + Unpin>(r: R) -> Result<Packet> {
    PacketReader::default().read_async(r).await
}

/// Packet assembler bound to a set of protocol variants and a size limit.
///
/// With more than one variant, the header magic picks the variant to parse
/// with and [`PacketReader::decode`] falls back to the others by trial.
#[derive(Debug, Clone)]
pub struct PacketReader {
    primary: ProtocolVariant,
    alternates: Vec<ProtocolVariant>,
    max_payload_size: usize,
}

impl Default for PacketReader {
    fn default() -> Self {
        Self::new(ProtocolVariant::default())
    }
}

impl PacketReader {
    pub fn new(variant: ProtocolVariant) -> Self {
        Self {
            primary: variant,
            alternates: Vec::new(),
            max_payload_size: MAX_PAYLOAD_SIZE,
        }
    }

    /// Build a reader from decoder configuration.
    pub fn from_config(config: &DecoderConfig) -> Result<Self> {
        let mut candidates = config.candidates()?.into_iter();
        let primary = candidates
            .next()
            .ok_or_else(|| InformError::ConfigError(constants::ERR_UNKNOWN_VARIANT.into()))?;
        Ok(Self {
            primary,
            alternates: candidates.collect(),
            max_payload_size: config.max_payload_size,
        })
    }

    /// Add a variant to fall back to.
    pub fn with_alternate(mut self, variant: ProtocolVariant) -> Self {
        self.alternates.push(variant);
        self
    }

    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    /// All variants in preference order.
    pub fn candidates(&self) -> Vec<ProtocolVariant> {
        std::iter::once(&self.primary)
            .chain(self.alternates.iter())
            .cloned()
            .collect()
    }

    fn select(&self, head: &[u8]) -> &ProtocolVariant {
        std::iter::once(&self.primary)
            .chain(self.alternates.iter())
            .find(|v| head.get(..MAGIC_LENGTH) == Some(v.magic.as_slice()))
            .unwrap_or(&self.primary)
    }

    /// Parse a header, picking the variant by magic.
    pub fn parse_header(&self, head: &[u8]) -> Result<(InformHeader, usize, &ProtocolVariant)> {
        let variant = self.select(head);
        let (header, consumed) = HeaderParser::new(variant)
            .with_max_payload_size(self.max_payload_size)
            .parse(head)?;
        Ok((header, consumed, variant))
    }

    /// Buffer form: header and payload already back to back in memory.
    pub fn read_bytes(&self, buf: &[u8]) -> Result<Packet> {
        let (header, consumed, variant) = self.parse_header(buf)?;
        let end = consumed + header.payload_length as usize;
        let payload = buf
            .get(consumed..end)
            .ok_or_else(|| InformError::incomplete(constants::ERR_PAYLOAD_TOO_SHORT))?;

        Ok(Packet::assemble(
            header,
            Bytes::copy_from_slice(payload),
            variant.clone(),
            self.max_payload_size,
        ))
    }

    /// Stream form: read exactly header + declared payload from `r`.
    #[instrument(skip_all, level = "debug")]
    pub fn read<R: Read>(&self, mut r: R) -> Result<Packet> {
        let mut head = [0u8; HEADER_LENGTH];
        r.read_exact(&mut head).map_err(header_read_error)?;

        let (header, _, variant) = self.parse_header(&head)?;
        let mut payload = vec![0u8; header.payload_length as usize];
        r.read_exact(&mut payload)
            .map_err(|e| InformError::incomplete(e.to_string()))?;

        debug!(mac = %header.mac, payload_length = payload.len(), "Read inform packet");
        Ok(Packet::assemble(
            header,
            Bytes::from(payload),
            variant.clone(),
            self.max_payload_size,
        ))
    }

    /// Async stream form.
    #[instrument(skip_all, level = "debug")]
    pub async fn read_async<R: AsyncRead + Unpin>(&self, mut r: R) -> Result<Packet> {
        let mut head = [0u8; HEADER_LENGTH];
        r.read_exact(&mut head).await.map_err(header_read_error)?;

        let (header, _, variant) = self.parse_header(&head)?;
        let variant = variant.clone();
        let mut payload = vec![0u8; header.payload_length as usize];
        r.read_exact(&mut payload)
            .await
            .map_err(|e| InformError::incomplete(e.to_string()))?;

        debug!(mac = %header.mac, payload_length = payload.len(), "Read inform packet");
        Ok(Packet::assemble(
            header,
            Bytes::from(payload),
            variant,
            self.max_payload_size,
        ))
    }

    /// Decode the payload, trying alternate variants if the packet's own one
    /// fails.
    pub fn decode(&self, packet: &Packet, key: &[u8]) -> Result<Vec<u8>> {
        if self.alternates.is_empty() {
            return packet.data(key);
        }
        let mut candidates = vec![packet.variant.clone()];
        candidates.extend(
            self.candidates()
                .into_iter()
                .filter(|v| v.name != packet.variant.name),
        );
        let (data, variant) = packet.data_with_variants(key, &candidates)?;
        if variant.name != packet.variant.name {
            warn!(variant = %variant.name, "Payload decoded with alternate variant");
        }
        Ok(data)
    }
}

fn header_read_error(err: io::Error) -> InformError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        InformError::incomplete(constants::ERR_HEADER_TOO_SHORT)
    } else {
        InformError::Io(err)
    }
}
