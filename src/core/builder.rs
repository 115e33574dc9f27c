//! Packet sealing.
//!
//! [`PacketBuilder`] runs the decode pipeline backwards: compress, pad,
//! encrypt, then frame with a header whose flags describe what was done.
//! Devices are the usual producers of inform packets; the builder exists for
//! controllers answering them and for tests that need real fixtures.

use crate::config::MAX_PAYLOAD_SIZE;
use crate::core::header::InformHeader;
use crate::core::packet::Packet;
use crate::core::structure::{MacAddress, IV_LENGTH};
use crate::core::variant::{CipherMode, CompressionKind, ProtocolVariant};
use crate::error::{InformError, Result};
use crate::utils::{compression, crypto};
use bytes::Bytes;
use tracing::{debug, instrument};

/// Builder for outgoing packets.
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    variant: ProtocolVariant,
    mac: MacAddress,
    packet_version: u32,
    payload_version: u32,
    mode: Option<CipherMode>,
    stages: Vec<CompressionKind>,
    iv: Option<[u8; IV_LENGTH]>,
}

impl Default for PacketBuilder {
    fn default() -> Self {
        Self::new(ProtocolVariant::default())
    }
}

impl PacketBuilder {
    /// Unencrypted, uncompressed packet for `variant` with payload version 1.
    pub fn new(variant: ProtocolVariant) -> Self {
        Self {
            variant,
            mac: MacAddress::default(),
            packet_version: 0,
            payload_version: 1,
            mode: None,
            stages: Vec::new(),
            iv: None,
        }
    }

    pub fn mac(mut self, mac: MacAddress) -> Self {
        self.mac = mac;
        self
    }

    pub fn packet_version(mut self, version: u32) -> Self {
        self.packet_version = version;
        self
    }

    pub fn payload_version(mut self, version: u32) -> Self {
        self.payload_version = version;
        self
    }

    pub fn encryption(mut self, mode: CipherMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Add a compression stage. Stages always run in the order decoders
    /// expect, whatever order they are added in.
    pub fn compression(mut self, kind: CompressionKind) -> Self {
        if !self.stages.contains(&kind) {
            self.stages.push(kind);
            self.stages.sort();
        }
        self
    }

    /// Fixed IV instead of a random one. Never reuse an IV with GCM.
    pub fn iv(mut self, iv: [u8; IV_LENGTH]) -> Self {
        self.iv = Some(iv);
        self
    }

    /// Compress, encrypt and frame `plaintext`.
    ///
    /// # Errors
    /// - `UnsupportedFlag` if the variant has no bit for a requested stage
    /// - `InvalidKey` if encryption is requested and `key` is not 16 bytes
    /// - `IncompletePacket` if the sealed payload would be empty
    /// - `OversizedPacket` if the sealed payload exceeds the length field
    #[instrument(skip_all, level = "debug", fields(variant = %self.variant.name))]
    pub fn seal(&self, key: &[u8], plaintext: &[u8]) -> Result<Packet> {
        let flags = self.variant.flags_for(self.mode, &self.stages).ok_or_else(|| {
            InformError::UnsupportedFlag(format!(
                "requested pipeline is not expressible by variant '{}'",
                self.variant.name
            ))
        })?;

        let body = compression::compress_stages(plaintext, &self.stages)?;
        let iv = match self.iv {
            Some(iv) => iv,
            None => crypto::generate_iv()?,
        };

        let sealed_len = match self.mode {
            Some(mode) => crypto::sealed_length(body.len(), mode),
            None => body.len(),
        };
        if sealed_len == 0 {
            return Err(InformError::incomplete(
                crate::error::constants::ERR_NO_PAYLOAD_LENGTH,
            ));
        }
        if sealed_len > MAX_PAYLOAD_SIZE {
            return Err(InformError::OversizedPacket(sealed_len));
        }
        let payload_length =
            u32::try_from(sealed_len).map_err(|_| InformError::OversizedPacket(sealed_len))?;

        let header = InformHeader::new(
            &self.variant,
            self.packet_version,
            self.mac,
            flags,
            iv,
            self.payload_version,
            payload_length,
        );

        let payload = match self.mode {
            Some(mode) => crypto::encrypt(key, &iv, header.raw(), &body, mode)?,
            None => body,
        };
        debug!(flags = %flags, payload_length, "Sealed inform packet");

        Ok(Packet::assemble(
            header,
            Bytes::from(payload),
            self.variant.clone(),
            MAX_PAYLOAD_SIZE,
        ))
    }
}
