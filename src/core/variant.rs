//! Protocol variants.
//!
//! Firmware generations disagree on the magic constant, on which flag bit means
//! what, and on whether AES-GCM exists at all. A [`ProtocolVariant`] captures one
//! such convention as plain data so the parser and pipeline never hardcode it.
//!
//! Two variants ship built in:
//!
//! | name | magic | encrypted | zlib | snappy | aead | unsupported |
//! |---|---|---|---|---|---|---|
//! | `unifi` | `TNBU` | `0x01` | `0x02` | `0x04` | `0x08` | none |
//! | `legacy` | `TNBU` | `0x01` | none | `0x04` | none | `0x02` |
//!
//! Custom variants can be declared in configuration.

use crate::core::structure::{Flags, MAGIC_LENGTH};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Bit assignments for the flags field. A mask of `0` means the variant has no
/// such bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagLayout {
    pub encrypted: u16,
    #[serde(default)]
    pub aead: u16,
    #[serde(default)]
    pub zlib: u16,
    #[serde(default)]
    pub snappy: u16,
    /// Bits that name a scheme this variant does not implement. Seeing one set
    /// is an error rather than something to skip.
    #[serde(default)]
    pub unsupported: u16,
}

impl FlagLayout {
    /// All bits this layout assigns a meaning to.
    pub const fn known_bits(&self) -> u16 {
        self.encrypted | self.aead | self.zlib | self.snappy | self.unsupported
    }
}

/// Encryption mode selected by the flags of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    Cbc,
    Gcm,
}

/// Compression stage selected by the flags of a packet. Declaration order is
/// decode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompressionKind {
    Zlib,
    Snappy,
}

impl CompressionKind {
    pub fn name(self) -> &'static str {
        match self {
            CompressionKind::Zlib => "zlib",
            CompressionKind::Snappy => "snappy",
        }
    }
}

/// One header and flag convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVariant {
    pub name: Cow<'static, str>,
    #[serde(with = "magic_serde")]
    pub magic: [u8; MAGIC_LENGTH],
    pub flags: FlagLayout,
}

impl ProtocolVariant {
    /// Current firmware: zlib on bit 1, AES-GCM on bit 3.
    pub const UNIFI: ProtocolVariant = ProtocolVariant {
        name: Cow::Borrowed("unifi"),
        magic: *b"TNBU",
        flags: FlagLayout {
            encrypted: 0x01,
            aead: 0x08,
            zlib: 0x02,
            snappy: 0x04,
            unsupported: 0,
        },
    };

    /// Older firmware: CBC only, bit 1 is a "compressed" marker without a
    /// known algorithm.
    pub const LEGACY: ProtocolVariant = ProtocolVariant {
        name: Cow::Borrowed("legacy"),
        magic: *b"TNBU",
        flags: FlagLayout {
            encrypted: 0x01,
            aead: 0,
            zlib: 0,
            snappy: 0x04,
            unsupported: 0x02,
        },
    };

    pub fn builtin() -> [ProtocolVariant; 2] {
        [Self::UNIFI, Self::LEGACY]
    }

    /// Look up a built-in variant by name.
    pub fn by_name(name: &str) -> Option<ProtocolVariant> {
        Self::builtin()
            .into_iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
    }

    pub fn supports_aead(&self) -> bool {
        self.flags.aead != 0
    }

    /// First candidate whose magic matches the start of `buf`.
    pub fn detect<'a>(
        buf: &[u8],
        candidates: &'a [ProtocolVariant],
    ) -> Option<&'a ProtocolVariant> {
        let magic = buf.get(..MAGIC_LENGTH)?;
        candidates.iter().find(|v| v.magic.as_slice() == magic)
    }

    pub fn is_encrypted(&self, flags: Flags) -> bool {
        flags.any(self.flags.encrypted)
    }

    /// Cipher mode for `flags`, `None` when the payload is not encrypted.
    pub fn cipher_mode(&self, flags: Flags) -> Option<CipherMode> {
        if !self.is_encrypted(flags) {
            return None;
        }
        if flags.any(self.flags.aead) {
            Some(CipherMode::Gcm)
        } else {
            Some(CipherMode::Cbc)
        }
    }

    /// Decompression stages in the order they must run: zlib, then Snappy.
    pub fn compression_stages(&self, flags: Flags) -> Vec<CompressionKind> {
        let mut stages = Vec::with_capacity(2);
        if flags.any(self.flags.zlib) {
            stages.push(CompressionKind::Zlib);
        }
        if flags.any(self.flags.snappy) {
            stages.push(CompressionKind::Snappy);
        }
        stages
    }

    /// Set bits this variant cannot honour.
    pub fn unsupported_bits(&self, flags: Flags) -> u16 {
        flags.bits() & self.flags.unsupported
    }

    /// Flags value that requests the given pipeline under this variant.
    pub fn flags_for(
        &self,
        mode: Option<CipherMode>,
        stages: &[CompressionKind],
    ) -> Option<Flags> {
        let mut bits = 0u16;
        match mode {
            Some(CipherMode::Cbc) => bits |= self.flags.encrypted,
            Some(CipherMode::Gcm) => {
                if !self.supports_aead() {
                    return None;
                }
                bits |= self.flags.encrypted | self.flags.aead;
            }
            None => {}
        }
        for stage in stages {
            let mask = match stage {
                CompressionKind::Zlib => self.flags.zlib,
                CompressionKind::Snappy => self.flags.snappy,
            };
            if mask == 0 {
                return None;
            }
            bits |= mask;
        }
        Some(Flags(bits))
    }

    /// Human readable names of the set flag bits, unknown bits in hex.
    pub fn describe(&self, flags: Flags) -> String {
        let layout = &self.flags;
        let mut names = Vec::new();
        for (mask, name) in [
            (layout.encrypted, "encrypted"),
            (layout.aead, "aead"),
            (layout.zlib, "zlib"),
            (layout.snappy, "snappy"),
            (layout.unsupported, "unsupported"),
        ] {
            if flags.any(mask) {
                names.push(name.to_string());
            }
        }
        let unknown = flags.bits() & !layout.known_bits();
        if unknown != 0 {
            names.push(format!("{unknown:#06x}"));
        }
        if names.is_empty() {
            String::from("none")
        } else {
            names.join("|")
        }
    }

    /// Validate the descriptor itself. Returns a list of problems.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let layout = &self.flags;

        if self.name.is_empty() {
            errors.push("Variant name cannot be empty".to_string());
        }
        if layout.encrypted == 0 {
            errors.push(format!("Variant '{}' has no encrypted bit", self.name));
        }

        let masks = [
            ("encrypted", layout.encrypted),
            ("aead", layout.aead),
            ("zlib", layout.zlib),
            ("snappy", layout.snappy),
            ("unsupported", layout.unsupported),
        ];
        for (i, (a_name, a)) in masks.iter().enumerate() {
            for (b_name, b) in &masks[i + 1..] {
                if a & b != 0 {
                    errors.push(format!(
                        "Variant '{}': {a_name} and {b_name} bits overlap",
                        self.name
                    ));
                }
            }
        }

        errors
    }
}

impl Default for ProtocolVariant {
    fn default() -> Self {
        Self::UNIFI
    }
}

/// Helper module for magic constant serialization as a 4-character string
mod magic_serde {
    use super::MAGIC_LENGTH;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(magic: &[u8; MAGIC_LENGTH], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match std::str::from_utf8(magic) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.serialize_str(&hex::encode(magic)),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; MAGIC_LENGTH], D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        let bytes = if text.len() == MAGIC_LENGTH * 2 {
            hex::decode(&text).map_err(serde::de::Error::custom)?
        } else {
            text.into_bytes()
        };
        bytes.as_slice().try_into().map_err(|_| {
            serde::de::Error::custom(format!(
                "magic must be {MAGIC_LENGTH} ASCII characters or {} hex digits",
                MAGIC_LENGTH * 2
            ))
        })
    }
}
