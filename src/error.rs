//! # Error Types
//!
//! Error handling for inform packet decoding.
//!
//! Every stage of the pipeline reports failures through [`InformError`]. Nothing
//! is retried internally: decoding the same bytes with the same key cannot
//! succeed on a second attempt, so the error is handed straight back to the
//! caller together with the [`Stage`] it stopped at.
//!
//! ## Error Categories
//! - **Header Errors**: invalid magic, truncated header, zero or oversized length
//! - **Cryptographic Errors**: wrong key length, padding violations, AEAD tag mismatch
//! - **Flag Errors**: bits the active protocol variant marks as unsupported
//! - **Compression Errors**: corrupt zlib or Snappy streams
//! - **I/O and Configuration Errors**
//!
//! ## Example Usage
//! ```rust
//! use inform_protocol::error::{InformError, Result};
//! use inform_protocol::Packet;
//!
//! fn parse(buf: &[u8]) -> Result<Packet> {
//!     Packet::from_bytes(buf)
//! }
//!
//! match parse(b"TNBU") {
//!     Err(InformError::IncompletePacket(reason)) => assert_eq!(reason, "header too short"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Header errors
    pub const ERR_HEADER_TOO_SHORT: &str = "header too short";
    pub const ERR_NO_PAYLOAD_LENGTH: &str = "header does not define payload length";
    pub const ERR_PAYLOAD_TOO_SHORT: &str = "payload shorter than declared length";

    /// Padding errors
    pub const ERR_PADDING_NO_DATA: &str = "no data";
    pub const ERR_PADDING_NOT_PADDED: &str = "data is not padded";
    pub const ERR_PADDING_STRUCTURE: &str = "structure invalid";

    /// Configuration errors
    pub const ERR_UNKNOWN_VARIANT: &str = "unknown protocol variant";
    pub const ERR_NO_MATCHING_VARIANT: &str = "no protocol variant matches packet magic";
}

/// Reasons a PKCS#7 padded buffer is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingError {
    /// Nothing left to unpad.
    NoData,
    /// Pad length byte is zero, larger than the buffer, or the ciphertext is
    /// not block aligned.
    NotPadded,
    /// Trailing bytes disagree with the pad length. This is what a wrong key
    /// usually looks like.
    StructureInvalid,
}

impl fmt::Display for PaddingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaddingError::NoData => constants::ERR_PADDING_NO_DATA,
            PaddingError::NotPadded => constants::ERR_PADDING_NOT_PADDED,
            PaddingError::StructureInvalid => constants::ERR_PADDING_STRUCTURE,
        })
    }
}

/// Pipeline stage at which decoding stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Header,
    Payload,
    Decrypt,
    Unpad,
    Decompress,
    Encode,
    Config,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Header => "header",
            Stage::Payload => "payload",
            Stage::Decrypt => "decrypt",
            Stage::Unpad => "unpad",
            Stage::Decompress => "decompress",
            Stage::Encode => "encode",
            Stage::Config => "config",
        })
    }
}

// InformError is the error type for every decode and encode operation
#[derive(Error, Debug)]
pub enum InformError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid magic: packet must begin with '{}'", String::from_utf8_lossy(.expected))]
    InvalidMagic { expected: [u8; 4], found: [u8; 4] },

    #[error("incomplete packet: {0}")]
    IncompletePacket(String),

    #[error("packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("invalid key: must be 16 bytes long, got {0}")]
    InvalidKey(usize),

    #[error("invalid padding: {0}")]
    InvalidPadding(PaddingError),

    #[error("unsupported flag: {0}")]
    UnsupportedFlag(String),

    #[error("authentication failed: AEAD tag mismatch")]
    AuthenticationFailure,

    #[error("encryption failed")]
    EncryptionFailure,

    #[error("decompression failed ({algorithm}): {reason}")]
    Decompression {
        algorithm: &'static str,
        reason: String,
    },

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl InformError {
    /// The pipeline stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            InformError::InvalidMagic { .. } | InformError::OversizedPacket(_) => Stage::Header,
            InformError::IncompletePacket(_) | InformError::Io(_) => Stage::Payload,
            InformError::InvalidKey(_) | InformError::AuthenticationFailure => Stage::Decrypt,
            InformError::InvalidPadding(_) => Stage::Unpad,
            InformError::Decompression { .. } | InformError::UnsupportedFlag(_) => {
                Stage::Decompress
            }
            InformError::EncryptionFailure => Stage::Encode,
            InformError::ConfigError(_) => Stage::Config,
        }
    }

    /// True for failures that indicate a wrong key or tampered packet rather
    /// than a malformed one.
    pub fn is_key_mismatch(&self) -> bool {
        matches!(
            self,
            InformError::AuthenticationFailure
                | InformError::InvalidPadding(PaddingError::StructureInvalid)
        )
    }

    pub(crate) fn incomplete(reason: impl Into<String>) -> Self {
        InformError::IncompletePacket(reason.into())
    }
}

impl From<PaddingError> for InformError {
    fn from(err: PaddingError) -> Self {
        InformError::InvalidPadding(err)
    }
}

/// Type alias for Results using InformError
pub type Result<T> = std::result::Result<T, InformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_messages() {
        assert_eq!(
            InformError::from(PaddingError::StructureInvalid).to_string(),
            "invalid padding: structure invalid"
        );
        assert_eq!(
            InformError::from(PaddingError::NotPadded).to_string(),
            "invalid padding: data is not padded"
        );
        assert_eq!(
            InformError::from(PaddingError::NoData).to_string(),
            "invalid padding: no data"
        );
    }

    #[test]
    fn test_magic_message_names_expected_constant() {
        let err = InformError::InvalidMagic {
            expected: *b"TNBU",
            found: *b"XXXX",
        };
        assert_eq!(
            err.to_string(),
            "invalid magic: packet must begin with 'TNBU'"
        );
        assert_eq!(err.stage(), Stage::Header);
    }

    #[test]
    fn test_key_mismatch_classification() {
        assert!(InformError::AuthenticationFailure.is_key_mismatch());
        assert!(InformError::from(PaddingError::StructureInvalid).is_key_mismatch());
        assert!(!InformError::from(PaddingError::NotPadded).is_key_mismatch());
        assert!(!InformError::InvalidKey(3).is_key_mismatch());
    }

    #[test]
    fn test_stages() {
        assert_eq!(InformError::InvalidKey(3).stage(), Stage::Decrypt);
        assert_eq!(
            InformError::UnsupportedFlag("0x0002".into()).stage(),
            Stage::Decompress
        );
        assert_eq!(
            InformError::from(PaddingError::NotPadded).stage(),
            Stage::Unpad
        );
    }
}
