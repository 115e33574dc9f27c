//! # Inform Protocol
//!
//! Decoder for the inform packet that network devices send to their
//! controller: a 40-byte cleartext header followed by a payload that may be
//! AES-128 encrypted (CBC, or GCM with the header as associated data) and
//! zlib and/or Snappy compressed.
//!
//! ## Quick Start
//! ```rust
//! use inform_protocol::{CipherMode, CompressionKind, Packet, PacketBuilder};
//!
//! let key = [0x42u8; 16];
//! let sealed = PacketBuilder::default()
//!     .encryption(CipherMode::Cbc)
//!     .compression(CompressionKind::Snappy)
//!     .seal(&key, br#"{"model":"U7PG2"}"#)?;
//!
//! let packet = Packet::from_bytes(&sealed.to_bytes())?;
//! assert_eq!(packet.data(&key)?, br#"{"model":"U7PG2"}"#);
//! # Ok::<(), inform_protocol::InformError>(())
//! ```
//!
//! ## Modules
//! - [`core`]: header, packet, variants, codec and builder
//! - [`utils`]: crypto, padding, compression, logging
//! - [`config`]: TOML and environment configuration
//! - [`error`]: error type and pipeline stages

pub mod config;
pub mod core;
pub mod error;
pub mod utils;

pub use crate::config::InformConfig;
pub use crate::core::builder::PacketBuilder;
pub use crate::core::codec::InformCodec;
pub use crate::core::header::{HeaderParser, InformHeader};
pub use crate::core::packet::{read_packet, read_packet_async, Packet, PacketReader, PacketSummary};
pub use crate::core::structure::{Flags, MacAddress, HEADER_LENGTH};
pub use crate::core::variant::{CipherMode, CompressionKind, FlagLayout, ProtocolVariant};
pub use crate::error::{InformError, Result, Stage};
pub use crate::utils::crypto::InformKey;
