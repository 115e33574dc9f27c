//! # Core Protocol Components
//!
//! Header parsing, packet assembly, stream framing and sealing.
//!
//! ## Components
//! - **Structure**: field catalog, flags and MAC address types
//! - **Variant**: magic constant and flag bit conventions per firmware generation
//! - **Header**: fixed-size header parser
//! - **Packet**: assembled packet and the decode pipeline
//! - **Codec**: Tokio codec for framing over byte streams
//! - **Builder**: compress, encrypt and frame outgoing packets
//!
//! ## Wire Format
//! All integers are big-endian.
//! ```text
//! [Magic(4)] [PacketVersion(4)] [MAC(6)] [Flags(2)] [IV(16)] [PayloadVersion(4)] [Length(4)] [Payload(N)]
//! ```
//!
//! ## Security
//! - Maximum payload size: 16MB by default (prevents memory exhaustion)
//! - Magic bytes checked before any other field
//! - Length validation before allocation
//! - AES-GCM authenticates the whole 40-byte header

pub mod builder;
pub mod codec;
pub mod header;
pub mod packet;
pub mod structure;
pub mod variant;
