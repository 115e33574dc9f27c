//! # Utility Modules
//!
//! Supporting utilities for cryptography, padding, compression and logging.
//!
//! ## Components
//! - **Crypto**: AES-128 in CBC and GCM mode, key handling
//! - **Padding**: strict PKCS#7
//! - **Compression**: zlib and Snappy with size limits
//! - **Logging**: Structured logging configuration
//!
//! ## Security
//! - Cryptographically secure RNG (getrandom)
//! - Decompression bomb protection (16MB limit)
//! - Memory zeroing for key material (zeroize crate)

pub mod compression;
pub mod crypto;
pub mod logging;
pub mod padding;
