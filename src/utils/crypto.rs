//! AES-128 payload encryption.
//!
//! Two modes are in use on the wire:
//! - **CBC**: the header IV is the CBC initialization vector
//! - **GCM**: the header IV is the nonce and the 40 header bytes are
//!   associated data, so any header tampering fails authentication
//!
//! Both modes carry PKCS#7 padding inside the ciphertext. GCM does not need it,
//! but devices pad before sealing, so it is stripped after either mode.

use crate::core::structure::IV_LENGTH;
use crate::core::variant::CipherMode;
use crate::error::{InformError, PaddingError, Result};
use crate::utils::padding;
use aes::Aes128;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{AesGcm, Nonce};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-128 key size.
pub const KEY_LENGTH: usize = 16;

/// AES block size.
pub const BLOCK_SIZE: usize = 16;

/// GCM authentication tag size, appended to the ciphertext.
pub const TAG_LENGTH: usize = 16;

/// Key devices use before they are adopted (MD5 of "ubnt").
pub const FACTORY_DEFAULT_KEY: [u8; KEY_LENGTH] = [
    0xba, 0x86, 0xf2, 0xbb, 0xe1, 0x07, 0xc7, 0xc5, 0x7e, 0xb5, 0xf2, 0x69, 0x07, 0x75, 0xc7, 0x12,
];

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;

// GCM nonce is the full header IV rather than the usual 96 bits
type Aes128GcmIv = AesGcm<Aes128, U16>;
const _: () = assert!(IV_LENGTH == 16);

/// A device's shared AES-128 secret. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct InformKey([u8; KEY_LENGTH]);

impl InformKey {
    pub fn new(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Copy a key out of a slice, which must be exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| InformError::InvalidKey(bytes.len()))?;
        Ok(Self(key))
    }

    /// Parse 32 hex characters.
    pub fn from_hex(text: &str) -> Result<Self> {
        let mut bytes = hex::decode(text.trim())
            .map_err(|e| InformError::ConfigError(format!("key is not valid hex: {e}")))?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        key
    }

    pub fn factory_default() -> Self {
        Self(FACTORY_DEFAULT_KEY)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for InformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InformKey(..)")
    }
}

impl FromStr for InformKey {
    type Err = InformError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for InformKey {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

fn check_key(key: &[u8]) -> Result<()> {
    if key.len() != KEY_LENGTH {
        return Err(InformError::InvalidKey(key.len()));
    }
    Ok(())
}

/// Decrypt `ciphertext` and strip its PKCS#7 padding.
///
/// # Errors
/// - `InvalidKey` if `key` is not 16 bytes, before any cipher is built
/// - `InvalidPadding(NotPadded)` for CBC input that is not block aligned
/// - `AuthenticationFailure` if the GCM tag does not verify
/// - `InvalidPadding(..)` if the decrypted padding is malformed
#[instrument(skip_all, level = "debug", fields(mode = ?mode, len = ciphertext.len()))]
pub fn decrypt(
    key: &[u8],
    iv: &[u8; IV_LENGTH],
    aad: &[u8],
    ciphertext: &[u8],
    mode: CipherMode,
) -> Result<Vec<u8>> {
    check_key(key)?;

    let plain = match mode {
        CipherMode::Cbc => decrypt_cbc(key, iv, ciphertext)?,
        CipherMode::Gcm => decrypt_gcm(key, iv, aad, ciphertext)?,
    };

    let unpadded = padding::unpad_vec(plain)?;
    debug!(plaintext_len = unpadded.len(), "Decrypted payload");
    Ok(unpadded)
}

fn decrypt_cbc(key: &[u8], iv: &[u8; IV_LENGTH], ciphertext: &[u8]) -> Result<Vec<u8>> {
    // CBC cannot decrypt a partial block
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(PaddingError::NotPadded.into());
    }

    let mut buf = ciphertext.to_vec();
    let cipher = Aes128CbcDec::new_from_slices(key, iv)
        .map_err(|_| InformError::InvalidKey(key.len()))?;
    cipher
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| InformError::InvalidPadding(PaddingError::NotPadded))?;
    Ok(buf)
}

fn decrypt_gcm(
    key: &[u8],
    iv: &[u8; IV_LENGTH],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let cipher =
        Aes128GcmIv::new_from_slice(key).map_err(|_| InformError::InvalidKey(key.len()))?;
    cipher
        .decrypt(
            Nonce::<U16>::from_slice(iv),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| InformError::AuthenticationFailure)
}

/// Pad and encrypt `plaintext`; the inverse of [`decrypt`].
///
/// For GCM the returned buffer carries the 16-byte tag at its end.
#[instrument(skip_all, level = "debug", fields(mode = ?mode, len = plaintext.len()))]
pub fn encrypt(
    key: &[u8],
    iv: &[u8; IV_LENGTH],
    aad: &[u8],
    plaintext: &[u8],
    mode: CipherMode,
) -> Result<Vec<u8>> {
    check_key(key)?;

    let mut padded = padding::pad(plaintext, BLOCK_SIZE);
    match mode {
        CipherMode::Cbc => {
            let len = padded.len();
            let cipher = Aes128CbcEnc::new_from_slices(key, iv)
                .map_err(|_| InformError::InvalidKey(key.len()))?;
            cipher
                .encrypt_padded_mut::<NoPadding>(&mut padded, len)
                .map_err(|_| InformError::EncryptionFailure)?;
            Ok(padded)
        }
        CipherMode::Gcm => {
            let cipher = Aes128GcmIv::new_from_slice(key)
                .map_err(|_| InformError::InvalidKey(key.len()))?;
            let sealed = cipher
                .encrypt(
                    Nonce::<U16>::from_slice(iv),
                    Payload {
                        msg: &padded,
                        aad,
                    },
                )
                .map_err(|_| InformError::EncryptionFailure);
            padded.zeroize();
            sealed
        }
    }
}

/// Length of the ciphertext [`encrypt`] produces for `plaintext_len` bytes.
pub fn sealed_length(plaintext_len: usize, mode: CipherMode) -> usize {
    let padded = plaintext_len + (BLOCK_SIZE - plaintext_len % BLOCK_SIZE);
    match mode {
        CipherMode::Cbc => padded,
        CipherMode::Gcm => padded + TAG_LENGTH,
    }
}

/// Fresh random IV from the OS generator.
pub fn generate_iv() -> Result<[u8; IV_LENGTH]> {
    let mut iv = [0u8; IV_LENGTH];
    getrandom::fill(&mut iv)
        .map_err(|e| InformError::Io(std::io::Error::other(e.to_string())))?;
    Ok(iv)
}
