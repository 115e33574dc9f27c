//! PKCS#7 padding.
//!
//! Unpadding is strict: every pad byte is checked, not only the last one. A
//! wrong key produces random trailing bytes, so in practice this check is what
//! reports a key mismatch on CBC payloads.

use crate::error::PaddingError;

/// Strip PKCS#7 padding, returning the unpadded prefix.
pub fn unpad(data: &[u8]) -> Result<&[u8], PaddingError> {
    let Some(&last) = data.last() else {
        return Err(PaddingError::NoData);
    };
    let n = last as usize;
    if n == 0 || n > data.len() {
        return Err(PaddingError::NotPadded);
    }
    let (body, pad) = data.split_at(data.len() - n);
    if pad.iter().any(|&b| b != last) {
        return Err(PaddingError::StructureInvalid);
    }
    Ok(body)
}

/// Strip PKCS#7 padding from an owned buffer in place.
pub fn unpad_vec(mut data: Vec<u8>) -> Result<Vec<u8>, PaddingError> {
    let len = unpad(&data)?.len();
    data.truncate(len);
    Ok(data)
}

/// Append PKCS#7 padding up to the next multiple of `block_size`.
///
/// A full block of padding is added when `data` is already aligned.
pub fn pad(data: &[u8], block_size: usize) -> Vec<u8> {
    debug_assert!(block_size > 0 && block_size <= u8::MAX as usize);
    let n = block_size - data.len() % block_size;
    let mut out = Vec::with_capacity(data.len() + n);
    out.extend_from_slice(data);
    out.resize(data.len() + n, n as u8);
    out
}
