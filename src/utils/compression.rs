use crate::config::MAX_PAYLOAD_SIZE;
use crate::core::variant::CompressionKind;
use crate::error::{InformError, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};
use tracing::{debug, instrument};

/// Default ceiling on decompressed output (matches the payload limit)
pub const MAX_DECOMPRESSION_SIZE: usize = MAX_PAYLOAD_SIZE;

fn failure(kind: CompressionKind, reason: impl ToString) -> InformError {
    InformError::Decompression {
        algorithm: kind.name(),
        reason: reason.to_string(),
    }
}

/// Compresses data using the specified compression algorithm
///
/// # Errors
/// Returns `InformError::Decompression` tagged with the algorithm if the
/// encoder fails
pub fn compress(data: &[u8], kind: CompressionKind) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::Zlib => zlib_into(Vec::new(), data),
        CompressionKind::Snappy => snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| failure(kind, e)),
    }
}

fn zlib_into<W: Write>(sink: W, data: &[u8]) -> Result<W> {
    let kind = CompressionKind::Zlib;
    let mut encoder = ZlibEncoder::new(sink, flate2::Compression::default());
    encoder.write_all(data).map_err(|e| failure(kind, e))?;
    encoder.finish().map_err(|e| failure(kind, e))
}

/// Decompresses data that was compressed with the specified algorithm
///
/// Output is bounded by `limit` bytes to stop decompression bombs.
///
/// # Errors
/// Returns `InformError::Decompression` if:
/// - the stream is corrupt or truncated
/// - output size exceeds `limit`
pub fn decompress(data: &[u8], kind: CompressionKind, limit: usize) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::Zlib => {
            let mut decoder = ZlibDecoder::new(data);
            let mut out = Vec::new();

            // Read in chunks to enforce size limit
            let mut buffer = [0u8; 8192];
            loop {
                match decoder.read(&mut buffer) {
                    Ok(0) => break, // EOF
                    Ok(n) => {
                        out.extend_from_slice(&buffer[..n]);
                        if out.len() > limit {
                            return Err(failure(kind, format!("output exceeds {limit} bytes")));
                        }
                    }
                    Err(e) => return Err(failure(kind, e)),
                }
            }
            Ok(out)
        }
        CompressionKind::Snappy => {
            // Raw snappy blocks lead with the uncompressed length; check it
            // before the decoder allocates
            let claimed = snap::raw::decompress_len(data).map_err(|e| failure(kind, e))?;
            if claimed > limit {
                return Err(failure(kind, format!("output exceeds {limit} bytes")));
            }
            snap::raw::Decoder::new()
                .decompress_vec(data)
                .map_err(|e| failure(kind, e))
        }
    }
}

/// Run decompression stages in order, each consuming the previous output.
#[instrument(skip_all, level = "debug", fields(stages = ?stages))]
pub fn decompress_stages(
    data: Vec<u8>,
    stages: &[CompressionKind],
    limit: usize,
) -> Result<Vec<u8>> {
    let mut res = data;
    for &kind in stages {
        let before = res.len();
        res = decompress(&res, kind, limit)?;
        debug!(algorithm = kind.name(), before, after = res.len(), "Decompressed stage");
    }
    Ok(res)
}

/// Apply compression stages so that [`decompress_stages`] with the same list
/// undoes them (the list is walked in reverse).
pub fn compress_stages(data: &[u8], stages: &[CompressionKind]) -> Result<Vec<u8>> {
    let mut res = data.to_vec();
    for &kind in stages.iter().rev() {
        res = compress(&res, kind)?;
    }
    Ok(res)
}
