#![no_main]

use libfuzzer_sys::fuzz_target;
use inform_protocol::utils::compression::{decompress, MAX_DECOMPRESSION_SIZE};
use inform_protocol::CompressionKind;

fuzz_target!(|data: &[u8]| {
    let _ = decompress(data, CompressionKind::Zlib, MAX_DECOMPRESSION_SIZE);
    let _ = decompress(data, CompressionKind::Snappy, MAX_DECOMPRESSION_SIZE);
});
