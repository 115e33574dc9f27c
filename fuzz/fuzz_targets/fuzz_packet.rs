#![no_main]

use libfuzzer_sys::fuzz_target;
use inform_protocol::Packet;

fuzz_target!(|data: &[u8]| {
    // Header parsing and the full decode pipeline must never panic
    if let Ok(packet) = Packet::from_bytes(data) {
        let _ = packet.data(&[0x42; 16]);
    }
});
