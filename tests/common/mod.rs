//! Shared fixtures for integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use inform_protocol::core::structure::IV_LENGTH;
use inform_protocol::{CipherMode, CompressionKind, MacAddress, Packet, PacketBuilder};

/// Key of the captured access point the fixture imitates.
pub const DEVICE_KEY_HEX: &str = "e2c930683af3945e4d0d58d37a78c2a6";

pub const DEVICE_MAC: &str = "f0:9f:c2:79:63:90";

pub const FIXTURE_IV: [u8; IV_LENGTH] = [
    0x3a, 0x91, 0x0c, 0x5e, 0xd2, 0x47, 0x88, 0x1b, 0x6f, 0xa0, 0x23, 0xc4, 0x59, 0xe7, 0x12, 0x8d,
];

pub fn device_key() -> Vec<u8> {
    hex::decode(DEVICE_KEY_HEX).unwrap()
}

/// An inform body as an access point would send it.
pub fn device_json() -> Vec<u8> {
    let body = serde_json::json!({
        "mac": DEVICE_MAC,
        "model": "U7PG2",
        "model_display": "UAP-AC-Pro-Gen2",
        "version": "3.9.27.8537",
        "hostname": "UBNT",
        "uptime": 1234,
        "state": 0,
        "ip": "192.168.1.20",
        "netmask": "255.255.255.0",
        "interfaces": ["eth0", "ath0", "ath1"],
        "radio_table": [
            {"name": "wifi0", "radio": "ng", "channel": 6, "max_txpower": 22},
            {"name": "wifi1", "radio": "na", "channel": 36, "max_txpower": 22}
        ],
        "serial": "F09FC2796390",
        "cfgversion": "?",
        "inform_url": "http://unifi:8080/inform"
    });
    serde_json::to_vec(&body).unwrap()
}

/// Encrypted (CBC) and Snappy compressed, like the captured packet.
pub fn fixture_packet() -> Vec<u8> {
    fixture_builder()
        .encryption(CipherMode::Cbc)
        .compression(CompressionKind::Snappy)
        .seal(&device_key(), &device_json())
        .unwrap()
        .to_bytes()
}

pub fn fixture_builder() -> PacketBuilder {
    PacketBuilder::default()
        .mac(DEVICE_MAC.parse::<MacAddress>().unwrap())
        .packet_version(0)
        .payload_version(1)
        .iv(FIXTURE_IV)
}

pub fn parse(bytes: &[u8]) -> Packet {
    Packet::from_bytes(bytes).unwrap()
}
