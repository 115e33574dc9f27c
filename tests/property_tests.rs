//! Property-based tests using proptest
//!
//! These tests validate parser and pipeline invariants across randomly
//! generated headers, keys and payloads.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use inform_protocol::core::structure::{HEADER_LENGTH, IV_LENGTH};
use inform_protocol::utils::padding::{pad, unpad};
use inform_protocol::{
    CipherMode, CompressionKind, Flags, InformError, InformHeader, MacAddress, Packet,
    PacketBuilder, ProtocolVariant,
};
use proptest::prelude::*;

// Property: every header field survives encode then parse
proptest! {
    #[test]
    fn prop_header_fields_preserved(
        packet_version in any::<u32>(),
        mac in any::<[u8; 6]>(),
        flags in any::<u16>(),
        iv in any::<[u8; IV_LENGTH]>(),
        payload_version in any::<u32>(),
        payload in prop::collection::vec(any::<u8>(), 1..512),
    ) {
        let header = InformHeader::new(
            &ProtocolVariant::UNIFI,
            packet_version,
            MacAddress(mac),
            Flags(flags),
            iv,
            payload_version,
            payload.len() as u32,
        );
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&payload);

        let packet = Packet::from_bytes(&bytes).expect("valid header should parse");
        prop_assert_eq!(packet.packet_version, packet_version);
        prop_assert_eq!(packet.mac, MacAddress(mac));
        prop_assert_eq!(packet.flags, Flags(flags));
        prop_assert_eq!(packet.iv, iv);
        prop_assert_eq!(packet.payload_version, payload_version);
        prop_assert_eq!(packet.payload.as_ref(), payload.as_slice());
        prop_assert_eq!(packet.header_bytes().as_slice(), &bytes[..HEADER_LENGTH]);
    }
}

// Property: arbitrary input never panics the parser
proptest! {
    #[test]
    fn prop_arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = Packet::from_bytes(&data);
    }

    #[test]
    fn prop_short_buffers_are_incomplete(data in prop::collection::vec(any::<u8>(), 0..HEADER_LENGTH)) {
        let is_incomplete = matches!(
            Packet::from_bytes(&data),
            Err(InformError::IncompletePacket(_))
        );
        prop_assert!(is_incomplete);
    }
}

// Property: decoding arbitrary payloads with arbitrary keys fails cleanly
proptest! {
    #[test]
    fn prop_arbitrary_payload_decode_never_panics(
        flags in 0u16..16,
        key in prop::collection::vec(any::<u8>(), 16),
        payload in prop::collection::vec(any::<u8>(), 1..256),
    ) {
        let header = InformHeader::new(
            &ProtocolVariant::UNIFI,
            0,
            MacAddress::default(),
            Flags(flags),
            [0; IV_LENGTH],
            1,
            payload.len() as u32,
        );
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&payload);
        let packet = Packet::from_bytes(&bytes).unwrap();
        let _ = packet.data(&key);
    }
}

// Property: any key length other than 16 is rejected with its length
proptest! {
    #[test]
    fn prop_invalid_key_length(key in prop::collection::vec(any::<u8>(), 0..64)) {
        prop_assume!(key.len() != 16);
        let packet = PacketBuilder::default()
            .encryption(CipherMode::Cbc)
            .seal(&[7u8; 16], b"payload")
            .unwrap();
        match packet.data(&key) {
            Err(InformError::InvalidKey(n)) => prop_assert_eq!(n, key.len()),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }
}

// Property: sealing then decoding returns the plaintext for every pipeline
proptest! {
    #[test]
    fn prop_seal_then_decode(
        plaintext in prop::collection::vec(any::<u8>(), 0..2048),
        key in any::<[u8; 16]>(),
        gcm in any::<bool>(),
        zlib in any::<bool>(),
        snappy in any::<bool>(),
    ) {
        let mut builder = PacketBuilder::default()
            .encryption(if gcm { CipherMode::Gcm } else { CipherMode::Cbc });
        if zlib {
            builder = builder.compression(CompressionKind::Zlib);
        }
        if snappy {
            builder = builder.compression(CompressionKind::Snappy);
        }
        let sealed = builder.seal(&key, &plaintext).unwrap();
        let packet = Packet::from_bytes(&sealed.to_bytes()).unwrap();
        prop_assert_eq!(packet.data(&key).unwrap(), plaintext);
    }
}

// Property: data() is deterministic
proptest! {
    #[test]
    fn prop_decode_deterministic(
        plaintext in prop::collection::vec(any::<u8>(), 1..512),
        wrong in any::<[u8; 16]>(),
    ) {
        let key = [0x5au8; 16];
        let packet = PacketBuilder::default()
            .encryption(CipherMode::Cbc)
            .compression(CompressionKind::Snappy)
            .seal(&key, &plaintext)
            .unwrap();

        prop_assert_eq!(packet.data(&key).unwrap(), packet.data(&key).unwrap());
        let first = packet.data(&wrong).map_err(|e| e.to_string());
        let second = packet.data(&wrong).map_err(|e| e.to_string());
        prop_assert_eq!(first, second);
    }
}

// Property: PKCS#7 pad output always unpads to the input
proptest! {
    #[test]
    fn prop_pad_unpad(data in prop::collection::vec(any::<u8>(), 0..300)) {
        let padded = pad(&data, 16);
        prop_assert_eq!(padded.len() % 16, 0);
        prop_assert!(padded.len() > data.len());
        prop_assert_eq!(unpad(&padded).unwrap(), data.as_slice());
    }
}
