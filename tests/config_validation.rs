//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use inform_protocol::config::{DecoderConfig, InformConfig, LoggingConfig, MAX_PAYLOAD_SIZE};
use inform_protocol::{PacketReader, ProtocolVariant};
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = InformConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
    assert_eq!(config.decoder.variant, "unifi");
    assert_eq!(config.decoder.max_payload_size, MAX_PAYLOAD_SIZE);
    assert_eq!(config.logging.log_level, Level::WARN);
}

#[test]
fn test_unknown_variant() {
    let mut config = InformConfig::default();
    config.decoder.variant = "airos".to_string();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Unknown protocol variant")));
    assert!(config.validate_strict().is_err());
    assert!(PacketReader::from_config(&config.decoder).is_err());
}

#[test]
fn test_empty_variant_name() {
    let mut config = DecoderConfig::default();
    config.variant = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_variant_lookup_is_case_insensitive() {
    let mut config = DecoderConfig::default();
    config.variant = "LEGACY".to_string();
    assert_eq!(config.resolve_variant().unwrap(), ProtocolVariant::LEGACY);
}

#[test]
fn test_zero_max_payload_size() {
    let mut config = InformConfig::default();
    config.decoder.max_payload_size = 0;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be 0")));
}

#[test]
fn test_max_payload_size_beyond_length_field() {
    let mut config = DecoderConfig::default();
    config.max_payload_size = u32::MAX as usize + 1;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("too large")));
}

#[test]
fn test_candidates_follow_detect_flag() {
    let mut config = DecoderConfig::default();
    let names = |c: &DecoderConfig| -> Vec<String> {
        c.candidates()
            .unwrap()
            .into_iter()
            .map(|v| v.name.into_owned())
            .collect()
    };

    assert_eq!(names(&config), vec!["unifi"]);
    config.detect_variant = true;
    assert_eq!(names(&config), vec!["unifi", "legacy"]);
}

#[test]
fn test_custom_variants_from_toml() {
    let config = InformConfig::from_toml(
        r#"
        [decoder]
        variant = "lab"
        detect_variant = false
        max_payload_size = 65536

        [[decoder.custom_variants]]
        name = "lab"
        magic = "4c414258"
        [decoder.custom_variants.flags]
        encrypted = 1
        aead = 8
        zlib = 2
        snappy = 4

        [logging]
        log_level = "debug"
        log_to_console = true
        log_to_file = false
        json_format = true
        "#,
    )
    .unwrap();

    assert!(config.validate().is_empty(), "{:?}", config.validate());
    let lab = config.decoder.resolve_variant().unwrap();
    assert_eq!(&lab.magic, b"LABX");
    assert!(lab.supports_aead());
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.logging.json_format);
}

#[test]
fn test_custom_variant_shadows_builtin() {
    let mut config = DecoderConfig::default();
    let mut custom = ProtocolVariant::UNIFI;
    custom.magic = *b"NEWM";
    config.custom_variants.push(custom);

    assert_eq!(&config.resolve_variant().unwrap().magic, b"NEWM");
    assert_eq!(config.known_variants().len(), 2);
}

#[test]
fn test_invalid_custom_variants() {
    let mut config = DecoderConfig::default();

    let mut overlapping = ProtocolVariant::UNIFI;
    overlapping.name = "overlap".into();
    overlapping.flags.zlib = overlapping.flags.encrypted;
    config.custom_variants.push(overlapping.clone());
    config.custom_variants.push(overlapping);

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("overlap")));
    assert!(errors.iter().any(|e| e.contains("Duplicate custom variant")));
}

#[test]
fn test_malformed_toml() {
    let err = InformConfig::from_toml("[decoder\nvariant = ").unwrap_err();
    assert!(err.to_string().starts_with("configuration error: Failed to parse TOML"));

    let err = InformConfig::from_toml(
        r#"
        [[decoder.custom_variants]]
        name = "bad"
        magic = "TOOLONG"
        [decoder.custom_variants.flags]
        encrypted = 1
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("magic must be 4 ASCII characters"));
}

#[test]
fn test_log_file_requires_path() {
    let config = LoggingConfig {
        log_to_file: true,
        log_file_path: None,
        ..LoggingConfig::default()
    };
    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("log_file_path")));
}

#[test]
fn test_no_log_output() {
    let config = LoggingConfig {
        log_to_console: false,
        log_to_file: false,
        ..LoggingConfig::default()
    };
    assert!(!config.validate().is_empty());
}

#[test]
fn test_invalid_log_level() {
    let err = InformConfig::from_toml(
        r#"
        [logging]
        log_level = "loud"
        log_to_console = true
        log_to_file = false
        json_format = false
        "#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("Invalid log level"));
}

#[test]
fn test_example_config_roundtrip() {
    let text = InformConfig::example_config();
    let parsed = InformConfig::from_toml(&text).unwrap();
    assert!(parsed.validate().is_empty());
    assert_eq!(parsed.decoder.variant, "unifi");
}

#[test]
fn test_save_and_load() {
    let mut config = InformConfig::default();
    config.decoder.detect_variant = true;
    config.decoder.custom_variants.push(ProtocolVariant {
        name: "saved".into(),
        magic: *b"SAVE",
        flags: ProtocolVariant::LEGACY.flags,
    });

    let path = std::env::temp_dir().join(format!("inform-config-{}.toml", std::process::id()));
    config.save_to_file(&path).unwrap();
    let loaded = InformConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert!(loaded.decoder.detect_variant);
    assert_eq!(loaded.decoder.custom_variants, config.decoder.custom_variants);
}

#[test]
fn test_missing_file() {
    let err = InformConfig::from_file("/nonexistent/inform.toml").unwrap_err();
    assert!(err.to_string().contains("Failed to open config file"));
}
