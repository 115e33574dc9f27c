//! # Configuration Management
//!
//! Centralized configuration for inform decoding.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment variable overrides via `from_env()`
//!
//! ## Example
//! ```toml
//! [decoder]
//! variant = "unifi"
//! detect_variant = true
//! max_payload_size = 16777216
//!
//! [[decoder.custom_variants]]
//! name = "lab"
//! magic = "LABX"
//! [decoder.custom_variants.flags]
//! encrypted = 1
//! snappy = 4
//!
//! [logging]
//! log_level = "debug"
//! ```

use crate::core::variant::ProtocolVariant;
use crate::error::{constants, InformError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Max allowed payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Name of the variant used when nothing else is configured
pub const DEFAULT_VARIANT: &str = "unifi";

/// Top level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct InformConfig {
    /// Decoder configuration
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl InformConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| InformError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| InformError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| InformError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Override fields from `INFORM_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(variant) = std::env::var("INFORM_VARIANT") {
            self.decoder.variant = variant;
        }

        if let Ok(detect) = std::env::var("INFORM_DETECT_VARIANT") {
            if let Ok(val) = detect.parse::<bool>() {
                self.decoder.detect_variant = val;
            }
        }

        if let Ok(size) = std::env::var("INFORM_MAX_PAYLOAD_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                self.decoder.max_payload_size = val;
            }
        }

        if let Ok(level) = std::env::var("INFORM_LOG_LEVEL") {
            if let Ok(val) = level.parse::<Level>() {
                self.logging.log_level = val;
            }
        }
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| InformError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| InformError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.decoder.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(InformError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Decoder configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Name of the protocol variant to decode with
    pub variant: String,

    /// Try the other known variants when the selected one fails
    pub detect_variant: bool,

    /// Maximum declared payload length and decompressed size in bytes
    pub max_payload_size: usize,

    /// Variants beyond the built-in ones
    pub custom_variants: Vec<ProtocolVariant>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            variant: String::from(DEFAULT_VARIANT),
            detect_variant: false,
            max_payload_size: MAX_PAYLOAD_SIZE,
            custom_variants: Vec::new(),
        }
    }
}

impl DecoderConfig {
    /// Every variant this configuration knows about, custom ones first so
    /// they can shadow a built-in name.
    pub fn known_variants(&self) -> Vec<ProtocolVariant> {
        let mut all = self.custom_variants.clone();
        for builtin in ProtocolVariant::builtin() {
            if !all.iter().any(|v| v.name == builtin.name) {
                all.push(builtin);
            }
        }
        all
    }

    /// The selected variant.
    pub fn resolve_variant(&self) -> Result<ProtocolVariant> {
        self.known_variants()
            .into_iter()
            .find(|v| v.name.eq_ignore_ascii_case(&self.variant))
            .ok_or_else(|| {
                InformError::ConfigError(format!(
                    "{}: '{}'",
                    constants::ERR_UNKNOWN_VARIANT,
                    self.variant
                ))
            })
    }

    /// Variants to try, selected one first. Only the selected one unless
    /// `detect_variant` is set.
    pub fn candidates(&self) -> Result<Vec<ProtocolVariant>> {
        let selected = self.resolve_variant()?;
        let mut out = vec![selected.clone()];
        if self.detect_variant {
            out.extend(
                self.known_variants()
                    .into_iter()
                    .filter(|v| v.name != selected.name),
            );
        }
        Ok(out)
    }

    /// Validate decoder configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.variant.is_empty() {
            errors.push("Variant name cannot be empty".to_string());
        } else if self.resolve_variant().is_err() {
            errors.push(format!("Unknown protocol variant: '{}'", self.variant));
        }

        if self.max_payload_size == 0 {
            errors.push("Max payload size cannot be 0".to_string());
        } else if self.max_payload_size > u32::MAX as usize {
            errors.push(format!(
                "Max payload size too large: {} bytes (length field is 32 bits)",
                self.max_payload_size
            ));
        }

        for (i, variant) in self.custom_variants.iter().enumerate() {
            errors.extend(variant.validate());
            if self.custom_variants[..i]
                .iter()
                .any(|other| other.name == variant.name)
            {
                errors.push(format!("Duplicate custom variant name: '{}'", variant.name));
            }
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to stderr
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: Level::WARN,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
