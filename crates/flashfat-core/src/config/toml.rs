//! TOML configuration parsing
//!
//! ```toml
//! [device]
//! size = "8 MiB"
//! max_files = 32
//!
//! [timing]
//! erase_poll_us = 10000
//! erase_timeout_us = 1000000
//! ```
//!
//! Every key is optional; missing keys keep their [`FatConfig::default`] value.

use std::fs;
use std::path::Path;
use std::string::String;
use std::format;

use super::{BusyTiming, ConfigError, FatConfig};

/// TOML configuration file structure
#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfigFile {
    #[serde(default)]
    device: TomlDevice,
    #[serde(default)]
    timing: TomlTiming,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlDevice {
    #[serde(default, deserialize_with = "deserialize_size")]
    size: Option<u32>,
    max_files: Option<u8>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlTiming {
    erase_poll_us: Option<u32>,
    erase_timeout_us: Option<u32>,
    program_poll_us: Option<u32>,
    program_timeout_us: Option<u32>,
}

/// Deserialize a size that can be an integer or a string like "8 MiB"
fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeOrInt {
        Int(u32),
        Str(String),
    }

    match SizeOrInt::deserialize(deserializer)? {
        SizeOrInt::Int(n) => Ok(Some(n)),
        SizeOrInt::Str(s) => parse_size(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

/// Parse a size string like "8 MiB", "0x800000" or "8388608"
pub fn parse_size(s: &str) -> Result<u32, String> {
    let s = s.trim();

    if let Ok(n) = s.parse::<u32>() {
        return Ok(n);
    }

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u32::from_str_radix(hex.trim(), 16).map_err(|e| format!("invalid hex: {}", e));
    }

    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("b") {
        (n.trim(), 1)
    } else {
        return Err(format!("invalid size: {}", s));
    };

    let num: u32 = num_str.parse().map_err(|_| format!("invalid size: {}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflows: {}", s))
}

impl FatConfig {
    /// Load a configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|_| ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: TomlConfigFile = ::toml::from_str(content).map_err(|e| {
            log::debug!("config parse error: {}", e);
            ConfigError::Parse
        })?;

        let mut config = FatConfig::default();
        if let Some(size) = file.device.size {
            config.device_size = size;
        }
        if let Some(max_files) = file.device.max_files {
            config.max_files = max_files;
        }

        let defaults = BusyTiming::default();
        config.timing = BusyTiming {
            erase_poll_us: file.timing.erase_poll_us.unwrap_or(defaults.erase_poll_us),
            erase_timeout_us: file
                .timing
                .erase_timeout_us
                .unwrap_or(defaults.erase_timeout_us),
            program_poll_us: file
                .timing
                .program_poll_us
                .unwrap_or(defaults.program_poll_us),
            program_timeout_us: file
                .timing
                .program_timeout_us
                .unwrap_or(defaults.program_timeout_us),
        };

        config.validate()?;
        Ok(config)
    }
}
