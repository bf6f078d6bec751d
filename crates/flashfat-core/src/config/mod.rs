//! Store configuration
//!
//! [`FatConfig`] bounds the store to a device size and a file capacity and
//! carries the busy-wait timing used for every device operation. With the
//! `std` feature it can be loaded from a TOML file.

#[cfg(feature = "std")]
mod toml;

#[cfg(feature = "std")]
pub use self::toml::parse_size;

use core::fmt;

use crate::geometry::{MAX_DEVICE_SIZE, SECTOR_SIZE};
use crate::table::MAX_TABLE_ENTRIES;

/// Busy-wait polling parameters
///
/// Defaults follow typical 4KB sector erase and page program timings:
/// * Sector erase: poll every 10ms, give up after 1s (typical 45-400ms)
/// * Page program: poll every 10us, give up after 10ms (typical 0.7-5ms)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyTiming {
    /// Delay between polls while an erase is in progress
    pub erase_poll_us: u32,
    /// Maximum time to wait for an erase to complete
    pub erase_timeout_us: u32,
    /// Delay between polls while a program or read is pending
    pub program_poll_us: u32,
    /// Maximum time to wait for a program to complete
    pub program_timeout_us: u32,
}

impl Default for BusyTiming {
    fn default() -> Self {
        Self {
            erase_poll_us: 10_000,
            erase_timeout_us: 1_000_000,
            program_poll_us: 10,
            program_timeout_us: 10_000,
        }
    }
}

/// Configuration for a [`FlashFat`](crate::FlashFat) store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatConfig {
    /// Usable device size in bytes
    pub device_size: u32,
    /// Maximum number of files the table may hold
    pub max_files: u8,
    /// Busy-wait timing
    pub timing: BusyTiming,
}

impl Default for FatConfig {
    fn default() -> Self {
        Self {
            // W25Q64FV
            device_size: 8 * 1024 * 1024,
            max_files: MAX_TABLE_ENTRIES as u8,
            timing: BusyTiming::default(),
        }
    }
}

impl FatConfig {
    /// Create a configuration for a device of `device_size` bytes
    pub fn new(device_size: u32) -> Self {
        Self {
            device_size,
            ..Self::default()
        }
    }

    /// Set the file capacity
    pub fn with_max_files(mut self, max_files: u8) -> Self {
        self.max_files = max_files;
        self
    }

    /// Set the busy-wait timing
    pub fn with_timing(mut self, timing: BusyTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Check the configuration against the on-flash format limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_size % SECTOR_SIZE != 0
            || self.device_size < 2 * SECTOR_SIZE
            || self.device_size > MAX_DEVICE_SIZE
        {
            return Err(ConfigError::DeviceSize(self.device_size));
        }
        if self.max_files == 0 || self.max_files as usize > MAX_TABLE_ENTRIES {
            return Err(ConfigError::MaxFiles(self.max_files));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Device size is not a sector multiple, too small, or too large
    DeviceSize(u32),
    /// File capacity is zero or exceeds what one table page can hold
    MaxFiles(u8),
    /// Configuration file could not be read
    Io,
    /// Configuration file could not be parsed
    Parse,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceSize(size) => write!(
                f,
                "device size {} must be a multiple of {} between {} and {} bytes",
                size,
                SECTOR_SIZE,
                2 * SECTOR_SIZE,
                MAX_DEVICE_SIZE
            ),
            Self::MaxFiles(n) => {
                write!(f, "max_files {} must be between 1 and {}", n, MAX_TABLE_ENTRIES)
            }
            Self::Io => write!(f, "failed to read configuration file"),
            Self::Parse => write!(f, "failed to parse configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = FatConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.max_files, 49);
    }

    #[test]
    fn test_rejects_bad_device_size() {
        assert_eq!(
            FatConfig::new(4096).validate(),
            Err(ConfigError::DeviceSize(4096))
        );
        assert_eq!(
            FatConfig::new(10_000).validate(),
            Err(ConfigError::DeviceSize(10_000))
        );
        assert_eq!(
            FatConfig::new(32 * 1024 * 1024).validate(),
            Err(ConfigError::DeviceSize(32 * 1024 * 1024))
        );
        assert_eq!(FatConfig::new(16 * 1024 * 1024).validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_capacity() {
        let config = FatConfig::default().with_max_files(0);
        assert_eq!(config.validate(), Err(ConfigError::MaxFiles(0)));

        let config = FatConfig::default().with_max_files(50);
        assert_eq!(config.validate(), Err(ConfigError::MaxFiles(50)));

        let config = FatConfig::default().with_max_files(3);
        assert_eq!(config.validate(), Ok(()));
    }
}
