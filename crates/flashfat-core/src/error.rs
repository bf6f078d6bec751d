//! Error types for flashfat-core
//!
//! This module provides a no_std compatible error type that is shared by the
//! device layer, the allocation table and the file API.

use core::fmt;

use crate::config::ConfigError;

/// Details about a device-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFailure {
    /// Driver initialization failed
    Init,
    /// Page read failed
    Read {
        /// Address of the page being read
        addr: u32,
    },
    /// Page program failed
    Program {
        /// Address of the page being programmed
        addr: u32,
    },
    /// Sector erase failed
    Erase {
        /// Address of the sector being erased
        addr: u32,
    },
    /// Write enable was rejected (or never latched)
    WriteEnable,
    /// Device stayed busy past the configured timeout
    BusyTimeout,
    /// Address lies outside the device
    OutOfBounds {
        /// Offending address
        addr: u32,
    },
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Any driver-level I/O error
    Device(DeviceFailure),
    /// The allocation table already holds the maximum number of files
    CapacityExceeded,
    /// No allocation table magic at the table address
    TableNotFound,
    /// The allocation table magic is present but its contents are invalid
    TableCorrupt,
    /// Operation called in the wrong mode
    InvalidMode,
    /// File index is out of range
    InvalidFileIndex,
    /// The device has no sector left for the requested operation
    NoSpace,
    /// The configuration was rejected
    Config(ConfigError),
}

impl From<DeviceFailure> for Error {
    fn from(failure: DeviceFailure) -> Self {
        Self::Device(failure)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "device initialization failed"),
            Self::Read { addr } => write!(f, "page read failed at address 0x{:08X}", addr),
            Self::Program { addr } => {
                write!(f, "page program failed at address 0x{:08X}", addr)
            }
            Self::Erase { addr } => write!(f, "sector erase failed at address 0x{:08X}", addr),
            Self::WriteEnable => write!(f, "write enable failed"),
            Self::BusyTimeout => write!(f, "device busy timeout"),
            Self::OutOfBounds { addr } => write!(f, "address 0x{:08X} out of bounds", addr),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(failure) => write!(f, "{}", failure),
            Self::CapacityExceeded => write!(f, "maximum file count reached"),
            Self::TableNotFound => write!(f, "file allocation table not found"),
            Self::TableCorrupt => write!(f, "file allocation table is corrupt"),
            Self::InvalidMode => write!(f, "operation not allowed in the current mode"),
            Self::InvalidFileIndex => write!(f, "invalid file index"),
            Self::NoSpace => write!(f, "no space left on device"),
            Self::Config(err) => write!(f, "invalid configuration: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for DeviceFailure {}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_io::ErrorKind;

        match self {
            Self::Device(DeviceFailure::BusyTimeout) => ErrorKind::TimedOut,
            Self::Device(_) => ErrorKind::Other,
            Self::CapacityExceeded | Self::NoSpace => ErrorKind::OutOfMemory,
            Self::TableNotFound | Self::InvalidFileIndex => ErrorKind::NotFound,
            Self::TableCorrupt => ErrorKind::InvalidData,
            Self::InvalidMode | Self::Config(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
