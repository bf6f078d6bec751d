//! flashfat - Append-only file store for NOR flash
//!
//! Host-side entry point. Re-exports the store from `flashfat-core` and
//! adds device selection by name, so the same code can run against the
//! in-memory emulator or a flash image file.
//!
//! # Example
//!
//! ```ignore
//! use flashfat::{mount, FatConfig};
//!
//! let mut fat = mount("image:path=flash.bin,size=8MiB", FatConfig::default())?;
//! fat.new_file()?;
//! fat.write(b"HELLOWORLD")?;
//! fat.close_file()?;
//! ```

pub mod devices;

use std::path::Path;

pub use devices::{open_device, AnyDevice};
pub use flashfat_core::{
    AllocationTable, BusyTiming, ConfigError, DeviceFailure, Error, FatConfig, FileEntry,
    FlashFat, ModeKind, PageDevice,
};
pub use flashfat_dummy as dummy;
#[cfg(feature = "image")]
pub use flashfat_image as image;

/// Errors from opening and mounting a device
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// The device string names no known backend
    #[error("Unknown device: {0}\n\n{help}", help = devices::device_help())]
    UnknownDevice(String),

    /// Invalid device option
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Flash image error
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] flashfat_image::ImageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store error
    #[error("File store error: {0}")]
    Store(#[from] Error),
}

/// Open a device and load its file store
///
/// A device without an allocation table gets a blank one.
pub fn mount(device_str: &str, config: FatConfig) -> Result<FlashFat<AnyDevice>, OpenError> {
    let device = open_device(device_str)?;
    Ok(FlashFat::begin(device, config)?)
}

/// Open a device and write a blank allocation table
pub fn format(device_str: &str, config: FatConfig) -> Result<FlashFat<AnyDevice>, OpenError> {
    let device = open_device(device_str)?;
    Ok(FlashFat::format(device, config)?)
}

/// Load a store configuration, falling back to the defaults
pub fn load_config(path: Option<&Path>) -> Result<FatConfig, OpenError> {
    match path {
        Some(path) => {
            log::debug!("Loading configuration from {}", path.display());
            Ok(FatConfig::from_toml_file(path)?)
        }
        None => Ok(FatConfig::default()),
    }
}
