//! flashfat-image - File-backed flash image device
//!
//! This crate provides a [`PageDevice`](flashfat_core::PageDevice) backed by
//! a regular file holding a raw flash image. It behaves like a NOR part:
//! programming can only clear bits and erasing sets a sector to 0xFF.
//! This makes it possible to build, inspect and test flash images on a
//! host before writing them to a real chip.
//!
//! # Example
//!
//! ```ignore
//! use flashfat_core::{FatConfig, FlashFat};
//! use flashfat_image::ImageFlash;
//!
//! let flash = ImageFlash::create("flash.bin", 8 * 1024 * 1024)?;
//! let mut fat = FlashFat::begin(flash, FatConfig::default())?;
//! fat.new_file()?;
//! fat.write(b"HELLOWORLD")?;
//! fat.close_file()?;
//! ```

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, ImageConfig, ImageFlash};
pub use error::{ImageError, Result};

/// Open an image from key-value options
///
/// # Example Options
///
/// - `path=flash.bin` - Required: image file
/// - `size=8MiB` - Create the image with this size if it is missing
pub fn open_image(options: &[(&str, &str)]) -> Result<ImageFlash> {
    let config = parse_options(options)?;
    ImageFlash::open_with(&config)
}
