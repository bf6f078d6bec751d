//! flashfat-core - Append-only file store for NOR flash
//!
//! This crate stores sequential, write-once files on a flash part that
//! erases in 4096-byte sectors and programs in 256-byte pages. A small
//! allocation table in the first page of the device records where each file
//! starts and how long it is. It is designed to be `no_std` compatible for
//! use on microcontrollers.
//!
//! # Features
//!
//! - `std` - Enable standard library support and TOML configuration files
//! - `alloc` - Enable heap allocation
//! - `is_sync` - Compile the device trait and the store as blocking code
//!
//! # Example
//!
//! ```ignore
//! use flashfat_core::{FatConfig, FlashFat, PageDevice};
//!
//! fn log_record<D: PageDevice>(device: D, record: &[u8]) -> flashfat_core::Result<D> {
//!     let mut fat = FlashFat::begin(device, FatConfig::default())?;
//!     fat.new_file()?;
//!     fat.write(record)?;
//!     fat.close_file()?;
//!     Ok(fat.into_device())
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
// Allow async fn in traits - we use maybe-async for dual sync/async support
#![allow(async_fn_in_trait)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod config;
pub mod device;
pub mod error;
pub mod fs;
pub mod geometry;
pub mod table;

#[cfg(test)]
mod testing;

pub use config::{BusyTiming, ConfigError, FatConfig};
pub use device::PageDevice;
pub use error::{DeviceFailure, Error, Result};
pub use fs::{FlashFat, ModeKind};
pub use table::{AllocationTable, FileEntry};
