//! Device registration and dispatch
//!
//! A device string names a backend and its options, e.g. `dummy` or
//! `image:path=flash.bin,size=8MiB`. [`open_device`] turns it into an
//! [`AnyDevice`] that can be handed to [`FlashFat`](crate::FlashFat).

use crate::OpenError;
use flashfat_core::config::parse_size;
use flashfat_core::geometry::PAGE_SIZE;
use flashfat_core::PageDevice;
use flashfat_dummy::{DummyConfig, DummyFlash};

/// Information about a device backend
pub struct DeviceInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    devices.push(DeviceInfo {
        name: "dummy",
        aliases: &["mem"],
        description: "In-memory NOR emulator (size=<bytes>,busy_polls=<n>)",
    });

    #[cfg(feature = "image")]
    devices.push(DeviceInfo {
        name: "image",
        aliases: &["file"],
        description: "Flash image file (path=<file>,size=<bytes> to create)",
    });

    devices
}

/// Generate help text listing all available backends
pub fn device_help() -> String {
    let mut help = String::from("Available devices:\n");
    for info in available_devices() {
        help.push_str(&format!("  {:<8} {}\n", info.name, info.description));
    }
    help
}

/// Resolve a backend name or alias to its primary name
pub fn find_device(name: &str) -> Option<&'static str> {
    available_devices()
        .into_iter()
        .find(|info| info.name == name || info.aliases.contains(&name))
        .map(|info| info.name)
}

/// Parse a device string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_device_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Any device backend this crate can open
pub enum AnyDevice {
    /// In-memory emulator
    Dummy(DummyFlash),
    /// Flash image file
    #[cfg(feature = "image")]
    Image(flashfat_image::ImageFlash),
}

macro_rules! dispatch {
    ($self:expr, $dev:ident => $body:expr) => {
        match $self {
            AnyDevice::Dummy($dev) => $body,
            #[cfg(feature = "image")]
            AnyDevice::Image($dev) => $body,
        }
    };
}

impl PageDevice for AnyDevice {
    fn capacity(&self) -> u32 {
        dispatch!(self, d => d.capacity())
    }

    fn init(&mut self) -> flashfat_core::Result<()> {
        dispatch!(self, d => d.init())
    }

    fn is_busy(&mut self) -> flashfat_core::Result<bool> {
        dispatch!(self, d => d.is_busy())
    }

    fn delay_us(&mut self, us: u32) {
        dispatch!(self, d => d.delay_us(us))
    }

    fn enable_writing(&mut self) -> flashfat_core::Result<()> {
        dispatch!(self, d => d.enable_writing())
    }

    fn erase_sector(&mut self, addr: u32) -> flashfat_core::Result<()> {
        dispatch!(self, d => d.erase_sector(addr))
    }

    fn write_page(&mut self, addr: u32, page: &[u8; PAGE_SIZE]) -> flashfat_core::Result<()> {
        dispatch!(self, d => d.write_page(addr, page))
    }

    fn read_page(&mut self, addr: u32, page: &mut [u8; PAGE_SIZE]) -> flashfat_core::Result<()> {
        dispatch!(self, d => d.read_page(addr, page))
    }
}

/// Open the device named by `device_str`
pub fn open_device(device_str: &str) -> Result<AnyDevice, OpenError> {
    let (name, options) = parse_device_string(device_str);

    let canonical_name =
        find_device(name).ok_or_else(|| OpenError::UnknownDevice(name.to_string()))?;

    match canonical_name {
        "dummy" => {
            let config = parse_dummy_options(&options)?;
            log::info!("Opening dummy device ({} bytes)", config.size);
            Ok(AnyDevice::Dummy(DummyFlash::new(config)))
        }

        #[cfg(feature = "image")]
        "image" => {
            let flash = flashfat_image::open_image(&options)?;
            log::info!("Opened image {}", flash.path().display());
            Ok(AnyDevice::Image(flash))
        }

        _ => Err(OpenError::UnknownDevice(name.to_string())),
    }
}

fn parse_dummy_options(options: &[(&str, &str)]) -> Result<DummyConfig, OpenError> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "size" => {
                config.size = parse_size(value)
                    .map_err(|message| OpenError::InvalidParameter {
                        name: "size",
                        message,
                    })? as usize;
            }
            "busy_polls" => {
                config.busy_polls = value.parse().map_err(|_| OpenError::InvalidParameter {
                    name: "busy_polls",
                    message: format!("'{}' is not a valid count", value),
                })?;
            }
            _ => {
                log::warn!("Unknown dummy option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}
