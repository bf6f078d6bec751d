//! Flash image device implementation

use crate::error::{ImageError, Result};
use flashfat_core::config::parse_size;
use flashfat_core::error::DeviceFailure;
use flashfat_core::geometry::{
    page_base, sector_base, ERASED_VALUE, MAX_DEVICE_SIZE, PAGE_SIZE, SECTOR_SIZE,
};
use flashfat_core::PageDevice;
use log::{debug, error, info, warn};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Configuration for opening a flash image
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Path of the image file
    pub path: PathBuf,
    /// Size of a new image; `None` opens an existing file
    pub size: Option<u32>,
}

impl ImageConfig {
    /// Open an existing image
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: None,
        }
    }

    /// Create the image with `size` bytes if it does not exist yet
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }
}

/// NOR flash emulated on top of a host file
///
/// The file holds the raw flash contents. Programming ANDs data into the
/// file, so it can only clear bits; erasing fills a sector with 0xFF.
///
/// # Example
///
/// ```ignore
/// use flashfat_image::ImageFlash;
///
/// let mut flash = ImageFlash::create("flash.bin", 8 * 1024 * 1024)?;
/// let mut page = [0u8; 256];
/// flash.read_page(0, &mut page)?;
/// ```
pub struct ImageFlash {
    /// Image file handle
    file: File,
    path: PathBuf,
    size: u32,
    write_enabled: bool,
}

impl ImageFlash {
    /// Create a fully erased image, replacing any existing file
    pub fn create(path: impl AsRef<Path>, size: u32) -> Result<Self> {
        let path = path.as_ref();
        check_size(size as u64)?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| ImageError::OpenFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        let sector = [ERASED_VALUE; SECTOR_SIZE as usize];
        for offset in (0..size).step_by(SECTOR_SIZE as usize) {
            file.write_all(&sector)
                .map_err(|e| ImageError::WriteFailed {
                    offset,
                    len: sector.len(),
                    source: e,
                })?;
        }
        file.flush()?;

        info!("Created image {} ({} bytes)", path.display(), size);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            size,
            write_enabled: false,
        })
    }

    /// Open an existing image; its size is taken from the file length
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| ImageError::OpenFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        let len = file.metadata()?.len();
        check_size(len)?;

        debug!("Opened image {} ({} bytes)", path.display(), len);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            size: len as u32,
            write_enabled: false,
        })
    }

    /// Open the configured image, creating it when a size is given and the
    /// file does not exist
    pub fn open_with(config: &ImageConfig) -> Result<Self> {
        match config.size {
            Some(size) if !config.path.exists() => Self::create(&config.path, size),
            Some(size) => {
                let flash = Self::open(&config.path)?;
                if flash.size != size {
                    warn!(
                        "Image {} is {} bytes, ignoring requested size {}",
                        config.path.display(),
                        flash.size,
                        size
                    );
                }
                Ok(flash)
            }
            None => Self::open(&config.path),
        }
    }

    /// Path of the image file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Image size in bytes
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Flush file contents to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn read_at(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(offset as u64))
            .and_then(|_| self.file.read_exact(buf))
            .map_err(|e| ImageError::ReadFailed {
                offset,
                len: buf.len(),
                source: e,
            })
    }

    fn write_at(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(offset as u64))
            .and_then(|_| self.file.write_all(data))
            .and_then(|_| self.file.flush())
            .map_err(|e| ImageError::WriteFailed {
                offset,
                len: data.len(),
                source: e,
            })
    }

    fn check_range(&self, addr: u32, len: u32) -> flashfat_core::Result<()> {
        if addr as u64 + len as u64 > self.size as u64 {
            return Err(DeviceFailure::OutOfBounds { addr }.into());
        }
        Ok(())
    }

    fn take_write_enable(&mut self) -> flashfat_core::Result<()> {
        if !self.write_enabled {
            return Err(DeviceFailure::WriteEnable.into());
        }
        self.write_enabled = false;
        Ok(())
    }
}

fn check_size(size: u64) -> Result<()> {
    if size == 0 || size % SECTOR_SIZE as u64 != 0 || size > MAX_DEVICE_SIZE as u64 {
        return Err(ImageError::InvalidSize(size));
    }
    Ok(())
}

impl PageDevice for ImageFlash {
    fn capacity(&self) -> u32 {
        self.size
    }

    fn is_busy(&mut self) -> flashfat_core::Result<bool> {
        // File operations complete before returning
        Ok(false)
    }

    fn delay_us(&mut self, _us: u32) {}

    fn enable_writing(&mut self) -> flashfat_core::Result<()> {
        self.write_enabled = true;
        Ok(())
    }

    fn erase_sector(&mut self, addr: u32) -> flashfat_core::Result<()> {
        let base = sector_base(addr);
        self.check_range(base, SECTOR_SIZE)?;
        self.take_write_enable()?;

        let sector = [ERASED_VALUE; SECTOR_SIZE as usize];
        self.write_at(base, &sector).map_err(|e| {
            error!("{}: {}", self.path.display(), e);
            DeviceFailure::Erase { addr: base }
        })?;
        debug!("image: erased sector 0x{:08X}", base);
        Ok(())
    }

    fn write_page(&mut self, addr: u32, page: &[u8; PAGE_SIZE]) -> flashfat_core::Result<()> {
        let base = page_base(addr);
        self.check_range(base, PAGE_SIZE as u32)?;
        self.take_write_enable()?;

        let mut current = [0u8; PAGE_SIZE];
        let offset = (addr - base) as usize;
        let result = self.read_at(base, &mut current).and_then(|_| {
            for (i, &byte) in page.iter().enumerate() {
                current[(offset + i) % PAGE_SIZE] &= byte;
            }
            self.write_at(base, &current)
        });
        result.map_err(|e| {
            error!("{}: {}", self.path.display(), e);
            DeviceFailure::Program { addr }
        })?;
        Ok(())
    }

    fn read_page(&mut self, addr: u32, page: &mut [u8; PAGE_SIZE]) -> flashfat_core::Result<()> {
        self.check_range(addr, PAGE_SIZE as u32)?;
        self.read_at(addr, page).map_err(|e| {
            error!("{}: {}", self.path.display(), e);
            DeviceFailure::Read { addr }
        })?;
        Ok(())
    }
}

/// Parse image options from key-value pairs
///
/// # Supported options
/// - `path=FILE` - Image file (required)
/// - `size=SIZE` - Create the file with this size if missing, e.g. `8MiB`
///
/// # Example
/// ```ignore
/// let options = &[("path", "flash.bin"), ("size", "8MiB")];
/// let config = parse_options(options)?;
/// ```
pub fn parse_options(options: &[(&str, &str)]) -> Result<ImageConfig> {
    let mut path: Option<PathBuf> = None;
    let mut size: Option<u32> = None;

    for (key, value) in options {
        match *key {
            "path" => path = Some(PathBuf::from(value)),
            "size" => {
                size = Some(parse_size(value).map_err(|message| {
                    ImageError::InvalidParameter {
                        name: "size",
                        message,
                    }
                })?);
            }
            _ => {
                warn!("Unknown image option: {}={}", key, value);
            }
        }
    }

    let path = path.ok_or(ImageError::MissingParameter("path"))?;
    Ok(ImageConfig { path, size })
}
