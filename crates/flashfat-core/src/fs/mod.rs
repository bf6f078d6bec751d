//! Append-only file store
//!
//! [`FlashFat`] owns the device, the cached allocation table and the
//! current session. At most one file is open at a time:
//!
//! ```text
//!          new_file            close_file
//!   Idle ------------> Writing ----------> Idle
//!   Idle ------------> Reading ----------> Idle
//!          open_file           close_file
//! ```
//!
//! Calling an operation in the wrong mode fails with
//! [`Error::InvalidMode`] and has no side effects.

mod io;
mod mode;
mod read;
mod write;

pub use mode::ModeKind;

use maybe_async::maybe_async;

use crate::config::{ConfigError, FatConfig};
use crate::device::{erase_sector_blocking, PageDevice};
use crate::error::{Error, Result};
use crate::geometry::{page_index, SECTOR_SIZE};
use crate::table::{self, AllocationTable, FileEntry};
use mode::Mode;
use read::ReadSession;
use write::WriteSession;

/// Append-only file store on a page device
///
/// # Example
///
/// ```ignore
/// use flashfat_core::{FatConfig, FlashFat};
///
/// let mut fat = FlashFat::begin(device, FatConfig::default())?;
/// fat.new_file()?;
/// fat.write(b"HELLOWORLD")?;
/// fat.close_file()?;
///
/// fat.open_file(0)?;
/// let mut buf = [0u8; 5];
/// assert_eq!(fat.read(&mut buf)?, 5);
/// assert_eq!(fat.peek(), 5);
/// fat.close_file()?;
/// ```
pub struct FlashFat<D: PageDevice> {
    device: D,
    config: FatConfig,
    table: AllocationTable,
    mode: Mode,
    /// Open marker found on the device at startup
    unclosed: Option<u8>,
}

impl<D: PageDevice> FlashFat<D> {
    /// Cached allocation table
    pub fn get_allocation_table(&self) -> &AllocationTable {
        &self.table
    }

    /// Number of stored files
    pub fn file_count(&self) -> usize {
        self.table.file_count()
    }

    /// Length in bytes of the file at `index`
    pub fn file_len(&self, index: usize) -> Option<u32> {
        self.table.get(index).map(FileEntry::len)
    }

    /// Index of the file a previous session left open, if any
    pub fn unclosed_file(&self) -> Option<u8> {
        self.unclosed
    }

    /// Current mode
    pub fn mode(&self) -> ModeKind {
        self.mode.kind()
    }

    /// Index of the open file, if any
    pub fn current_file(&self) -> Option<usize> {
        match &self.mode {
            Mode::Idle => None,
            Mode::Writing(session) => Some(session.file_index()),
            Mode::Reading(session) => Some(session.file_index()),
        }
    }

    /// Bytes accepted so far by the current write session
    pub fn written_len(&self) -> Option<u32> {
        match &self.mode {
            Mode::Writing(session) => Some(session.len()),
            _ => None,
        }
    }

    /// Bytes remaining in the file being read, 0 when not reading
    pub fn peek(&self) -> u32 {
        match &self.mode {
            Mode::Reading(session) => session.remaining(),
            _ => 0,
        }
    }

    /// Store configuration
    pub fn config(&self) -> &FatConfig {
        &self.config
    }

    /// Get a reference to the underlying device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Get a mutable reference to the underlying device
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Release the device, dropping any open session
    pub fn into_device(self) -> D {
        if !self.mode.is_idle() {
            log::warn!("releasing device with a file still open");
        }
        self.device
    }

    fn require_idle(&self) -> Result<()> {
        if self.mode.is_idle() {
            Ok(())
        } else {
            Err(Error::InvalidMode)
        }
    }

    fn check_device(device: &D, config: &FatConfig) -> Result<()> {
        config.validate()?;
        if device.capacity() < config.device_size {
            log::error!(
                "configured size {} exceeds device capacity {}",
                config.device_size,
                device.capacity()
            );
            return Err(ConfigError::DeviceSize(config.device_size).into());
        }
        Ok(())
    }
}

#[maybe_async]
impl<D: PageDevice> FlashFat<D> {
    /// Initialize the device and load its allocation table
    ///
    /// A device without a table (no magic) gets a blank one. A corrupt
    /// table is reported as [`Error::TableCorrupt`]; use
    /// [`format`](Self::format) to start over.
    pub async fn begin(mut device: D, config: FatConfig) -> Result<Self> {
        Self::check_device(&device, &config)?;
        device.init().await?;

        let table = match table::load(&mut device, &config.timing).await {
            Ok(table) => table,
            Err(Error::TableNotFound) => {
                log::info!("no allocation table found, creating one");
                let table = AllocationTable::new();
                table::persist(&mut device, &table, &config.timing).await?;
                table
            }
            Err(e) => return Err(e),
        };

        let unclosed = table.open_file();
        if let Some(index) = unclosed {
            log::warn!("file {} was not closed in the last session", index);
        }
        log::info!("allocation table loaded: {} files", table.file_count());

        Ok(Self {
            device,
            config,
            table,
            mode: Mode::Idle,
            unclosed,
        })
    }

    /// Initialize the device and write a blank allocation table
    pub async fn format(mut device: D, config: FatConfig) -> Result<Self> {
        Self::check_device(&device, &config)?;
        device.init().await?;

        let table = AllocationTable::new();
        table::persist(&mut device, &table, &config.timing).await?;
        log::info!("device formatted");

        Ok(Self {
            device,
            config,
            table,
            mode: Mode::Idle,
            unclosed: None,
        })
    }

    /// Persist `updated` and make it the cached table
    async fn commit(&mut self, updated: AllocationTable) -> Result<()> {
        table::persist(&mut self.device, &updated, &self.config.timing).await?;
        self.table = updated;
        Ok(())
    }

    /// Create a new file and start writing it
    ///
    /// The file gets the first free sector, which is erased, and the table
    /// is persisted with the file marked open before any data is written.
    ///
    /// # Errors
    /// * `InvalidMode` - A file is already open
    /// * `CapacityExceeded` - The table holds `max_files` files
    /// * `NoSpace` - No sector is left after the last file
    pub async fn new_file(&mut self) -> Result<()> {
        self.require_idle()?;
        if self.table.file_count() >= self.config.max_files as usize {
            return Err(Error::CapacityExceeded);
        }

        let start = self.table.next_start_address();
        if start + SECTOR_SIZE > self.config.device_size {
            return Err(Error::NoSpace);
        }

        let mut updated = self.table.clone();
        let index = updated
            .push(FileEntry::new(page_index(start), 0))
            .map_err(|_| Error::CapacityExceeded)?;
        updated.set_open_file(Some(index as u8));

        erase_sector_blocking(&mut self.device, start, &self.config.timing).await?;
        self.commit(updated).await?;

        log::info!("new file {} at 0x{:08X}", index, start);
        self.mode = Mode::Writing(WriteSession::new(index, start));
        Ok(())
    }

    /// Append data to the file being written
    ///
    /// Returns the number of bytes accepted. Data is buffered and the
    /// device is only touched when a full buffer has to make room. If that
    /// fails after part of `data` was accepted, the short count is returned
    /// and the error is reported by the next call. After an error the
    /// session can still be closed, which records what reached the device.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let Mode::Writing(session) = &mut self.mode else {
            return Err(Error::InvalidMode);
        };
        session.write(&mut self.device, &self.config, data).await
    }

    /// Close the open file
    ///
    /// For a write session this programs the buffered tail, records the
    /// final length and clears the open marker. If the table cannot be
    /// persisted the file stays open and `close_file` can be retried.
    /// Closing with no file open is a no-op.
    pub async fn close_file(&mut self) -> Result<()> {
        let (index, entry, flushed) = match &mut self.mode {
            Mode::Idle => {
                log::debug!("close_file with no file open");
                return Ok(());
            }
            Mode::Reading(session) => {
                let index = session.file_index();
                self.mode = Mode::Idle;
                log::debug!("closed file {} after reading", index);
                return Ok(());
            }
            Mode::Writing(session) => {
                let flushed = session.finish(&mut self.device, &self.config).await;
                (session.file_index(), session.entry(), flushed)
            }
        };

        let mut updated = self.table.clone();
        updated.set_last(entry);
        updated.set_open_file(None);
        self.commit(updated).await?;
        self.mode = Mode::Idle;

        log::info!("closed file {}: {} bytes", index, entry.len());
        flushed
    }

    /// Open a stored file for reading
    ///
    /// The table is reloaded from the device first, so a corrupt or missing
    /// table fails here instead of producing garbage reads.
    pub async fn open_file(&mut self, index: usize) -> Result<()> {
        self.require_idle()?;
        self.table = table::load(&mut self.device, &self.config.timing).await?;

        let entry = self.table.get(index).ok_or(Error::InvalidFileIndex)?;
        log::debug!(
            "open file {}: 0x{:08X}..0x{:08X}",
            index,
            entry.start_address(),
            entry.end_address()
        );
        self.mode = Mode::Reading(ReadSession::new(index, entry));
        Ok(())
    }

    /// Read from the open file
    ///
    /// Returns the number of bytes copied, never more than `buf.len()` or
    /// the bytes remaining; 0 at the end of the file.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Mode::Reading(session) = &mut self.mode else {
            return Err(Error::InvalidMode);
        };
        session.read(&mut self.device, &self.config, buf).await
    }

    /// Drop the most recently created file
    ///
    /// Only the table changes; the file's sectors are erased again when a
    /// new file reuses them.
    pub async fn delete_last_file(&mut self) -> Result<()> {
        self.require_idle()?;
        let mut updated = self.table.clone();
        if updated.pop().is_none() {
            return Err(Error::InvalidFileIndex);
        }
        self.commit(updated).await?;
        log::info!("deleted last file, {} remaining", self.table.file_count());
        Ok(())
    }

    /// Drop every file. Only the table changes.
    pub async fn delete_all_files(&mut self) -> Result<()> {
        self.require_idle()?;
        let mut updated = self.table.clone();
        updated.clear();
        self.commit(updated).await?;
        log::info!("deleted all files");
        Ok(())
    }

    /// Write a blank allocation table
    pub async fn create_allocation_table(&mut self) -> Result<()> {
        self.require_idle()?;
        self.commit(AllocationTable::new()).await?;
        log::info!("created blank allocation table");
        Ok(())
    }

    /// Re-read the allocation table from the device into the cache
    pub async fn load_allocation_table(&mut self) -> Result<&AllocationTable> {
        self.require_idle()?;
        self.table = table::load(&mut self.device, &self.config.timing).await?;
        Ok(&self.table)
    }
}
