//! flashfat-dummy - In-memory NOR flash emulator for testing
//!
//! This crate provides a dummy page device that emulates a NOR flash part
//! in memory. Programming can only clear bits, erasing sets a whole sector
//! to 0xFF, and every erase or program needs a fresh write enable. Faults
//! can be injected and every operation is counted, which makes it useful
//! for testing the store without real hardware.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use bitflags::bitflags;
use flashfat_core::error::{DeviceFailure, Result};
use flashfat_core::geometry::{page_base, sector_base, ERASED_VALUE, PAGE_SIZE, SECTOR_SIZE};
use flashfat_core::PageDevice;

bitflags! {
    /// Operations that fail while the flag is set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Faults: u8 {
        /// `init` fails
        const INIT         = 1 << 0;
        /// `read_page` fails
        const READ         = 1 << 1;
        /// `write_page` fails
        const PROGRAM      = 1 << 2;
        /// `erase_sector` fails
        const ERASE        = 1 << 3;
        /// `enable_writing` fails
        const WRITE_ENABLE = 1 << 4;
        /// The device never leaves the busy state
        const STUCK_BUSY   = 1 << 5;
    }
}

/// Configuration for the dummy flash
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Flash size in bytes
    pub size: usize,
    /// Number of busy polls reported after each erase or program
    pub busy_polls: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            // W25Q64FV
            size: 8 * 1024 * 1024,
            busy_polls: 1,
        }
    }
}

/// Operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    /// Page reads
    pub reads: u32,
    /// Page programs
    pub programs: u32,
    /// Sector erases
    pub erases: u32,
    /// Accepted write enables
    pub write_enables: u32,
    /// `is_busy` calls
    pub busy_polls: u32,
    /// Total requested delay
    pub delay_us: u64,
    /// Programmed bytes that needed a 0 -> 1 transition (missing erase)
    pub program_violations: u32,
}

/// Dummy flash device
///
/// Emulates a NOR flash chip in memory for testing purposes.
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    write_enabled: bool,
    busy_remaining: u32,
    faults: Faults,
    stats: DummyStats,
    erase_log: Vec<u32>,
    program_log: Vec<u32>,
}

impl DummyFlash {
    /// Create a new, fully erased dummy flash
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![ERASED_VALUE; config.size];
        Self {
            config,
            data,
            write_enabled: false,
            busy_remaining: 0,
            faults: Faults::empty(),
            stats: DummyStats::default(),
            erase_log: Vec::new(),
            program_log: Vec::new(),
        }
    }

    /// Create a new dummy flash with default configuration (8 MiB)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash of `size` bytes with default timing
    pub fn with_size(size: usize) -> Self {
        Self::new(DummyConfig {
            size,
            ..DummyConfig::default()
        })
    }

    /// Create a dummy flash with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Operation counters
    pub fn stats(&self) -> DummyStats {
        self.stats
    }

    /// Sector addresses erased, in order
    pub fn erase_log(&self) -> &[u32] {
        &self.erase_log
    }

    /// Page addresses programmed, in order
    pub fn program_log(&self) -> &[u32] {
        &self.program_log
    }

    /// Clear counters and logs
    pub fn reset_stats(&mut self) {
        self.stats = DummyStats::default();
        self.erase_log.clear();
        self.program_log.clear();
    }

    /// Currently injected faults
    pub fn faults(&self) -> Faults {
        self.faults
    }

    /// Replace the injected faults
    pub fn set_faults(&mut self, faults: Faults) {
        self.faults = faults;
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<()> {
        if addr as usize + len > self.data.len() {
            return Err(DeviceFailure::OutOfBounds { addr }.into());
        }
        Ok(())
    }

    fn take_write_enable(&mut self) -> Result<()> {
        if !self.write_enabled {
            return Err(DeviceFailure::WriteEnable.into());
        }
        self.write_enabled = false;
        Ok(())
    }
}

impl PageDevice for DummyFlash {
    fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    fn init(&mut self) -> Result<()> {
        if self.faults.contains(Faults::INIT) {
            return Err(DeviceFailure::Init.into());
        }
        self.write_enabled = false;
        Ok(())
    }

    fn is_busy(&mut self) -> Result<bool> {
        self.stats.busy_polls += 1;
        if self.faults.contains(Faults::STUCK_BUSY) {
            return Ok(true);
        }
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn delay_us(&mut self, us: u32) {
        // No delay needed for in-memory operations
        self.stats.delay_us += us as u64;
    }

    fn enable_writing(&mut self) -> Result<()> {
        if self.faults.contains(Faults::WRITE_ENABLE) {
            return Err(DeviceFailure::WriteEnable.into());
        }
        self.write_enabled = true;
        self.stats.write_enables += 1;
        Ok(())
    }

    fn erase_sector(&mut self, addr: u32) -> Result<()> {
        if self.faults.contains(Faults::ERASE) {
            return Err(DeviceFailure::Erase { addr }.into());
        }
        let base = sector_base(addr);
        self.check_range(base, SECTOR_SIZE as usize)?;
        self.take_write_enable()?;

        let start = base as usize;
        self.data[start..start + SECTOR_SIZE as usize].fill(ERASED_VALUE);

        self.stats.erases += 1;
        self.erase_log.push(base);
        self.busy_remaining = self.config.busy_polls;
        log::trace!("dummy: erased sector 0x{:08X}", base);
        Ok(())
    }

    fn write_page(&mut self, addr: u32, page: &[u8; PAGE_SIZE]) -> Result<()> {
        if self.faults.contains(Faults::PROGRAM) {
            return Err(DeviceFailure::Program { addr }.into());
        }
        let base = page_base(addr);
        self.check_range(base, PAGE_SIZE)?;
        self.take_write_enable()?;

        // Like real parts, data past the page end wraps to the page start
        let offset = (addr - base) as usize;
        for (i, &byte) in page.iter().enumerate() {
            let target = base as usize + (offset + i) % PAGE_SIZE;
            let current = self.data[target];
            // Flash programming: can only change 1 -> 0
            if current & byte != byte {
                self.stats.program_violations += 1;
            }
            self.data[target] = current & byte;
        }

        self.stats.programs += 1;
        self.program_log.push(addr);
        self.busy_remaining = self.config.busy_polls;
        Ok(())
    }

    fn read_page(&mut self, addr: u32, page: &mut [u8; PAGE_SIZE]) -> Result<()> {
        if self.faults.contains(Faults::READ) {
            return Err(DeviceFailure::Read { addr }.into());
        }
        self.check_range(addr, PAGE_SIZE)?;

        let start = addr as usize;
        page.copy_from_slice(&self.data[start..start + PAGE_SIZE]);
        self.stats.reads += 1;
        Ok(())
    }
}
