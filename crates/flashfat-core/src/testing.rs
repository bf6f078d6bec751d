//! RAM-backed page device for unit tests

use maybe_async::maybe_async;

use crate::device::PageDevice;
use crate::error::{DeviceFailure, Result};
use crate::geometry::{page_base, sector_base, ERASED_VALUE, PAGE_SIZE, SECTOR_SIZE};

/// NOR behaviour only: AND on program, 0xFF on erase, one-shot write enable
pub(crate) struct RamFlash {
    pub data: Vec<u8>,
    /// Sector addresses erased, in order
    pub erases: Vec<u32>,
    /// Programmed bytes that needed a 0 -> 1 transition
    pub violations: u32,
    pub fail_erase: bool,
    pub fail_program: bool,
    write_enabled: bool,
}

impl RamFlash {
    pub fn new(size: u32) -> Self {
        Self {
            data: vec![ERASED_VALUE; size as usize],
            erases: Vec::new(),
            violations: 0,
            fail_erase: false,
            fail_program: false,
            write_enabled: false,
        }
    }

    fn take_write_enable(&mut self) -> Result<()> {
        if !core::mem::take(&mut self.write_enabled) {
            return Err(DeviceFailure::WriteEnable.into());
        }
        Ok(())
    }
}

#[maybe_async(AFIT)]
impl PageDevice for RamFlash {
    fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    async fn is_busy(&mut self) -> Result<bool> {
        Ok(false)
    }

    async fn delay_us(&mut self, _us: u32) {}

    async fn enable_writing(&mut self) -> Result<()> {
        self.write_enabled = true;
        Ok(())
    }

    async fn erase_sector(&mut self, addr: u32) -> Result<()> {
        let base = sector_base(addr);
        if self.fail_erase {
            return Err(DeviceFailure::Erase { addr: base }.into());
        }
        self.take_write_enable()?;

        let start = base as usize;
        self.data[start..start + SECTOR_SIZE as usize].fill(ERASED_VALUE);
        self.erases.push(base);
        Ok(())
    }

    async fn write_page(&mut self, addr: u32, page: &[u8; PAGE_SIZE]) -> Result<()> {
        if self.fail_program {
            return Err(DeviceFailure::Program { addr }.into());
        }
        self.take_write_enable()?;

        let start = page_base(addr) as usize;
        for (current, &byte) in self.data[start..start + PAGE_SIZE].iter_mut().zip(page) {
            if *current & byte != byte {
                self.violations += 1;
            }
            *current &= byte;
        }
        Ok(())
    }

    async fn read_page(&mut self, addr: u32, page: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let start = addr as usize;
        page.copy_from_slice(&self.data[start..start + PAGE_SIZE]);
        Ok(())
    }
}
