//! Device geometry and on-flash layout constants

/// Program granularity in bytes
pub const PAGE_SIZE: usize = 256;

/// Erase granularity in bytes
pub const SECTOR_SIZE: u32 = 4096;

/// Write buffer capacity (two pages)
pub const WRITE_BUFFER_SIZE: usize = 2 * PAGE_SIZE;

/// The erased state of NOR flash (all bits set)
pub const ERASED_VALUE: u8 = 0xFF;

/// Address of the allocation table page
pub const TABLE_ADDR: u32 = 0;

/// First address available to file data. The table owns sector 0.
pub const DATA_START: u32 = TABLE_ADDR + SECTOR_SIZE;

/// Largest device addressable with 16-bit page indices (16 MiB)
pub const MAX_DEVICE_SIZE: u32 = (u16::MAX as u32 + 1) * PAGE_SIZE as u32;

/// Round `addr` down to the start of its sector
#[inline]
pub const fn sector_base(addr: u32) -> u32 {
    addr & !(SECTOR_SIZE - 1)
}

/// Round `addr` up to the next sector boundary (identity when aligned)
#[inline]
pub const fn sector_align_up(addr: u32) -> u32 {
    sector_base(addr + SECTOR_SIZE - 1)
}

/// Round `addr` down to the start of its page
#[inline]
pub const fn page_base(addr: u32) -> u32 {
    addr & !(PAGE_SIZE as u32 - 1)
}

/// Page index of a page-aligned address
#[inline]
pub const fn page_index(addr: u32) -> u16 {
    (addr / PAGE_SIZE as u32) as u16
}
