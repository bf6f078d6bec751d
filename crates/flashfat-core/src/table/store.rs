//! Reading and writing the table page on the device
//!
//! Persisting is erase-then-program of sector 0 and is not power-loss
//! atomic: losing power between the two leaves a blank sector, which the
//! next `begin` treats as "no table" and replaces with an empty one. The
//! file payloads survive, but their directory does not.

use maybe_async::maybe_async;

use super::{codec, AllocationTable};
use crate::config::BusyTiming;
use crate::device::{erase_sector_blocking, program_page_blocking, read_page_blocking, PageDevice};
use crate::error::Result;
use crate::geometry::{PAGE_SIZE, TABLE_ADDR};

/// Read and decode the table page
#[maybe_async]
pub async fn load<D: PageDevice + ?Sized>(
    device: &mut D,
    timing: &BusyTiming,
) -> Result<AllocationTable> {
    let mut page = [0u8; PAGE_SIZE];
    read_page_blocking(device, TABLE_ADDR, &mut page, timing).await?;
    codec::decode(&page)
}

/// Encode the table and rewrite the table sector
#[maybe_async]
pub async fn persist<D: PageDevice + ?Sized>(
    device: &mut D,
    table: &AllocationTable,
    timing: &BusyTiming,
) -> Result<()> {
    let page = codec::encode(table);
    log::debug!(
        "persist table: {} files, open marker 0x{:02X}",
        table.file_count(),
        table.open_file_marker()
    );
    erase_sector_blocking(device, TABLE_ADDR, timing).await?;
    program_page_blocking(device, TABLE_ADDR, &page, timing).await
}
