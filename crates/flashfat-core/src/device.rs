//! Page device capability trait
//!
//! This module provides the `PageDevice` trait, the small capability set the
//! store needs from a NOR flash driver, together with the blocking command
//! sequences built on top of it.
//!
//! Uses `maybe_async` to support both sync and async modes:
//! - With `is_sync` feature: blocking/synchronous
//! - Without `is_sync` feature: async (for Embassy, tokio)

use crate::config::BusyTiming;
use crate::error::{DeviceFailure, Result};
use crate::geometry::PAGE_SIZE;
use maybe_async::maybe_async;

/// A page-programmable, sector-erasable flash device
///
/// Addresses are absolute byte addresses. Implementations report failures
/// as [`Error::Device`](crate::Error::Device).
///
/// # Example
///
/// ```ignore
/// use flashfat_core::device::PageDevice;
///
/// fn first_page<D: PageDevice>(device: &mut D) -> flashfat_core::Result<[u8; 256]> {
///     let mut page = [0u8; 256];
///     device.read_page(0, &mut page)?;
///     Ok(page)
/// }
/// ```
#[maybe_async(AFIT)]
pub trait PageDevice {
    /// Total device size in bytes
    fn capacity(&self) -> u32;

    /// Bring up the driver (reset, release power-down)
    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Whether an erase or program is still in progress
    async fn is_busy(&mut self) -> Result<bool>;

    /// Delay for the specified number of microseconds
    async fn delay_us(&mut self, us: u32);

    /// Latch write enable for the next erase or program
    async fn enable_writing(&mut self) -> Result<()>;

    /// Erase the 4096-byte sector containing `addr` to 0xFF
    async fn erase_sector(&mut self, addr: u32) -> Result<()>;

    /// Program one page at `addr`
    async fn write_page(&mut self, addr: u32, page: &[u8; PAGE_SIZE]) -> Result<()>;

    /// Read one page starting at `addr`
    async fn read_page(&mut self, addr: u32, page: &mut [u8; PAGE_SIZE]) -> Result<()>;
}

/// Wait for the device to finish its current operation
///
/// Polls `is_busy` with `poll_delay_us` between polls and gives up with
/// `DeviceFailure::BusyTimeout` once `timeout_us` has elapsed.
#[maybe_async]
pub async fn wait_until_free<D: PageDevice + ?Sized>(
    device: &mut D,
    poll_delay_us: u32,
    timeout_us: u32,
) -> Result<()> {
    let max_polls = if poll_delay_us > 0 {
        timeout_us / poll_delay_us
    } else {
        timeout_us
    };

    // Always poll at least once so a zero timeout still sees an idle device
    for _ in 0..max_polls.max(1) {
        if !device.is_busy().await? {
            return Ok(());
        }
        if poll_delay_us > 0 {
            device.delay_us(poll_delay_us).await;
        }
    }

    log::warn!("device still busy after {}us", timeout_us);
    Err(DeviceFailure::BusyTimeout.into())
}

/// Erase one sector and wait for completion
#[maybe_async]
pub async fn erase_sector_blocking<D: PageDevice + ?Sized>(
    device: &mut D,
    addr: u32,
    timing: &BusyTiming,
) -> Result<()> {
    log::debug!("erase sector 0x{:08X}", addr);
    wait_until_free(device, timing.erase_poll_us, timing.erase_timeout_us).await?;
    device.enable_writing().await?;
    device.erase_sector(addr).await?;
    wait_until_free(device, timing.erase_poll_us, timing.erase_timeout_us).await
}

/// Program one page and wait for completion
#[maybe_async]
pub async fn program_page_blocking<D: PageDevice + ?Sized>(
    device: &mut D,
    addr: u32,
    page: &[u8; PAGE_SIZE],
    timing: &BusyTiming,
) -> Result<()> {
    log::trace!("program page 0x{:08X}", addr);
    wait_until_free(device, timing.program_poll_us, timing.program_timeout_us).await?;
    device.enable_writing().await?;
    device.write_page(addr, page).await?;
    wait_until_free(device, timing.program_poll_us, timing.program_timeout_us).await
}

/// Read one page once the device is idle
#[maybe_async]
pub async fn read_page_blocking<D: PageDevice + ?Sized>(
    device: &mut D,
    addr: u32,
    page: &mut [u8; PAGE_SIZE],
    timing: &BusyTiming,
) -> Result<()> {
    wait_until_free(device, timing.program_poll_us, timing.program_timeout_us).await?;
    device.read_page(addr, page).await
}
