//! `embedded-io` adapters
//!
//! Lets the open file be used wherever an `embedded_io` reader or writer is
//! expected. `write` may accept less than the whole buffer when the device
//! fails part way; `flush` is a no-op because data only reaches the device
//! on a full buffer or on close.

use super::FlashFat;
use crate::device::PageDevice;
use crate::error::Error;

impl<D: PageDevice> embedded_io::ErrorType for FlashFat<D> {
    type Error = Error;
}

#[cfg(feature = "is_sync")]
impl<D: PageDevice> embedded_io::Read for FlashFat<D> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        FlashFat::read(self, buf)
    }
}

#[cfg(feature = "is_sync")]
impl<D: PageDevice> embedded_io::Write for FlashFat<D> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        FlashFat::write(self, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(not(feature = "is_sync"))]
impl<D: PageDevice> embedded_io_async::Read for FlashFat<D> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        FlashFat::read(self, buf).await
    }
}

#[cfg(not(feature = "is_sync"))]
impl<D: PageDevice> embedded_io_async::Write for FlashFat<D> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        FlashFat::write(self, buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
