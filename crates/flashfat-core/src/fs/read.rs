//! Sequential read cursor for an open file

use maybe_async::maybe_async;

use crate::config::FatConfig;
use crate::device::{wait_until_free, PageDevice};
use crate::error::Result;
use crate::geometry::{page_base, PAGE_SIZE};
use crate::table::FileEntry;

/// State of the file being read
pub(crate) struct ReadSession {
    file_index: usize,
    /// Absolute address of the next byte to return
    position: u32,
    /// Absolute address one past the file's last byte
    end: u32,
}

impl ReadSession {
    pub(crate) fn new(file_index: usize, entry: &FileEntry) -> Self {
        Self {
            file_index,
            position: entry.start_address(),
            end: entry.end_address(),
        }
    }

    pub(crate) fn file_index(&self) -> usize {
        self.file_index
    }

    /// Bytes left until the end of the file
    pub(crate) fn remaining(&self) -> u32 {
        self.end - self.position
    }
}

#[maybe_async]
impl ReadSession {
    /// Copy up to `buf.len()` bytes, clamped to what remains
    ///
    /// Pages are read whole from their page boundary, so the cursor may sit
    /// anywhere inside a page between calls.
    pub(crate) async fn read<D: PageDevice + ?Sized>(
        &mut self,
        device: &mut D,
        config: &FatConfig,
        buf: &mut [u8],
    ) -> Result<usize> {
        let wanted = core::cmp::min(buf.len(), self.remaining() as usize);
        if wanted == 0 {
            return Ok(0);
        }

        let timing = &config.timing;
        wait_until_free(device, timing.program_poll_us, timing.program_timeout_us).await?;

        let mut page = [0u8; PAGE_SIZE];
        let mut copied = 0;
        while copied < wanted {
            let base = page_base(self.position);
            let offset = (self.position - base) as usize;
            device.read_page(base, &mut page).await?;

            let chunk = core::cmp::min(PAGE_SIZE - offset, wanted - copied);
            buf[copied..copied + chunk].copy_from_slice(&page[offset..offset + chunk]);
            copied += chunk;
            self.position += chunk as u32;
        }

        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_bounds() {
        let entry = FileEntry::new(16, 10);
        let session = ReadSession::new(3, &entry);
        assert_eq!(session.file_index(), 3);
        assert_eq!(session.position, 4096);
        assert_eq!(session.end, 4106);
        assert_eq!(session.remaining(), 10);
    }

    #[test]
    fn test_empty_file_has_nothing_remaining() {
        let session = ReadSession::new(0, &FileEntry::new(32, 0));
        assert_eq!(session.remaining(), 0);
    }
}
