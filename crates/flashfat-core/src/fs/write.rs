//! Write buffering for an open file
//!
//! Bytes are collected in a two-page buffer. A full buffer is programmed as
//! whole pages once more data arrives or the file is closed. Before that,
//! the sector at the erased frontier is erased if the buffer would not fit
//! below it. Files start on a sector boundary and the buffer is a page
//! multiple, so a flush never straddles two unerased sectors.

use maybe_async::maybe_async;

use crate::config::FatConfig;
use crate::device::{erase_sector_blocking, program_page_blocking, PageDevice};
use crate::error::{Error, Result};
use crate::geometry::{page_index, ERASED_VALUE, PAGE_SIZE, SECTOR_SIZE, WRITE_BUFFER_SIZE};
use crate::table::FileEntry;

const BUFFER_PAGES: usize = WRITE_BUFFER_SIZE / PAGE_SIZE;

/// State of the file being written
pub(crate) struct WriteSession {
    /// Table index of the file
    file_index: usize,
    /// Address of the file's first byte
    start: u32,
    buffer: [[u8; PAGE_SIZE]; BUFFER_PAGES],
    /// Bytes held in `buffer`
    fill: usize,
    /// Bytes of `buffer` already programmed by an interrupted flush
    flushed: usize,
    /// Address of the next unprogrammed byte
    write_offset: u32,
    /// Exclusive end of the region erased during this session
    erased_frontier: u32,
}

impl WriteSession {
    /// Start a session on a freshly erased sector at `start`
    pub(crate) fn new(file_index: usize, start: u32) -> Self {
        Self {
            file_index,
            start,
            buffer: [[ERASED_VALUE; PAGE_SIZE]; BUFFER_PAGES],
            fill: 0,
            flushed: 0,
            write_offset: start,
            erased_frontier: start + SECTOR_SIZE,
        }
    }

    pub(crate) fn file_index(&self) -> usize {
        self.file_index
    }

    /// Bytes accepted so far, buffered ones included
    pub(crate) fn len(&self) -> u32 {
        self.write_offset - self.start + (self.fill - self.flushed) as u32
    }

    /// Entry describing what has reached the device
    pub(crate) fn entry(&self) -> FileEntry {
        FileEntry::new(page_index(self.start), self.write_offset - self.start)
    }

    fn pad_buffer(&mut self) {
        for (i, page) in self.buffer.iter_mut().enumerate() {
            let used = self.fill.saturating_sub(i * PAGE_SIZE).min(PAGE_SIZE);
            page[used..].fill(ERASED_VALUE);
        }
    }
}

#[maybe_async]
impl WriteSession {
    /// Append `data` and return how many bytes were accepted
    ///
    /// A full buffer is programmed before the next byte is copied, so an
    /// error leaves the rejected bytes untouched. When some bytes were
    /// already accepted the count is returned and the error repeats on the
    /// next call, like a short `std::io::Write::write`.
    pub(crate) async fn write<D: PageDevice + ?Sized>(
        &mut self,
        device: &mut D,
        config: &FatConfig,
        data: &[u8],
    ) -> Result<usize> {
        let mut copied = 0;
        while copied < data.len() {
            if self.fill == WRITE_BUFFER_SIZE {
                if let Err(e) = self.flush(device, config).await {
                    return if copied > 0 { Ok(copied) } else { Err(e) };
                }
            }

            let page = self.fill / PAGE_SIZE;
            let offset = self.fill % PAGE_SIZE;
            let take = core::cmp::min(PAGE_SIZE - offset, data.len() - copied);

            self.buffer[page][offset..offset + take].copy_from_slice(&data[copied..copied + take]);
            self.fill += take;
            copied += take;
        }
        Ok(copied)
    }

    /// Program whatever is still buffered
    ///
    /// The tail of the buffer is padded with the erased value; only pages
    /// holding data are programmed.
    pub(crate) async fn finish<D: PageDevice + ?Sized>(
        &mut self,
        device: &mut D,
        config: &FatConfig,
    ) -> Result<()> {
        if self.fill == 0 {
            return Ok(());
        }
        self.pad_buffer();
        self.flush(device, config).await
    }

    async fn flush<D: PageDevice + ?Sized>(
        &mut self,
        device: &mut D,
        config: &FatConfig,
    ) -> Result<()> {
        let len = self.fill;
        let pending = len - self.flushed;

        if self.write_offset + pending as u32 > self.erased_frontier {
            if self.erased_frontier + SECTOR_SIZE > config.device_size {
                log::warn!(
                    "file {} needs sector 0x{:08X} beyond the device",
                    self.file_index,
                    self.erased_frontier
                );
                return Err(Error::NoSpace);
            }
            erase_sector_blocking(device, self.erased_frontier, &config.timing).await?;
            self.erased_frontier += SECTOR_SIZE;
        }

        let pages = len.div_ceil(PAGE_SIZE);
        let first = self.flushed / PAGE_SIZE;
        for (i, page) in self.buffer.iter().enumerate().take(pages).skip(first) {
            program_page_blocking(device, self.write_offset, page, &config.timing).await?;
            let written = core::cmp::min(PAGE_SIZE, len - i * PAGE_SIZE);
            self.write_offset += written as u32;
            self.flushed += written;
        }

        self.fill = 0;
        self.flushed = 0;
        Ok(())
    }
}
