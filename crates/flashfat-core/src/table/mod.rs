//! File allocation table
//!
//! The table is the whole directory of the store: an ordered list of
//! [`FileEntry`] records plus an "open file" marker. It lives in the first
//! page of the device and is rewritten in full on every structural change.

mod codec;
mod store;

pub use codec::{decode, encode, ENTRY_LEN, HEADER_LEN, MAGIC, NO_OPEN_FILE};
pub use store::{load, persist};

use heapless::Vec;

use crate::geometry::{sector_align_up, DATA_START, PAGE_SIZE, SECTOR_SIZE};

/// Number of entries that fit in one table page
pub const MAX_TABLE_ENTRIES: usize = (PAGE_SIZE - HEADER_LEN) / ENTRY_LEN;

/// Metadata for a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileEntry {
    /// Page index where the file begins
    pub start_page: u16,
    /// Number of full pages the file spans
    pub page_length: u16,
    /// Bytes used in the page following the full pages
    pub end_offset: u8,
}

impl FileEntry {
    /// Create an entry describing `len` bytes starting at `start_page`
    pub fn new(start_page: u16, len: u32) -> Self {
        Self {
            start_page,
            page_length: (len / PAGE_SIZE as u32) as u16,
            end_offset: (len % PAGE_SIZE as u32) as u8,
        }
    }

    /// Absolute address of the first byte
    pub fn start_address(&self) -> u32 {
        self.start_page as u32 * PAGE_SIZE as u32
    }

    /// File length in bytes
    pub fn len(&self) -> u32 {
        self.page_length as u32 * PAGE_SIZE as u32 + self.end_offset as u32
    }

    /// Whether the file holds no data
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Absolute address one past the last byte
    pub fn end_address(&self) -> u32 {
        self.start_address() + self.len()
    }
}

/// In-memory copy of the allocation table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllocationTable {
    entries: Vec<FileEntry, MAX_TABLE_ENTRIES>,
    open_file: Option<u8>,
}

impl AllocationTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files
    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no files
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in creation order
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&FileEntry> {
        self.entries.get(index)
    }

    /// Index of the file that was left open, if any
    pub fn open_file(&self) -> Option<u8> {
        self.open_file
    }

    /// Set or clear the open file marker
    pub fn set_open_file(&mut self, index: Option<u8>) {
        self.open_file = index;
    }

    /// Raw marker value as stored on flash
    pub fn open_file_marker(&self) -> u8 {
        self.open_file.unwrap_or(NO_OPEN_FILE)
    }

    /// Append an entry. Returns the entry back if the table is full.
    pub fn push(&mut self, entry: FileEntry) -> Result<usize, FileEntry> {
        self.entries.push(entry)?;
        Ok(self.entries.len() - 1)
    }

    /// Remove and return the last entry
    pub fn pop(&mut self) -> Option<FileEntry> {
        let entry = self.entries.pop()?;
        if self.open_file.map(usize::from) == Some(self.entries.len()) {
            self.open_file = None;
        }
        Some(entry)
    }

    /// Remove every entry and clear the open marker
    pub fn clear(&mut self) {
        self.entries.clear();
        self.open_file = None;
    }

    /// Replace the last entry, used when a write session closes
    pub(crate) fn set_last(&mut self, entry: FileEntry) {
        if let Some(last) = self.entries.last_mut() {
            *last = entry;
        }
    }

    /// Address where the next file would start
    ///
    /// The first file starts right after the table sector. Every following
    /// file starts on the first sector boundary at or after the previous
    /// file's end; an empty file still owns its sector.
    pub fn next_start_address(&self) -> u32 {
        match self.entries.last() {
            None => DATA_START,
            Some(last) => {
                let end = last.end_address().max(last.start_address() + 1);
                sector_align_up(end)
            }
        }
    }

    /// Sectors used by files, table sector excluded
    pub fn used_sectors(&self) -> u32 {
        (self.next_start_address() - DATA_START) / SECTOR_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_fits_one_page() {
        assert_eq!(MAX_TABLE_ENTRIES, 49);
        assert!(HEADER_LEN + MAX_TABLE_ENTRIES * ENTRY_LEN <= PAGE_SIZE);
    }

    #[test]
    fn test_entry_length_accounting() {
        let entry = FileEntry::new(16, 10);
        assert_eq!(entry.page_length, 0);
        assert_eq!(entry.end_offset, 10);
        assert_eq!(entry.start_address(), 4096);
        assert_eq!(entry.end_address(), 4106);

        // Exact page multiples count the last page as full
        let entry = FileEntry::new(16, 512);
        assert_eq!(entry.page_length, 2);
        assert_eq!(entry.end_offset, 0);
        assert_eq!(entry.len(), 512);

        let entry = FileEntry::new(32, 5000);
        assert_eq!(entry.page_length, 19);
        assert_eq!(entry.end_offset, 136);
        assert_eq!(entry.len(), 5000);
    }

    #[test]
    fn test_next_start_address() {
        let mut table = AllocationTable::new();
        assert_eq!(table.next_start_address(), 4096);

        table.push(FileEntry::new(16, 10)).unwrap();
        assert_eq!(table.next_start_address(), 8192);

        // Ends exactly on a sector boundary: no sector is skipped
        table.push(FileEntry::new(32, 4096)).unwrap();
        assert_eq!(table.next_start_address(), 12288);

        // An empty file still owns its sector
        table.push(FileEntry::new(48, 0)).unwrap();
        assert_eq!(table.next_start_address(), 16384);
        assert_eq!(table.used_sectors(), 3);
    }

    #[test]
    fn test_push_until_full() {
        let mut table = AllocationTable::new();
        for i in 0..MAX_TABLE_ENTRIES {
            assert_eq!(table.push(FileEntry::new(16 + i as u16 * 16, 0)), Ok(i));
        }
        let extra = FileEntry::new(1000, 1);
        assert_eq!(table.push(extra), Err(extra));
        assert_eq!(table.file_count(), MAX_TABLE_ENTRIES);
    }

    #[test]
    fn test_pop_clears_matching_marker() {
        let mut table = AllocationTable::new();
        table.push(FileEntry::new(16, 1)).unwrap();
        table.push(FileEntry::new(32, 1)).unwrap();
        table.set_open_file(Some(1));
        assert_eq!(table.open_file_marker(), 1);

        table.pop();
        assert_eq!(table.open_file(), None);
        assert_eq!(table.open_file_marker(), NO_OPEN_FILE);
        assert_eq!(table.file_count(), 1);
    }
}
