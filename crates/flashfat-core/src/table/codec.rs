//! Allocation table page codec
//!
//! Page layout:
//!
//! | offset  | size | field                          |
//! |---------|------|--------------------------------|
//! | 0       | 8    | magic `FLASHFAT`               |
//! | 8       | 1    | file count                     |
//! | 9       | 1    | open file marker (0xFF = none) |
//! | 10 + 5i | 2    | entry start page (BE)          |
//! | 12 + 5i | 2    | entry page length (BE)         |
//! | 14 + 5i | 1    | entry end offset               |
//!
//! Unused trailing bytes are zero.

use zerocopy::byteorder::{BigEndian, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{AllocationTable, FileEntry, MAX_TABLE_ENTRIES};
use crate::error::{Error, Result};
use crate::geometry::PAGE_SIZE;

/// Table signature at the start of the device
pub const MAGIC: [u8; 8] = *b"FLASHFAT";

/// Marker value meaning no file was left open
pub const NO_OPEN_FILE: u8 = 0xFF;

/// Size of the table header
pub const HEADER_LEN: usize = core::mem::size_of::<RawHeader>();

/// Size of one encoded entry
pub const ENTRY_LEN: usize = core::mem::size_of::<RawEntry>();

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct RawHeader {
    magic: [u8; 8],
    file_count: u8,
    open_file: u8,
}

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct RawEntry {
    start_page: U16<BigEndian>,
    page_length: U16<BigEndian>,
    end_offset: u8,
}

const _: () = assert!(HEADER_LEN == 10);
const _: () = assert!(ENTRY_LEN == 5);

impl From<&FileEntry> for RawEntry {
    fn from(entry: &FileEntry) -> Self {
        Self {
            start_page: U16::new(entry.start_page),
            page_length: U16::new(entry.page_length),
            end_offset: entry.end_offset,
        }
    }
}

impl From<&RawEntry> for FileEntry {
    fn from(raw: &RawEntry) -> Self {
        Self {
            start_page: raw.start_page.get(),
            page_length: raw.page_length.get(),
            end_offset: raw.end_offset,
        }
    }
}

/// Decode a table page
///
/// # Errors
/// * `TableNotFound` - The magic is missing (blank or foreign device)
/// * `TableCorrupt` - The file count does not fit in one page
pub fn decode(page: &[u8; PAGE_SIZE]) -> Result<AllocationTable> {
    let header = RawHeader::read_from_bytes(&page[..HEADER_LEN]).map_err(|_| Error::TableCorrupt)?;
    if header.magic != MAGIC {
        return Err(Error::TableNotFound);
    }

    let count = header.file_count as usize;
    if count > MAX_TABLE_ENTRIES {
        log::warn!("table claims {} files, at most {} fit", count, MAX_TABLE_ENTRIES);
        return Err(Error::TableCorrupt);
    }

    let mut table = AllocationTable::new();
    for chunk in page[HEADER_LEN..].chunks_exact(ENTRY_LEN).take(count) {
        let raw = RawEntry::read_from_bytes(chunk).map_err(|_| Error::TableCorrupt)?;
        table
            .push(FileEntry::from(&raw))
            .map_err(|_| Error::TableCorrupt)?;
    }

    table.set_open_file(match header.open_file {
        NO_OPEN_FILE => None,
        index if (index as usize) < count => Some(index),
        index => {
            log::warn!("open file marker {} points past {} files, ignoring", index, count);
            None
        }
    });

    Ok(table)
}

/// Encode a table into a zero-filled page
pub fn encode(table: &AllocationTable) -> [u8; PAGE_SIZE] {
    let mut page = [0u8; PAGE_SIZE];

    let header = RawHeader {
        magic: MAGIC,
        file_count: table.file_count() as u8,
        open_file: table.open_file_marker(),
    };
    page[..HEADER_LEN].copy_from_slice(header.as_bytes());

    for (entry, slot) in table
        .entries()
        .iter()
        .zip(page[HEADER_LEN..].chunks_exact_mut(ENTRY_LEN))
    {
        slot.copy_from_slice(RawEntry::from(entry).as_bytes());
    }

    page
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table(count: usize) -> AllocationTable {
        let mut table = AllocationTable::new();
        let mut start = 16u16;
        for i in 0..count {
            let entry = FileEntry::new(start, (i as u32 * 997) % 9000);
            table.push(entry).unwrap();
            start = (table.next_start_address() / PAGE_SIZE as u32) as u16;
        }
        table
    }

    #[test]
    fn test_blank_device_has_no_table() {
        assert_eq!(decode(&[0xFF; PAGE_SIZE]), Err(Error::TableNotFound));
        assert_eq!(decode(&[0x00; PAGE_SIZE]), Err(Error::TableNotFound));
    }

    #[test]
    fn test_empty_table_layout() {
        let page = encode(&AllocationTable::new());
        assert_eq!(&page[..8], b"FLASHFAT");
        assert_eq!(page[8], 0);
        assert_eq!(page[9], NO_OPEN_FILE);
        assert!(page[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_entry_layout_is_big_endian() {
        let mut table = AllocationTable::new();
        table
            .push(FileEntry {
                start_page: 0x0110,
                page_length: 0x0203,
                end_offset: 0x2A,
            })
            .unwrap();
        table.set_open_file(Some(0));

        let page = encode(&table);
        assert_eq!(page[8], 1);
        assert_eq!(page[9], 0);
        assert_eq!(&page[10..15], &[0x01, 0x10, 0x02, 0x03, 0x2A]);
        assert!(page[15..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_round_trip_all_sizes() {
        for count in [0, 1, 2, 17, MAX_TABLE_ENTRIES] {
            let mut table = sample_table(count);
            if count > 0 {
                table.set_open_file(Some((count - 1) as u8));
            }
            assert_eq!(decode(&encode(&table)), Ok(table));
        }
    }

    #[test]
    fn test_full_table_fits_page() {
        let page = encode(&sample_table(MAX_TABLE_ENTRIES));
        assert_eq!(page[8] as usize, MAX_TABLE_ENTRIES);
        // 10 + 49 * 5 = 255, last byte stays zero
        assert_eq!(page[PAGE_SIZE - 1], 0);
    }

    #[test]
    fn test_stale_open_marker_is_dropped() {
        let mut table = sample_table(2);
        table.set_open_file(Some(1));
        let mut page = encode(&table);

        page[9] = 2;
        let decoded = decode(&page).unwrap();
        assert_eq!(decoded.open_file(), None);
        assert_eq!(decoded.file_count(), 2);

        page[8] = 0;
        assert_eq!(decode(&page).unwrap().open_file(), None);
    }

    #[test]
    fn test_oversized_count_is_corrupt() {
        let mut page = encode(&AllocationTable::new());
        page[8] = 254;
        assert_eq!(decode(&page), Err(Error::TableCorrupt));
    }
}
