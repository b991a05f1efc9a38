//! `DirPage`: a `HFPage` whose body is a flat array of fixed-size
//! directory entries, one per data page reachable from a `HeapFile`'s
//! directory chain. Entries are packed at indices `0..entry_count`; the
//! `slot_count` header field is reused to mean "number of defined
//! entries" rather than a slotted-heap slot count, since this page kind
//! never uses the slot-directory/record-heap mechanism.

use crate::errors::PageError;
use crate::header::HEADER_SIZE;
use crate::hfpage::{HFPage, PAGE_SIZE};
use crate::page_id::PageId;
use binary_helpers::{read_le, write_le};

const ENTRY_SIZE: usize = 8;

/// Maximum number of directory entries a single `DirPage` can hold.
pub const MAX_ENTRIES: usize = (PAGE_SIZE - HEADER_SIZE) / ENTRY_SIZE;

/// One directory entry: the data page it describes, how many live records
/// it holds, and how many bytes of it are free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub data_page_id: PageId,
    pub record_count: u16,
    pub free_count: u16,
}

fn entry_offset(index: usize) -> usize {
    HEADER_SIZE + index * ENTRY_SIZE
}

/// `DirPage` operations on the shared `HFPage` buffer.
pub trait DirPageExt {
    fn entry_count(&self) -> Result<u16, PageError>;
    fn set_entry_count(&mut self, count: u16) -> Result<(), PageError>;
    fn dir_entry(&self, index: u16) -> Result<DirEntry, PageError>;
    fn set_dir_entry(&mut self, index: u16, entry: DirEntry) -> Result<(), PageError>;
    fn push_dir_entry(&mut self, entry: DirEntry) -> Result<u16, PageError>;
    /// Removes the entry at `index`, shifting later entries down by one
    /// and decrementing `entry_count`. Returns the entry count *before*
    /// removal, which callers use to decide whether the page became
    /// empty and should be spliced out of the chain.
    fn remove_dir_entry(&mut self, index: u16) -> Result<u16, PageError>;
}

impl DirPageExt for HFPage {
    fn entry_count(&self) -> Result<u16, PageError> {
        self.slot_count()
    }

    fn set_entry_count(&mut self, count: u16) -> Result<(), PageError> {
        self.set_slot_count(count)
    }

    fn dir_entry(&self, index: u16) -> Result<DirEntry, PageError> {
        let offset = entry_offset(index as usize);
        let data_page_id = read_le::<u32>(self.data(), offset)? as i32;
        let record_count = read_le::<u16>(self.data(), offset + 4)?;
        let free_count = read_le::<u16>(self.data(), offset + 6)?;
        Ok(DirEntry {
            data_page_id: PageId::new(data_page_id),
            record_count,
            free_count,
        })
    }

    fn set_dir_entry(&mut self, index: u16, entry: DirEntry) -> Result<(), PageError> {
        let offset = entry_offset(index as usize);
        write_le::<u32>(self.data_mut(), offset, entry.data_page_id.raw() as u32)?;
        write_le::<u16>(self.data_mut(), offset + 4, entry.record_count)?;
        write_le::<u16>(self.data_mut(), offset + 6, entry.free_count)?;
        Ok(())
    }

    fn push_dir_entry(&mut self, entry: DirEntry) -> Result<u16, PageError> {
        let count = self.entry_count()?;
        debug_assert!((count as usize) < MAX_ENTRIES, "DirPage is full");
        self.set_dir_entry(count, entry)?;
        self.set_entry_count(count + 1)?;
        Ok(count)
    }

    fn remove_dir_entry(&mut self, index: u16) -> Result<u16, PageError> {
        let count = self.entry_count()?;
        for i in index..count - 1 {
            let moved = self.dir_entry(i + 1)?;
            self.set_dir_entry(i, moved)?;
        }
        self.set_entry_count(count - 1)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_type::PageType;

    fn fresh(page_id: i32) -> HFPage {
        let mut page = HFPage::new_zeroed();
        page.init(PageId::new(page_id), PageType::DirPage).unwrap();
        page
    }

    #[test]
    fn push_and_read_entries() {
        let mut page = fresh(1);
        let idx = page
            .push_dir_entry(DirEntry {
                data_page_id: PageId::new(9),
                record_count: 3,
                free_count: 500,
            })
            .unwrap();
        assert_eq!(idx, 0);
        assert_eq!(page.entry_count().unwrap(), 1);
        let entry = page.dir_entry(0).unwrap();
        assert_eq!(entry.data_page_id, PageId::new(9));
        assert_eq!(entry.record_count, 3);
        assert_eq!(entry.free_count, 500);
    }

    #[test]
    fn remove_entry_shifts_later_ones_down() {
        let mut page = fresh(1);
        for i in 0..3u16 {
            page.push_dir_entry(DirEntry {
                data_page_id: PageId::new(100 + i as i32),
                record_count: i,
                free_count: 0,
            })
            .unwrap();
        }
        let old_count = page.remove_dir_entry(0).unwrap();
        assert_eq!(old_count, 3);
        assert_eq!(page.entry_count().unwrap(), 2);
        assert_eq!(page.dir_entry(0).unwrap().data_page_id, PageId::new(101));
        assert_eq!(page.dir_entry(1).unwrap().data_page_id, PageId::new(102));
    }
}
