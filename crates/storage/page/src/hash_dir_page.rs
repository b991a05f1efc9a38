//! `HashDirPage`: a `HFPage` whose body is a flat array of `MAX_ENTRIES`
//! bucket-chain head `PageId`s, one per directory slot. Unlike `DirPage`,
//! every slot in the array is always addressable - there is no entry
//! count, just `MAX_ENTRIES` fixed positions initialized to the
//! `INVALID_PAGEID` sentinel.

use crate::errors::PageError;
use crate::header::HEADER_SIZE;
use crate::hfpage::{HFPage, PAGE_SIZE};
use crate::page_id::{PageId, INVALID_PAGEID};
use binary_helpers::{read_le, write_le};

const SLOT_SIZE: usize = 4;

/// Maximum number of directory slots a single `HashDirPage` can hold.
pub const MAX_ENTRIES: usize = (PAGE_SIZE - HEADER_SIZE) / SLOT_SIZE;

fn slot_offset(index: usize) -> usize {
    HEADER_SIZE + index * SLOT_SIZE
}

/// `HashDirPage` operations on the shared `HFPage` buffer.
pub trait HashDirPageExt {
    /// Writes `INVALID_PAGEID` into every slot. Must be called once right
    /// after `init(.., PageType::HashDirPage)`, since a zeroed body would
    /// otherwise decode slot `0` as the (invalid) page id `0`.
    fn init_hash_dir_slots(&mut self) -> Result<(), PageError>;
    fn hash_dir_slot(&self, index: u32) -> Result<Option<PageId>, PageError>;
    fn set_hash_dir_slot(&mut self, index: u32, value: Option<PageId>) -> Result<(), PageError>;
}

impl HashDirPageExt for HFPage {
    fn init_hash_dir_slots(&mut self) -> Result<(), PageError> {
        for index in 0..MAX_ENTRIES as u32 {
            self.set_hash_dir_slot(index, None)?;
        }
        Ok(())
    }

    fn hash_dir_slot(&self, index: u32) -> Result<Option<PageId>, PageError> {
        let raw = read_le::<u32>(self.data(), slot_offset(index as usize))? as i32;
        Ok(PageId::from_raw(raw))
    }

    fn set_hash_dir_slot(&mut self, index: u32, value: Option<PageId>) -> Result<(), PageError> {
        let raw = value.map_or(INVALID_PAGEID, |id| id.raw());
        write_le::<u32>(self.data_mut(), slot_offset(index as usize), raw as u32)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_type::PageType;

    #[test]
    fn fresh_directory_reads_all_slots_as_invalid() {
        let mut page = HFPage::new_zeroed();
        page.init(PageId::new(1), PageType::HashDirPage).unwrap();
        page.init_hash_dir_slots().unwrap();
        for i in 0..MAX_ENTRIES as u32 {
            assert_eq!(page.hash_dir_slot(i).unwrap(), None);
        }
    }

    #[test]
    fn set_and_read_back_a_slot() {
        let mut page = HFPage::new_zeroed();
        page.init(PageId::new(1), PageType::HashDirPage).unwrap();
        page.init_hash_dir_slots().unwrap();
        page.set_hash_dir_slot(42, Some(PageId::new(7))).unwrap();
        assert_eq!(page.hash_dir_slot(42).unwrap(), Some(PageId::new(7)));
        assert_eq!(page.hash_dir_slot(41).unwrap(), None);
    }
}
