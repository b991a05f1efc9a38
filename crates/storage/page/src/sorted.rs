//! `SortedPage`: a `HFPage` extension used by `HashBucketPage`s. Entries
//! are kept packed at indices `0..entry_count` in ascending key order, with
//! no empty slots in between; `insert_entry`/`delete_entry` rebuild the
//! whole body from the resulting logical list rather than shifting slot
//! entries in place, which keeps the `frontier` invariant trivially true
//! and the implementation simple for the small entry counts a bucket page
//! actually holds.

use crate::errors::PageError;
use crate::hfpage::{HFPage, BODY_LEN, MAX_RECORD_SIZE, PAGE_SIZE};
use crate::page_id::Rid;
use crate::search_key::{DataEntry, SearchKey};
use crate::slot::SLOT_SIZE;

/// Largest encoded entry `insert_entry` will accept.
pub const MAX_ENTRY_SIZE: usize = MAX_RECORD_SIZE;

/// `SortedPage` operations on the shared `HFPage` buffer.
pub trait SortedPageExt {
    fn entry_count(&self) -> Result<u16, PageError>;
    fn entry_at(&self, index: u16) -> Result<DataEntry, PageError>;
    fn all_entries(&self) -> Result<Vec<DataEntry>, PageError>;
    /// Inserts `entry`, keeping entries sorted by key. Fails with
    /// `SpaceExhausted` (without mutating the page) if the resulting set
    /// of entries would not fit.
    fn insert_entry(&mut self, entry: &DataEntry) -> Result<(), PageError>;
    /// Removes the entry matching `key` and `rid`. Returns `true` if an
    /// entry was found and removed, `false` if this page holds no such
    /// entry (the caller should keep searching the overflow chain).
    fn delete_entry(&mut self, key: &SearchKey, rid: Rid) -> Result<bool, PageError>;
    /// Scans forward from `from_slot` (exclusive) for the next entry
    /// matching `key`, stopping early once a strictly greater key is
    /// seen. Returns the matching slot index, if any.
    fn next_entry(&self, key: &SearchKey, from_slot: u16) -> Result<Option<u16>, PageError>;
}

impl SortedPageExt for HFPage {
    fn entry_count(&self) -> Result<u16, PageError> {
        self.slot_count()
    }

    fn entry_at(&self, index: u16) -> Result<DataEntry, PageError> {
        let (offset, length) = self.read_slot(index)?;
        let bytes = &self.data()[offset as usize..offset as usize + length as usize];
        DataEntry::decode(bytes).ok_or(PageError::InvalidRid {
            rid: Rid::new(self.page_id()?, index + 1),
            slot_count: self.entry_count()?,
        })
    }

    fn all_entries(&self) -> Result<Vec<DataEntry>, PageError> {
        let count = self.entry_count()?;
        (0..count).map(|i| self.entry_at(i)).collect()
    }

    fn insert_entry(&mut self, entry: &DataEntry) -> Result<(), PageError> {
        let mut entries = self.all_entries()?;
        let pos = entries.partition_point(|e| e < entry);
        entries.insert(pos, entry.clone());
        self.rebuild(&entries)
    }

    fn delete_entry(&mut self, key: &SearchKey, rid: Rid) -> Result<bool, PageError> {
        let mut entries = self.all_entries()?;
        let Some(pos) = entries.iter().position(|e| &e.key == key && e.rid == rid) else {
            return Ok(false);
        };
        entries.remove(pos);
        self.rebuild(&entries)?;
        Ok(true)
    }

    fn next_entry(&self, key: &SearchKey, from_slot: u16) -> Result<Option<u16>, PageError> {
        let count = self.entry_count()?;
        let mut index = from_slot;
        while index < count {
            let entry = self.entry_at(index)?;
            if &entry.key == key {
                return Ok(Some(index));
            }
            if &entry.key > key {
                break;
            }
            index += 1;
        }
        Ok(None)
    }
}

trait SortedPageRebuild {
    fn rebuild(&mut self, entries: &[DataEntry]) -> Result<(), PageError>;
}

impl SortedPageRebuild for HFPage {
    fn rebuild(&mut self, entries: &[DataEntry]) -> Result<(), PageError> {
        let encoded: Vec<Vec<u8>> = entries.iter().map(DataEntry::encode).collect();
        let needed: usize = encoded.len() * SLOT_SIZE + encoded.iter().map(Vec::len).sum::<usize>();
        if needed > BODY_LEN {
            return Err(PageError::SpaceExhausted {
                needed,
                available: BODY_LEN,
            });
        }

        let mut cursor = PAGE_SIZE;
        for (index, bytes) in encoded.iter().enumerate() {
            cursor -= bytes.len();
            self.data_mut()[cursor..cursor + bytes.len()].copy_from_slice(bytes);
            self.write_slot(index as u16, cursor as u16, bytes.len() as u16)?;
        }
        self.set_slot_count(encoded.len() as u16)?;
        self.set_free_space_raw((BODY_LEN - needed) as u16)?;
        Ok(())
    }
}
