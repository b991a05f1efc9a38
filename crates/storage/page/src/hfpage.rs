//! The slotted heap page: a 1024-byte buffer holding a 20-byte header, a
//! slot directory that grows upward from the header, and a record region
//! that grows downward from the end of the page. Free space is tracked
//! authoritatively in the header, so a record's placement is always
//! derivable as `frontier = HEADER_SIZE + slot_count * SLOT_SIZE +
//! free_space` - no separate free-start/free-end fields are needed.

use crate::errors::PageError;
use crate::header::{HeaderMut, HeaderRef, HEADER_SIZE};
use crate::page_id::{PageId, Rid, EMPTY_SLOT};
use crate::page_type::PageType;
use crate::slot::{slot_range, SlotMut, SlotRef, SLOT_SIZE};

/// Total size in bytes of a page, including its header.
pub const PAGE_SIZE: usize = 1024;

/// Largest record `insert_record` will accept.
pub const MAX_RECORD_SIZE: usize = 1004;

pub(crate) const BODY_LEN: usize = PAGE_SIZE - HEADER_SIZE;

/// A raw page buffer together with the typed operations defined over it.
/// The same physical layout backs every page kind (`DirPage`, `DataPage`,
/// `HashDirPage`, `HashBucketPage`); `page_type()` distinguishes them, and
/// higher-level views (`dir_page`, `hash_dir_page`, `sorted`) interpret the
/// body differently depending on it.
pub struct HFPage {
    data: Box<[u8; PAGE_SIZE]>,
}

impl HFPage {
    /// An all-zero page with no valid header. Used only as the frame
    /// buffer the buffer pool fills in before handing a guard to a caller.
    pub fn new_zeroed() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
        }
    }

    /// Resets the header to the state of a freshly allocated page: no
    /// prev/next link, `cur_page` set to `page_id`, zero live slots, and
    /// the whole body free.
    pub fn init(&mut self, page_id: PageId, page_type: PageType) -> Result<(), PageError> {
        self.header_mut()?
            .reset(page_id.raw(), page_type.into(), BODY_LEN as u16)?;
        Ok(())
    }

    pub fn data(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    pub fn from_bytes(bytes: [u8; PAGE_SIZE]) -> Self {
        Self {
            data: Box::new(bytes),
        }
    }

    fn header_ref(&self) -> Result<HeaderRef<'_>, PageError> {
        Ok(HeaderRef::new(&self.data[..HEADER_SIZE])?)
    }

    fn header_mut(&mut self) -> Result<HeaderMut<'_>, PageError> {
        Ok(HeaderMut::new(&mut self.data[..HEADER_SIZE])?)
    }

    pub fn page_id(&self) -> Result<PageId, PageError> {
        Ok(PageId::new(self.header_ref()?.cur_page()?))
    }

    pub fn prev_page(&self) -> Result<Option<PageId>, PageError> {
        Ok(PageId::from_raw(self.header_ref()?.prev_page()?))
    }

    pub fn set_prev_page(&mut self, page_id: Option<PageId>) -> Result<(), PageError> {
        Ok(self.header_mut()?.set_prev_page(PageId::to_raw(page_id))?)
    }

    pub fn next_page(&self) -> Result<Option<PageId>, PageError> {
        Ok(PageId::from_raw(self.header_ref()?.next_page()?))
    }

    pub fn set_next_page(&mut self, page_id: Option<PageId>) -> Result<(), PageError> {
        Ok(self.header_mut()?.set_next_page(PageId::to_raw(page_id))?)
    }

    pub fn page_type(&self) -> Result<PageType, PageError> {
        let raw = self.header_ref()?.page_type()?;
        PageType::try_from(raw).map_err(|e| PageError::UnknownPageType(e.0))
    }

    pub fn free_space(&self) -> Result<u16, PageError> {
        Ok(self.header_ref()?.free_space()?)
    }

    fn set_free_space(&mut self, value: u16) -> Result<(), PageError> {
        Ok(self.header_mut()?.set_free_space(value)?)
    }

    pub fn slot_count(&self) -> Result<u16, PageError> {
        Ok(self.header_ref()?.slot_count()?)
    }

    pub(crate) fn set_slot_count(&mut self, value: u16) -> Result<(), PageError> {
        Ok(self.header_mut()?.set_slot_count(value)?)
    }

    /// The boundary between the slot directory and the packed record
    /// region, derived from `slot_count` and `free_space`.
    pub(crate) fn frontier(&self) -> Result<usize, PageError> {
        let slot_count = self.slot_count()? as usize;
        let free_space = self.free_space()? as usize;
        Ok(HEADER_SIZE + slot_count * SLOT_SIZE + free_space)
    }

    pub(crate) fn read_slot(&self, index: u16) -> Result<(u16, u16), PageError> {
        let range = slot_range(HEADER_SIZE, index as usize);
        let slot = SlotRef::new(&self.data[range])?;
        Ok((slot.offset()?, slot.length()?))
    }

    pub(crate) fn write_slot(&mut self, index: u16, offset: u16, length: u16) -> Result<(), PageError> {
        let range = slot_range(HEADER_SIZE, index as usize);
        let mut slot = SlotMut::new(&mut self.data[range])?;
        slot.set(offset, length)?;
        Ok(())
    }

    pub(crate) fn set_free_space_raw(&mut self, value: u16) -> Result<(), PageError> {
        self.set_free_space(value)
    }

    /// `true` if `index` is within `slot_count` and holds a live record.
    pub fn is_slot_valid(&self, index: u16) -> bool {
        let Ok(slot_count) = self.slot_count() else {
            return false;
        };
        if index >= slot_count {
            return false;
        }
        matches!(self.read_slot(index), Ok((_, length)) if length != EMPTY_SLOT)
    }

    fn resolve_rid(&self, rid: Rid) -> Result<u16, PageError> {
        let slot_count = self.slot_count()?;
        if rid.page_id != self.page_id()? || rid.slot_no == EMPTY_SLOT {
            return Err(PageError::InvalidRid { rid, slot_count });
        }
        let index = rid.slot_no - 1;
        if !self.is_slot_valid(index) {
            return Err(PageError::InvalidRid { rid, slot_count });
        }
        Ok(index)
    }

    /// Finds the lowest empty slot to reuse, or `slot_count` if every slot
    /// currently in use is live (a brand new slot must be appended).
    fn find_insert_slot(&self) -> Result<(u16, bool), PageError> {
        let slot_count = self.slot_count()?;
        for index in 0..slot_count {
            let (_, length) = self.read_slot(index)?;
            if length == EMPTY_SLOT {
                return Ok((index, false));
            }
        }
        Ok((slot_count, true))
    }

    /// Inserts a record, returning the `Rid` that names it. The slot
    /// chosen is the lowest empty slot, or a freshly appended one if none
    /// are free. A record of `L` bytes fits iff `free_space >= L + 4` when
    /// a new slot is appended, or `free_space >= L` when reusing an empty
    /// one - the tighter bound implied by `delete_record`'s reclaim rule.
    pub fn insert_record(&mut self, bytes: &[u8]) -> Result<Rid, PageError> {
        let len = bytes.len();
        if len > MAX_RECORD_SIZE {
            return Err(PageError::RecordTooLarge {
                len,
                max: MAX_RECORD_SIZE,
            });
        }
        let (index, is_new) = self.find_insert_slot()?;
        let free_space = self.free_space()? as usize;
        let needed = if is_new { len + SLOT_SIZE } else { len };
        if needed > free_space {
            return Err(PageError::SpaceExhausted {
                needed,
                available: free_space,
            });
        }

        let frontier = self.frontier()?;
        let record_offset = frontier - len;
        self.data[record_offset..record_offset + len].copy_from_slice(bytes);

        if is_new {
            self.set_slot_count(index + 1)?;
        }
        self.write_slot(index, record_offset as u16, len as u16)?;
        self.set_free_space((free_space - needed) as u16)?;

        Ok(Rid::new(self.page_id()?, index + 1))
    }

    pub fn select_record(&self, rid: Rid) -> Result<&[u8], PageError> {
        let index = self.resolve_rid(rid)?;
        let (offset, length) = self.read_slot(index)?;
        Ok(&self.data[offset as usize..offset as usize + length as usize])
    }

    /// Overwrites the record named by `rid` in place. `bytes.len()` must
    /// equal the existing record's length, or the update fails with
    /// `InvalidUpdate`; `free_space` is unchanged either way.
    pub fn update_record(&mut self, rid: Rid, bytes: &[u8]) -> Result<(), PageError> {
        let index = self.resolve_rid(rid)?;
        let (offset, old_len) = self.read_slot(index)?;
        if bytes.len() != old_len as usize {
            return Err(PageError::InvalidUpdate {
                old_len: old_len as usize,
                new_len: bytes.len(),
            });
        }
        self.data[offset as usize..offset as usize + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Marks the record named by `rid` empty, reclaims its bytes (and the
    /// slot's own 4 directory bytes if it was the trailing slot), and
    /// compacts the record region back to a contiguous block.
    pub fn delete_record(&mut self, rid: Rid) -> Result<(), PageError> {
        let index = self.resolve_rid(rid)?;
        let (_, length) = self.read_slot(index)?;
        let slot_count = self.slot_count()?;
        self.write_slot(index, 0, 0)?;

        let mut reclaimed = length as usize;
        let mut trailing = slot_count;
        while trailing > 0 {
            let (_, len) = self.read_slot(trailing - 1)?;
            if len != EMPTY_SLOT {
                break;
            }
            trailing -= 1;
            reclaimed += SLOT_SIZE;
        }
        if trailing != slot_count {
            self.set_slot_count(trailing)?;
        }
        let free_space = self.free_space()? as usize;
        self.set_free_space((free_space + reclaimed) as u16)?;

        self.compact()
    }

    /// Repacks every live record contiguously against the end of the page,
    /// in ascending slot order, so the `frontier` formula stays accurate.
    fn compact(&mut self) -> Result<(), PageError> {
        let slot_count = self.slot_count()?;
        let mut live = Vec::new();
        for index in 0..slot_count {
            let (offset, length) = self.read_slot(index)?;
            if length != EMPTY_SLOT {
                live.push((index, offset, length));
            }
        }

        let snapshot = self.data.clone();
        let mut cursor = PAGE_SIZE;
        for (index, offset, length) in live {
            cursor -= length as usize;
            self.data[cursor..cursor + length as usize]
                .copy_from_slice(&snapshot[offset as usize..offset as usize + length as usize]);
            self.write_slot(index, cursor as u16, length)?;
        }
        Ok(())
    }
}
