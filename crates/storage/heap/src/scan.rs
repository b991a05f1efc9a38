use buffer::PinMode;
use disk::DiskManager;
use page::{DirPageExt, PageId, Rid};

use crate::errors::HeapError;
use crate::heap_file::HeapFile;

/// The scan's position: which directory entry it is currently reading
/// data pages from, which data page that is (once resolved), and the next
/// slot index to examine on it.
#[derive(Debug, Clone, Copy)]
enum ScanState {
    BeforeFirst,
    OnEntry {
        dir_id: PageId,
        entry_idx: u16,
        data_page_id: Option<PageId>,
        slot_idx: u16,
    },
    Done,
    Closed,
}

/// A forward iterator over every live record in a `HeapFile`, in directory
/// then physical-slot order. Pins at most one directory page and one data
/// page at a time, never both across calls to `get_next` - each call pins,
/// reads, and unpins before returning. Mutations to the heap made
/// concurrently with a scan (from this same single-threaded caller, e.g.
/// via a nested insert/delete) may cause the scan to skip or repeat
/// entries, but never to read out-of-bounds or corrupt data: the scan
/// holds no state beyond plain page ids and indices.
#[derive(Debug)]
pub struct HeapScan<'a, D: DiskManager> {
    heap: &'a HeapFile<D>,
    state: ScanState,
}

impl<'a, D: DiskManager> HeapScan<'a, D> {
    pub(crate) fn new(heap: &'a HeapFile<D>) -> Self {
        Self {
            heap,
            state: ScanState::BeforeFirst,
        }
    }

    /// Returns the next `(rid, bytes)` pair, or `None` once every
    /// directory page in the chain has been exhausted.
    pub fn get_next(&mut self) -> Result<Option<(Rid, Vec<u8>)>, HeapError> {
        loop {
            let (dir_id, entry_idx, data_page_id, slot_idx) = match self.state {
                ScanState::Closed | ScanState::Done => return Ok(None),
                ScanState::BeforeFirst => (self.heap.head_id, 0u16, None, 0u16),
                ScanState::OnEntry {
                    dir_id,
                    entry_idx,
                    data_page_id,
                    slot_idx,
                } => (dir_id, entry_idx, data_page_id, slot_idx),
            };

            let data_page_id = match data_page_id {
                Some(id) => id,
                None => {
                    let dir_guard = self.heap.pool.pin_page(dir_id, PinMode::DiskIo)?;
                    let count = dir_guard.page().entry_count()?;
                    if entry_idx >= count {
                        let next_dir = dir_guard.page().next_page()?;
                        drop(dir_guard);
                        self.state = match next_dir {
                            Some(next_id) => ScanState::OnEntry {
                                dir_id: next_id,
                                entry_idx: 0,
                                data_page_id: None,
                                slot_idx: 0,
                            },
                            None => ScanState::Done,
                        };
                        continue;
                    }
                    let entry = dir_guard.page().dir_entry(entry_idx)?;
                    drop(dir_guard);
                    entry.data_page_id
                }
            };

            let data_guard = self.heap.pool.pin_page(data_page_id, PinMode::DiskIo)?;
            let slot_count = data_guard.page().slot_count()?;
            let mut idx = slot_idx;
            let found = loop {
                if idx >= slot_count {
                    break None;
                }
                if data_guard.page().is_slot_valid(idx) {
                    break Some(idx);
                }
                idx += 1;
            };

            match found {
                Some(idx) => {
                    let rid = Rid::new(data_page_id, idx + 1);
                    let bytes = data_guard.page().select_record(rid)?.to_vec();
                    drop(data_guard);
                    self.state = ScanState::OnEntry {
                        dir_id,
                        entry_idx,
                        data_page_id: Some(data_page_id),
                        slot_idx: idx + 1,
                    };
                    return Ok(Some((rid, bytes)));
                }
                None => {
                    drop(data_guard);
                    self.state = ScanState::OnEntry {
                        dir_id,
                        entry_idx: entry_idx + 1,
                        data_page_id: None,
                        slot_idx: 0,
                    };
                }
            }
        }
    }

    /// Ends the scan. Since no guard is held across calls there is nothing
    /// to unpin; this only prevents further iteration.
    pub fn close(&mut self) {
        self.state = ScanState::Closed;
    }
}
