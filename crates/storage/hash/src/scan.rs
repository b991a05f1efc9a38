use buffer::PinMode;
use disk::DiskManager;
use page::{PageId, Rid, SearchKey, SortedPageExt};

use crate::errors::HashError;
use crate::hash_index::HashIndex;

/// The scan's position: which bucket page it is currently reading, and the
/// slot index to resume `next_entry` from on that page. `next_entry`'s
/// underlying scan starts at `from_slot` inclusive, so advancing past a
/// match means resuming at `matched_slot + 1`.
#[derive(Debug, Clone, Copy)]
enum ScanState {
    Empty,
    OnPage { page_id: PageId, from_slot: u16 },
    Exhausted,
    Closed,
}

/// A forward iterator over every live `(key, rid)` entry matching one
/// `SearchKey`, walking the bucket's overflow chain one page at a time.
/// Pins at most one bucket page per call to `get_next`, never across
/// calls.
#[derive(Debug)]
pub struct HashScan<'a, D: DiskManager> {
    index: &'a HashIndex<D>,
    key: SearchKey,
    state: ScanState,
}

impl<'a, D: DiskManager> HashScan<'a, D> {
    pub(crate) fn new(index: &'a HashIndex<D>, key: SearchKey, primary: Option<PageId>) -> Self {
        let state = match primary {
            Some(page_id) => ScanState::OnPage { page_id, from_slot: 0 },
            None => ScanState::Empty,
        };
        Self { index, key, state }
    }

    /// Returns the next matching `Rid`, or `None` once the chain is
    /// exhausted.
    pub fn get_next(&mut self) -> Result<Option<Rid>, HashError> {
        loop {
            let (page_id, from_slot) = match self.state {
                ScanState::Closed | ScanState::Exhausted | ScanState::Empty => return Ok(None),
                ScanState::OnPage { page_id, from_slot } => (page_id, from_slot),
            };

            let guard = self.index.pool.pin_page(page_id, PinMode::DiskIo)?;
            match guard.page().next_entry(&self.key, from_slot)? {
                Some(slot) => {
                    let entry = guard.page().entry_at(slot)?;
                    drop(guard);
                    self.state = ScanState::OnPage {
                        page_id,
                        from_slot: slot + 1,
                    };
                    return Ok(Some(entry.rid));
                }
                None => {
                    let next = guard.page().next_page()?;
                    drop(guard);
                    self.state = match next {
                        Some(next_id) => ScanState::OnPage {
                            page_id: next_id,
                            from_slot: 0,
                        },
                        None => ScanState::Exhausted,
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

#[cfg(test)]
mod tests {
    use super::*;
    use buffer::BufferPool;
    use disk::HeapDiskManager;

    fn index(num_frames: usize) -> HashIndex<HeapDiskManager> {
        let pool = BufferPool::new(HeapDiskManager::new(), num_frames);
        HashIndex::open(pool, None).unwrap()
    }

    fn rid(page: i32, slot: u16) -> Rid {
        Rid::new(PageId::new(page), slot)
    }

    #[test]
    fn empty_bucket_scan_yields_nothing() {
        let idx = index(8);
        let mut scan = idx.open_scan(SearchKey::Int(1)).unwrap();
        assert!(scan.get_next().unwrap().is_none());
    }

    #[test]
    fn closed_scan_yields_nothing_further() {
        let idx = index(8);
        idx.insert_entry(SearchKey::Int(1), rid(1, 1)).unwrap();
        let mut scan = idx.open_scan(SearchKey::Int(1)).unwrap();
        scan.close();
        assert!(scan.get_next().unwrap().is_none());
    }

    #[test]
    fn scan_skips_entries_for_other_keys_sharing_the_bucket() {
        let idx = index(8);
        idx.insert_entry(SearchKey::Int(1), rid(1, 1)).unwrap();
        idx.insert_entry(SearchKey::Int(2), rid(1, 2)).unwrap();
        idx.insert_entry(SearchKey::Int(1), rid(1, 3)).unwrap();

        let mut scan = idx.open_scan(SearchKey::Int(1)).unwrap();
        let mut seen = Vec::new();
        while let Some(r) = scan.get_next().unwrap() {
            seen.push(r);
        }
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&rid(1, 1)));
        assert!(seen.contains(&rid(1, 3)));
    }
}
