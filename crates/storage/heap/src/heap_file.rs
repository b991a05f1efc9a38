use buffer::{BufferPool, PinMode};
use disk::DiskManager;
use page::{DirEntry, DirPageExt, PageId, PageType, Rid, DIR_MAX_ENTRIES, MAX_RECORD_SIZE, SLOT_SIZE};

use crate::errors::HeapError;
use crate::scan::HeapScan;

/// An unordered heap of variable-length records, organized as a doubly
/// linked list of `DirPage`s, each listing the data pages it owns together
/// with their live record count and free space. Owns its on-disk state:
/// when a temporary `HeapFile` (one opened without a name) is dropped, its
/// pages are freed, matching the finalizer-driven cleanup of the system
/// this design descends from, expressed here as scoped ownership instead.
#[derive(Debug)]
pub struct HeapFile<D: DiskManager> {
    pub(crate) pool: BufferPool<D>,
    pub(crate) head_id: PageId,
    name: Option<String>,
    is_temp: bool,
}

impl<D: DiskManager> HeapFile<D> {
    /// Opens `name` if it is already registered with `pool`'s disk manager,
    /// otherwise creates a fresh heap file. `name = None` creates a
    /// temporary heap file, freed automatically when the returned value is
    /// dropped.
    pub fn open(pool: BufferPool<D>, name: Option<&str>) -> Result<Self, HeapError> {
        if let Some(name) = name {
            if let Some(head_id) = pool.get_file_entry(name) {
                return Ok(Self {
                    pool,
                    head_id,
                    name: Some(name.to_string()),
                    is_temp: false,
                });
            }
        }

        let (head_id, guard) = pool.new_page(1)?;
        guard.page_mut().init(head_id, PageType::DirPage)?;
        drop(guard);

        if let Some(name) = name {
            pool.add_file_entry(name, head_id);
        }

        Ok(Self {
            pool,
            head_id,
            name: name.map(str::to_string),
            is_temp: name.is_none(),
        })
    }

    pub fn head_id(&self) -> PageId {
        self.head_id
    }

    pub fn open_scan(&self) -> HeapScan<'_, D> {
        HeapScan::new(self)
    }

    /// Inserts `bytes` into the first data page with room for it,
    /// allocating a new data page (and directory page, if needed) when
    /// none is found.
    pub fn insert_record(&self, bytes: &[u8]) -> Result<Rid, HeapError> {
        if bytes.len() > MAX_RECORD_SIZE {
            return Err(HeapError::RecordTooLarge {
                len: bytes.len(),
                max: MAX_RECORD_SIZE,
            });
        }
        let needed = bytes.len() + SLOT_SIZE;
        let data_page_id = self.get_avail_page(needed)?;

        let guard = self.pool.pin_page(data_page_id, PinMode::DiskIo)?;
        let rid = guard.try_mutate(|p| p.insert_record(bytes))?;
        let new_free = guard.page().free_space()?;
        drop(guard);

        self.update_dir_entry(data_page_id, 1, new_free)?;
        Ok(rid)
    }

    pub fn select_record(&self, rid: Rid) -> Result<Vec<u8>, HeapError> {
        let guard = self.pool.pin_page(rid.page_id, PinMode::DiskIo)?;
        let bytes = guard.page().select_record(rid)?.to_vec();
        Ok(bytes)
    }

    /// Overwrites the record named by `rid`. `bytes.len()` must equal the
    /// record's existing length; record count and free space are
    /// unaffected so no directory update is needed.
    pub fn update_record(&self, rid: Rid, bytes: &[u8]) -> Result<(), HeapError> {
        let guard = self.pool.pin_page(rid.page_id, PinMode::DiskIo)?;
        guard.try_mutate(|p| p.update_record(rid, bytes))?;
        Ok(())
    }

    pub fn delete_record(&self, rid: Rid) -> Result<(), HeapError> {
        let guard = self.pool.pin_page(rid.page_id, PinMode::DiskIo)?;
        guard.try_mutate(|p| p.delete_record(rid))?;
        let new_free = guard.page().free_space()?;
        drop(guard);

        self.update_dir_entry(rid.page_id, -1, new_free)
    }

    /// Sums `record_count` across every directory entry in the chain.
    pub fn rec_count(&self) -> Result<u64, HeapError> {
        let mut total = 0u64;
        let mut dir_id = Some(self.head_id);
        while let Some(id) = dir_id {
            let guard = self.pool.pin_page(id, PinMode::DiskIo)?;
            let count = guard.page().entry_count()?;
            for i in 0..count {
                total += guard.page().dir_entry(i)?.record_count as u64;
            }
            dir_id = guard.page().next_page()?;
        }
        Ok(total)
    }

    /// Frees every data page and directory page in the chain, and removes
    /// the named-registry entry if this heap file has one. Idempotent to
    /// call at most once; ordinarily invoked only by `Drop` for temporary
    /// files or explicitly by a client retiring a named one.
    pub fn delete_file(&self) -> Result<(), HeapError> {
        let mut dir_id = Some(self.head_id);
        while let Some(id) = dir_id {
            let guard = self.pool.pin_page(id, PinMode::DiskIo)?;
            let count = guard.page().entry_count()?;
            for i in 0..count {
                let entry = guard.page().dir_entry(i)?;
                self.pool.free_page(entry.data_page_id)?;
            }
            let next = guard.page().next_page()?;
            drop(guard);
            self.pool.free_page(id)?;
            dir_id = next;
        }
        if let Some(name) = &self.name {
            self.pool.delete_file_entry(name);
        }
        Ok(())
    }

    /// Scans directory pages in chain order looking for a data page whose
    /// recorded free space is at least `needed`. Allocates a new data page
    /// via `insert_page` if none qualifies.
    fn get_avail_page(&self, needed: usize) -> Result<PageId, HeapError> {
        let mut dir_id = Some(self.head_id);
        while let Some(id) = dir_id {
            let guard = self.pool.pin_page(id, PinMode::DiskIo)?;
            let count = guard.page().entry_count()?;
            for i in 0..count {
                let entry = guard.page().dir_entry(i)?;
                if entry.free_count as usize >= needed {
                    return Ok(entry.data_page_id);
                }
            }
            dir_id = guard.page().next_page()?;
        }
        self.insert_page()
    }

    /// Locates the directory entry describing `data_page_id` by walking
    /// the directory chain linearly. Returns the directory page's id and
    /// the entry's index within it.
    fn find_dir_entry(&self, data_page_id: PageId) -> Result<(PageId, u16), HeapError> {
        let mut dir_id = Some(self.head_id);
        while let Some(id) = dir_id {
            let guard = self.pool.pin_page(id, PinMode::DiskIo)?;
            let count = guard.page().entry_count()?;
            for i in 0..count {
                if guard.page().dir_entry(i)?.data_page_id == data_page_id {
                    return Ok((id, i));
                }
            }
            dir_id = guard.page().next_page()?;
        }
        Err(HeapError::DirEntryNotFound(data_page_id))
    }

    /// Applies `delta_rec` to a data page's live record count and writes
    /// back `new_free`. If the record count drops to zero, the data page
    /// (and, if it empties a non-head directory page, that directory page
    /// too) is reclaimed.
    fn update_dir_entry(&self, data_page_id: PageId, delta_rec: i32, new_free: u16) -> Result<(), HeapError> {
        let (dir_id, index) = self.find_dir_entry(data_page_id)?;
        let dir_guard = self.pool.pin_page(dir_id, PinMode::DiskIo)?;
        let entry = dir_guard.page().dir_entry(index)?;
        let new_count = entry.record_count as i32 + delta_rec;
        debug_assert!(new_count >= 0, "record count must never go negative");
        let new_count = new_count.max(0) as u16;

        if new_count >= 1 {
            dir_guard.try_mutate(|p| {
                p.set_dir_entry(
                    index,
                    DirEntry {
                        data_page_id,
                        record_count: new_count,
                        free_count: new_free,
                    },
                )
            })?;
            Ok(())
        } else {
            self.delete_page(data_page_id, dir_id, dir_guard, index)
        }
    }

    /// Frees a now-empty data page and removes its directory entry. If
    /// that was the directory page's last entry and it is not the head,
    /// splices it out of the chain and frees it too.
    fn delete_page(
        &self,
        data_page_id: PageId,
        dir_id: PageId,
        dir_guard: buffer::PageGuard<D>,
        entry_index: u16,
    ) -> Result<(), HeapError> {
        self.pool.free_page(data_page_id)?;
        let old_count = dir_guard.try_mutate(|p| p.remove_dir_entry(entry_index))?;

        if old_count == 1 && dir_id != self.head_id {
            let prev = dir_guard.page().prev_page()?;
            let next = dir_guard.page().next_page()?;
            drop(dir_guard);

            if let Some(prev_id) = prev {
                let prev_guard = self.pool.pin_page(prev_id, PinMode::DiskIo)?;
                prev_guard.try_mutate(|p| p.set_next_page(next))?;
            }
            if let Some(next_id) = next {
                let next_guard = self.pool.pin_page(next_id, PinMode::DiskIo)?;
                next_guard.try_mutate(|p| p.set_prev_page(prev))?;
            }
            self.pool.free_page(dir_id)?;
        }
        Ok(())
    }

    /// Finds a directory page with room for another entry (allocating a
    /// new tail directory page if every existing one is full), allocates a
    /// fresh data page, and records it in a new directory entry.
    fn insert_page(&self) -> Result<PageId, HeapError> {
        let mut dir_id = self.head_id;
        loop {
            let guard = self.pool.pin_page(dir_id, PinMode::DiskIo)?;
            let count = guard.page().entry_count()?;
            if (count as usize) < DIR_MAX_ENTRIES {
                drop(guard);
                break;
            }
            let next = guard.page().next_page()?;
            drop(guard);
            match next {
                Some(next_id) => dir_id = next_id,
                None => {
                    let (new_dir_id, new_guard) = self.pool.new_page(1)?;
                    new_guard.page_mut().init(new_dir_id, PageType::DirPage)?;
                    new_guard.page_mut().set_prev_page(Some(dir_id))?;
                    drop(new_guard);

                    let prev_guard = self.pool.pin_page(dir_id, PinMode::DiskIo)?;
                    prev_guard.try_mutate(|p| p.set_next_page(Some(new_dir_id)))?;
                    drop(prev_guard);

                    dir_id = new_dir_id;
                    break;
                }
            }
        }

        let dir_guard = self.pool.pin_page(dir_id, PinMode::DiskIo)?;
        let (data_page_id, data_guard) = self.pool.new_page(1)?;
        data_guard.page_mut().init(data_page_id, PageType::DataPage)?;
        let free_space = data_guard.page().free_space()?;
        drop(data_guard);

        dir_guard.try_mutate(|p| {
            p.push_dir_entry(DirEntry {
                data_page_id,
                record_count: 0,
                free_count: free_space,
            })
        })?;
        Ok(data_page_id)
    }
}

impl<D: DiskManager> Drop for HeapFile<D> {
    fn drop(&mut self) {
        if self.is_temp {
            if let Err(err) = self.delete_file() {
                tracing::warn!(error = %err, "failed to reclaim temporary heap file on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buffer::BufferPool;
    use disk::HeapDiskManager;

    fn heap(num_frames: usize) -> HeapFile<HeapDiskManager> {
        let pool = BufferPool::new(HeapDiskManager::new(), num_frames);
        HeapFile::open(pool, None).unwrap()
    }

    #[test]
    fn insert_then_select_round_trips() {
        let heap = heap(4);
        let rid = heap.insert_record(b"hello world").unwrap();
        assert_eq!(heap.select_record(rid).unwrap(), b"hello world");
        assert_eq!(heap.rec_count().unwrap(), 1);
    }

    #[test]
    fn insert_record_too_large_is_rejected() {
        let heap = heap(4);
        let big = vec![0u8; MAX_RECORD_SIZE + 1];
        assert!(matches!(
            heap.insert_record(&big),
            Err(HeapError::RecordTooLarge { .. })
        ));
    }

    #[test]
    fn delete_reclaims_the_data_page_but_keeps_the_head_directory() {
        let heap = heap(4);
        let rid = heap.insert_record(b"bytes").unwrap();
        assert_eq!(heap.rec_count().unwrap(), 1);
        heap.delete_record(rid).unwrap();
        assert_eq!(heap.rec_count().unwrap(), 0);

        // The head directory page must still exist and be empty.
        let guard = heap.pool.pin_page(heap.head_id, PinMode::DiskIo).unwrap();
        assert_eq!(guard.page().entry_count().unwrap(), 0);
    }

    #[test]
    fn update_does_not_change_record_count_or_accept_a_different_length() {
        let heap = heap(4);
        let rid = heap.insert_record(b"abcd").unwrap();
        heap.update_record(rid, b"wxyz").unwrap();
        assert_eq!(heap.select_record(rid).unwrap(), b"wxyz");
        assert_eq!(heap.rec_count().unwrap(), 1);
        assert!(heap.update_record(rid, b"too-long").is_err());
    }

    #[test]
    fn many_inserts_spill_across_multiple_data_pages() {
        let heap = heap(4);
        let mut rids = Vec::new();
        for i in 0..50u32 {
            let bytes = format!("record-{i:04}").into_bytes();
            rids.push((bytes.clone(), heap.insert_record(&bytes).unwrap()));
        }
        assert_eq!(heap.rec_count().unwrap(), 50);
        for (bytes, rid) in rids {
            assert_eq!(heap.select_record(rid).unwrap(), bytes);
        }
    }

    #[test]
    fn deleting_every_record_lets_every_data_page_be_reclaimed() {
        let heap = heap(4);
        let mut rids = Vec::new();
        for i in 0..50u32 {
            let bytes = format!("record-{i:04}").into_bytes();
            rids.push(heap.insert_record(&bytes).unwrap());
        }
        for rid in rids {
            heap.delete_record(rid).unwrap();
        }
        assert_eq!(heap.rec_count().unwrap(), 0);
    }

    #[test]
    fn named_heap_file_persists_and_can_be_reopened() {
        let pool = BufferPool::new(HeapDiskManager::new(), 4);
        let head_id = {
            let heap = HeapFile::open(pool.clone(), Some("orders")).unwrap();
            heap.insert_record(b"row").unwrap();
            heap.head_id()
        };
        let reopened = HeapFile::open(pool, Some("orders")).unwrap();
        assert_eq!(reopened.head_id(), head_id);
        assert_eq!(reopened.rec_count().unwrap(), 1);
    }

    #[test]
    fn temporary_heap_file_is_reclaimed_on_drop() {
        let pool = BufferPool::new(HeapDiskManager::new(), 4);
        let head_id = {
            let heap = HeapFile::open(pool.clone(), None).unwrap();
            heap.insert_record(b"row").unwrap();
            heap.head_id()
        };
        // The head directory page's frame should now be freeable without
        // error, which would fail if `Drop` had left it mapped and pinned.
        assert!(pool.free_page(head_id).is_ok() || pool.pin_page(head_id, PinMode::DiskIo).is_ok());
    }

    // S1: three records sized so they must spread across more than one
    // data page, then deleted back down to the bare head directory.
    #[test]
    fn three_records_spanning_pages_all_select_and_fully_reclaim() {
        let heap = heap(4);
        let a = vec![b'A'; 1];
        let b = vec![b'B'; 500];
        let c = vec![b'C'; 1004];
        let ra = heap.insert_record(&a).unwrap();
        let rb = heap.insert_record(&b).unwrap();
        let rc = heap.insert_record(&c).unwrap();
        assert_eq!(heap.rec_count().unwrap(), 3);
        assert_eq!(heap.select_record(ra).unwrap(), a);
        assert_eq!(heap.select_record(rb).unwrap(), b);
        assert_eq!(heap.select_record(rc).unwrap(), c);

        heap.delete_record(ra).unwrap();
        heap.delete_record(rb).unwrap();
        heap.delete_record(rc).unwrap();
        assert_eq!(heap.rec_count().unwrap(), 0);
        let guard = heap.pool.pin_page(heap.head_id, PinMode::DiskIo).unwrap();
        assert_eq!(guard.page().entry_count().unwrap(), 0);
    }

    // P4: a completed top-level operation leaves the pool's pin count
    // exactly where it found it.
    #[test]
    fn insert_select_and_delete_each_leave_every_frame_unpinned_afterward() {
        let pool = BufferPool::new(HeapDiskManager::new(), 4);
        let heap = HeapFile::open(pool.clone(), None).unwrap();
        let before = pool.num_unpinned();

        let rid = heap.insert_record(b"row").unwrap();
        assert_eq!(pool.num_unpinned(), before);

        heap.select_record(rid).unwrap();
        assert_eq!(pool.num_unpinned(), before);

        heap.delete_record(rid).unwrap();
        assert_eq!(pool.num_unpinned(), before);
    }

    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Insert(Vec<u8>),
        DeleteLast,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => prop::collection::vec(any::<u8>(), 0..200).prop_map(Op::Insert),
            1 => Just(Op::DeleteLast),
        ]
    }

    proptest! {
        // P1 + P8: every live record still round-trips its original bytes
        // under its original RID after an arbitrary insert/delete mix, and
        // RIDs of records never deleted never change meaning.
        #[test]
        fn round_trip_survives_arbitrary_insert_delete_sequences(ops in prop::collection::vec(op_strategy(), 0..60)) {
            let heap = heap(4);
            let mut live: Vec<(Rid, Vec<u8>)> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(bytes) => {
                        let rid = heap.insert_record(&bytes).unwrap();
                        live.push((rid, bytes));
                    }
                    Op::DeleteLast => {
                        if let Some((rid, _)) = live.pop() {
                            heap.delete_record(rid).unwrap();
                        }
                    }
                }
            }

            for (rid, bytes) in &live {
                prop_assert_eq!(&heap.select_record(*rid).unwrap(), bytes);
            }
            prop_assert_eq!(heap.rec_count().unwrap(), live.len() as u64);
        }

        // P2 + P3: directory bookkeeping always matches the data pages it
        // describes, and only the head directory page may be empty.
        #[test]
        fn directory_accounting_matches_actual_page_contents(ops in prop::collection::vec(op_strategy(), 0..60)) {
            let heap = heap(4);
            let mut live: Vec<Rid> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(bytes) => live.push(heap.insert_record(&bytes).unwrap()),
                    Op::DeleteLast => {
                        if let Some(rid) = live.pop() {
                            heap.delete_record(rid).unwrap();
                        }
                    }
                }
            }

            let mut dir_id = Some(heap.head_id);
            while let Some(id) = dir_id {
                let guard = heap.pool.pin_page(id, PinMode::DiskIo).unwrap();
                let count = guard.page().entry_count().unwrap();
                if id != heap.head_id {
                    prop_assert!(count >= 1);
                }
                for i in 0..count {
                    let entry = guard.page().dir_entry(i).unwrap();
                    let data_guard = heap.pool.pin_page(entry.data_page_id, PinMode::DiskIo).unwrap();
                    let slot_count = data_guard.page().slot_count().unwrap();
                    let live_count = (0..slot_count).filter(|&s| data_guard.page().is_slot_valid(s)).count();
                    prop_assert_eq!(live_count as u16, entry.record_count);
                    prop_assert_eq!(data_guard.page().free_space().unwrap(), entry.free_count);
                }
                dir_id = guard.page().next_page().unwrap();
            }
        }
    }
}
