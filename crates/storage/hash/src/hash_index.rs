use buffer::{BufferPool, PinMode};
use disk::DiskManager;
use page::{
    key_hash, DataEntry, HashDirPageExt, PageError, PageId, PageType, Rid, SearchKey, SortedPageExt,
    HASH_DIR_MAX_ENTRIES, MAX_ENTRY_SIZE, NUM_BUCKETS, D as HASH_DEPTH,
};

use crate::errors::HashError;
use crate::scan::HashScan;

/// A static hash index over `2^D` buckets, each an overflow-chained list of
/// key-sorted bucket pages. The directory itself is a flat array of bucket
/// head page ids, spread across as many `HashDirPage`s as needed (one
/// suffices for `D = 7` given this page size, but the directory chains
/// like a `HeapFile`'s directory would if it didn't). Owns its on-disk
/// state the same way `heap::HeapFile` does: dropping a temporary (unnamed)
/// index frees every page it holds.
#[derive(Debug)]
pub struct HashIndex<D: DiskManager> {
    pub(crate) pool: BufferPool<D>,
    pub(crate) head_id: PageId,
    name: Option<String>,
    is_temp: bool,
}

impl<D: DiskManager> HashIndex<D> {
    /// Opens `name` if already registered with `pool`'s disk manager,
    /// otherwise builds a fresh directory covering all `2^D` buckets.
    /// `name = None` creates a temporary index, freed when the returned
    /// value is dropped.
    pub fn open(pool: BufferPool<D>, name: Option<&str>) -> Result<Self, HashError> {
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

        let head_id = Self::build_directory(&pool)?;

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

    /// Allocates and chains enough `HashDirPage`s to address all `2^D`
    /// directory slots, every slot initialized to `INVALID_PAGEID`.
    fn build_directory(pool: &BufferPool<D>) -> Result<PageId, HashError> {
        let per_page = HASH_DIR_MAX_ENTRIES as u32;
        let pages_needed = NUM_BUCKETS.div_ceil(per_page).max(1);

        let (head_id, head_guard) = pool.new_page(1)?;
        head_guard.page_mut().init(head_id, PageType::HashDirPage)?;
        head_guard.page_mut().init_hash_dir_slots()?;
        drop(head_guard);

        let mut prev_id = head_id;
        for _ in 1..pages_needed {
            let (page_id, guard) = pool.new_page(1)?;
            guard.page_mut().init(page_id, PageType::HashDirPage)?;
            guard.page_mut().init_hash_dir_slots()?;
            guard.page_mut().set_prev_page(Some(prev_id))?;
            drop(guard);

            let prev_guard = pool.pin_page(prev_id, PinMode::DiskIo)?;
            prev_guard.try_mutate(|p| p.set_next_page(Some(page_id)))?;
            prev_id = page_id;
        }
        Ok(head_id)
    }

    /// Walks `floor(h / H)` `HashDirPage`s from the head (`H` = slots per
    /// page) and returns the page holding global bucket `h`, together with
    /// `h`'s local index within it.
    fn resolve_slot(&self, h: u32) -> Result<(PageId, u32), HashError> {
        let per_page = HASH_DIR_MAX_ENTRIES as u32;
        let hops = h / per_page;
        let local_index = h % per_page;

        let mut dir_id = self.head_id;
        for _ in 0..hops {
            let guard = self.pool.pin_page(dir_id, PinMode::DiskIo)?;
            let next = guard.page().next_page()?;
            dir_id = next.ok_or(HashError::TruncatedDirectory)?;
        }
        Ok((dir_id, local_index))
    }

    pub fn open_scan(&self, key: SearchKey) -> Result<HashScan<'_, D>, HashError> {
        let h = key_hash(&key);
        let (dir_id, local_index) = self.resolve_slot(h)?;
        let dir_guard = self.pool.pin_page(dir_id, PinMode::DiskIo)?;
        let slot = dir_guard.page().hash_dir_slot(local_index)?;
        drop(dir_guard);
        Ok(HashScan::new(self, key, slot))
    }

    /// Inserts `(key, rid)`. Allocates a primary bucket page on the first
    /// insert into an empty bucket, and grows the overflow chain when the
    /// primary (or the chain's current tail) has no room.
    pub fn insert_entry(&self, key: SearchKey, rid: Rid) -> Result<(), HashError> {
        let entry = DataEntry { key, rid };
        let len = entry.encode().len();
        if len > MAX_ENTRY_SIZE {
            return Err(HashError::EntryTooLarge { len, max: MAX_ENTRY_SIZE });
        }

        let h = key_hash(&entry.key);
        let (dir_id, local_index) = self.resolve_slot(h)?;
        let dir_guard = self.pool.pin_page(dir_id, PinMode::DiskIo)?;
        let slot = dir_guard.page().hash_dir_slot(local_index)?;

        let primary_id = match slot {
            Some(id) => {
                drop(dir_guard);
                id
            }
            None => {
                let (bucket_id, bucket_guard) = self.pool.new_page(1)?;
                bucket_guard.page_mut().init(bucket_id, PageType::HashBucketPage)?;
                bucket_guard.try_mutate(|p| p.insert_entry(&entry))?;
                drop(bucket_guard);

                dir_guard.try_mutate(|p| p.set_hash_dir_slot(local_index, Some(bucket_id)))?;
                return Ok(());
            }
        };

        self.insert_into_chain(primary_id, &entry)
    }

    fn insert_into_chain(&self, page_id: PageId, entry: &DataEntry) -> Result<(), HashError> {
        let guard = self.pool.pin_page(page_id, PinMode::DiskIo)?;
        match guard.try_mutate(|p| p.insert_entry(entry)) {
            Ok(()) => Ok(()),
            Err(PageError::SpaceExhausted { .. }) => {
                let next = guard.page().next_page()?;
                match next {
                    Some(next_id) => {
                        drop(guard);
                        self.insert_into_chain(next_id, entry)
                    }
                    None => {
                        let (new_id, new_guard) = self.pool.new_page(1)?;
                        new_guard.page_mut().init(new_id, PageType::HashBucketPage)?;
                        new_guard.try_mutate(|p| p.insert_entry(entry))?;
                        drop(new_guard);

                        guard.try_mutate(|p| p.set_next_page(Some(new_id)))?;
                        Ok(())
                    }
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes `(key, rid)`. Fails with `NotFound` if the bucket is empty
    /// or the chain holds no matching entry. An overflow page left empty
    /// by the removal is spliced out of the chain and freed; the primary
    /// page is always retained, even empty.
    pub fn delete_entry(&self, key: &SearchKey, rid: Rid) -> Result<(), HashError> {
        let h = key_hash(key);
        let (dir_id, local_index) = self.resolve_slot(h)?;
        let dir_guard = self.pool.pin_page(dir_id, PinMode::DiskIo)?;
        let slot = dir_guard.page().hash_dir_slot(local_index)?;
        drop(dir_guard);

        let Some(primary_id) = slot else {
            return Err(HashError::NotFound);
        };
        self.delete_from_chain(primary_id, None, key, rid)
    }

    fn delete_from_chain(
        &self,
        page_id: PageId,
        pred: Option<PageId>,
        key: &SearchKey,
        rid: Rid,
    ) -> Result<(), HashError> {
        let guard = self.pool.pin_page(page_id, PinMode::DiskIo)?;
        let found = guard.try_mutate(|p| p.delete_entry(key, rid))?;

        if found {
            if let Some(pred_id) = pred {
                if guard.page().entry_count()? == 0 {
                    let next = guard.page().next_page()?;
                    drop(guard);
                    let pred_guard = self.pool.pin_page(pred_id, PinMode::DiskIo)?;
                    pred_guard.try_mutate(|p| p.set_next_page(next))?;
                    drop(pred_guard);
                    self.pool.free_page(page_id)?;
                }
            }
            return Ok(());
        }

        let next = guard.page().next_page()?;
        drop(guard);
        match next {
            Some(next_id) => self.delete_from_chain(next_id, Some(page_id), key, rid),
            None => Err(HashError::NotFound),
        }
    }

    /// Prints one line per directory bucket: its index in `D`-wide binary,
    /// and either `null` (empty bucket) or the total live entry count
    /// across its chain.
    pub fn print_summary(&self) -> Result<(), HashError> {
        for h in 0..NUM_BUCKETS {
            let (dir_id, local_index) = self.resolve_slot(h)?;
            let dir_guard = self.pool.pin_page(dir_id, PinMode::DiskIo)?;
            let slot = dir_guard.page().hash_dir_slot(local_index)?;
            drop(dir_guard);

            match slot {
                None => println!("{:0width$b}: null", h, width = HASH_DEPTH as usize),
                Some(primary_id) => {
                    let total = self.chain_entry_count(primary_id)?;
                    println!("{:0width$b}: {}", h, total, width = HASH_DEPTH as usize);
                }
            }
        }
        Ok(())
    }

    fn chain_entry_count(&self, mut page_id: PageId) -> Result<u64, HashError> {
        let mut total = 0u64;
        loop {
            let guard = self.pool.pin_page(page_id, PinMode::DiskIo)?;
            total += guard.page().entry_count()? as u64;
            let next = guard.page().next_page()?;
            drop(guard);
            match next {
                Some(next_id) => page_id = next_id,
                None => break,
            }
        }
        Ok(total)
    }

    /// Frees every bucket chain, then every directory page, and removes
    /// the named-registry entry if this index has one.
    pub fn delete_file(&self) -> Result<(), HashError> {
        let mut dir_id = Some(self.head_id);
        while let Some(id) = dir_id {
            let guard = self.pool.pin_page(id, PinMode::DiskIo)?;
            for local_index in 0..HASH_DIR_MAX_ENTRIES as u32 {
                if let Some(bucket_id) = guard.page().hash_dir_slot(local_index)? {
                    self.free_chain(bucket_id)?;
                }
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

    fn free_chain(&self, mut page_id: PageId) -> Result<(), HashError> {
        loop {
            let guard = self.pool.pin_page(page_id, PinMode::DiskIo)?;
            let next = guard.page().next_page()?;
            drop(guard);
            self.pool.free_page(page_id)?;
            match next {
                Some(next_id) => page_id = next_id,
                None => break,
            }
        }
        Ok(())
    }
}

impl<D: DiskManager> Drop for HashIndex<D> {
    fn drop(&mut self) {
        if self.is_temp {
            if let Err(err) = self.delete_file() {
                tracing::warn!(error = %err, "failed to reclaim temporary hash index on drop");
            }
        }
    }
}
