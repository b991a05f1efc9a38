use buffer::BufferPool;
use disk::{DiskManager, FileDiskManager};
use hash::HashIndex;
use heap::HeapFile;

use crate::config::StorageConfig;
use crate::errors::StorageError;

/// The facade a client embeds: wires a `DiskManager` to a `BufferPool` and
/// constructs `HeapFile`/`HashIndex` instances against it. Replaces the
/// teacher's `StorageManager<F>`, which wrapped a `FileManager` and a
/// `BufferManager` behind `Arc` for a multi-threaded engine; this one holds
/// a single `BufferPool` handle, cheap to clone, matching the
/// single-threaded cooperative model the rest of this core assumes.
#[derive(Debug)]
pub struct StorageManager<D: DiskManager> {
    pool: BufferPool<D>,
}

impl<D: DiskManager> Clone for StorageManager<D> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<D: DiskManager> StorageManager<D> {
    pub fn new(pool: BufferPool<D>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &BufferPool<D> {
        &self.pool
    }

    /// Opens `name` if already registered, otherwise creates a fresh heap
    /// file. `name = None` creates a temporary heap file, reclaimed when
    /// the returned `HeapFile` is dropped.
    pub fn open_heap(&self, name: Option<&str>) -> Result<HeapFile<D>, StorageError> {
        Ok(HeapFile::open(self.pool.clone(), name)?)
    }

    /// Opens `name` if already registered, otherwise creates a fresh hash
    /// index. `name = None` creates a temporary index, reclaimed when the
    /// returned `HashIndex` is dropped.
    pub fn open_hash_index(&self, name: Option<&str>) -> Result<HashIndex<D>, StorageError> {
        Ok(HashIndex::open(self.pool.clone(), name)?)
    }

    /// Writes every dirty resident frame back to disk.
    pub fn flush_all(&self) -> Result<usize, StorageError> {
        Ok(self.pool.flush_all()?)
    }
}

impl StorageManager<FileDiskManager> {
    /// Opens a file-backed storage manager rooted at `config.data_dir`,
    /// sized to `config.buffer_frames` buffer frames.
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let disk = FileDiskManager::open(config.data_dir.join("heap.db"))?;
        let pool = BufferPool::new(disk, config.buffer_frames.get());
        Ok(Self::new(pool))
    }
}
