use page::{PageId, PAGE_SIZE};

use crate::errors::DiskError;

/// Persists fixed-size pages under `PageId` addresses and remembers the
/// named entry points (heap files, hash indexes) an engine has registered.
/// `BufferPool` is the only caller: every method here is a direct disk
/// access with no caching of its own.
pub trait DiskManager {
    /// Reserves `run_size` consecutive fresh page ids and returns the first
    /// one. Freshly allocated pages read back as all-zero until written.
    fn allocate_page(&self, run_size: usize) -> Result<PageId, DiskError>;

    /// Releases a page's backing storage. Does not renumber or compact
    /// other pages; a freed id is simply never read again by a well-behaved
    /// caller.
    fn deallocate_page(&self, page_id: PageId) -> Result<(), DiskError>;

    fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<(), DiskError>;

    fn write_page(&self, page_id: PageId, buf: &[u8; PAGE_SIZE]) -> Result<(), DiskError>;

    /// Looks up the head page id a named heap file or hash index was last
    /// registered under.
    fn get_file_entry(&self, name: &str) -> Option<PageId>;

    fn add_file_entry(&self, name: &str, page_id: PageId);

    fn delete_file_entry(&self, name: &str);
}
