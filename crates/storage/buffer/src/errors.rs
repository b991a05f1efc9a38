use disk::DiskError;
use page::PageId;
use thiserror::Error;

/// Failure modes of `BufferPool`.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("every frame is pinned; clock eviction gave up after two full rotations")]
    PoolExhausted,

    #[error("page {0} is still pinned, cannot be freed")]
    PinnedFree(PageId),

    #[error("page {0} is already pinned; PIN_MEMCPY requires an unpinned frame")]
    AlreadyPinned(PageId),

    #[error(transparent)]
    Disk(#[from] DiskError),
}
