use buffer::BufferError;
use page::{PageError, PageId};
use thiserror::Error;

/// Failure modes of `HeapFile` operations.
#[derive(Debug, Error)]
pub enum HeapError {
    #[error("record of {len} bytes exceeds the {max}-byte limit for a data page")]
    RecordTooLarge { len: usize, max: usize },

    #[error("no directory entry found for data page {0}")]
    DirEntryNotFound(PageId),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Page(#[from] PageError),
}
