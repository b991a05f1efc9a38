use page::PageId;
use thiserror::Error;

/// Failure modes of a `DiskManager` implementation.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("disk manager has no more pages to allocate")]
    OutOfSpace,

    #[error("page {0} has no backing storage")]
    NotFound(PageId),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
