use buffer::BufferError;
use page::PageError;
use thiserror::Error;

/// Failure modes of `HashIndex` operations.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("data entry of {len} bytes exceeds the {max}-byte limit for a bucket page")]
    EntryTooLarge { len: usize, max: usize },

    #[error("no matching (key, rid) entry found")]
    NotFound,

    #[error("hash directory chain ended before reaching every bucket")]
    TruncatedDirectory,

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Page(#[from] PageError),
}
