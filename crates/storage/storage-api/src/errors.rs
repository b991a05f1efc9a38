use thiserror::Error;

/// Failure modes surfaced by [`crate::StorageManager`], unifying the
/// per-crate error types of its collaborators.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Heap(#[from] heap::HeapError),

    #[error(transparent)]
    Hash(#[from] hash::HashError),

    #[error(transparent)]
    Buffer(#[from] buffer::BufferError),

    #[error("failed to open data file")]
    Io(#[from] std::io::Error),
}
