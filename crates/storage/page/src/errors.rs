use crate::page_id::Rid;
use binary_helpers::BinaryError;
use thiserror::Error;

/// Failure modes of the slotted-page layer (`HFPage`/`SortedPage`).
#[derive(Debug, Error)]
pub enum PageError {
    #[error("record of {needed} bytes does not fit in {available} free bytes")]
    SpaceExhausted { needed: usize, available: usize },

    #[error("rid {rid} does not name a valid slot (slot_count = {slot_count})")]
    InvalidRid { rid: Rid, slot_count: u16 },

    #[error("update changes record length from {old_len} to {new_len}; update_record requires an equal length")]
    InvalidUpdate { old_len: usize, new_len: usize },

    #[error("record of {len} bytes exceeds the {max} byte maximum")]
    RecordTooLarge { len: usize, max: usize },

    #[error("unrecognized page type tag: {0}")]
    UnknownPageType(u16),

    #[error(transparent)]
    Binary(#[from] BinaryError),
}
