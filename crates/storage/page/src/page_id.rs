use std::fmt;

/// A page identifier: a plain 32-bit value in the disk manager's shared
/// page-id space. `-1` is reserved to mean "no page" and is never held
/// directly - use `Option<PageId>` at in-memory boundaries instead (see
/// `PageId::to_raw`/`PageId::from_raw`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(i32);

/// On-disk sentinel for "no page". Never appears as a live `PageId` value;
/// it only exists at the header-field read/write boundary.
pub const INVALID_PAGEID: i32 = -1;

/// Slot number reserved to mean "no slot" / "empty slot entry".
pub const EMPTY_SLOT: u16 = 0;

impl PageId {
    /// Builds a `PageId` from a non-negative raw value.
    ///
    /// # Panics
    /// Panics if `raw == INVALID_PAGEID`; callers that might hold the
    /// sentinel should go through [`PageId::from_raw`] instead.
    pub fn new(raw: i32) -> Self {
        assert_ne!(raw, INVALID_PAGEID, "INVALID_PAGEID is not a valid PageId");
        Self(raw)
    }

    /// Returns the raw 32-bit value.
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Converts a header-field value into `Option<PageId>`, mapping the
    /// `-1` sentinel to `None`.
    pub fn from_raw(raw: i32) -> Option<Self> {
        if raw == INVALID_PAGEID {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Converts `Option<PageId>` back into the on-disk sentinel encoding.
    pub fn to_raw(value: Option<PageId>) -> i32 {
        value.map_or(INVALID_PAGEID, |id| id.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record identifier: the page it lives on plus its slot number within
/// that page. Slot numbers are one-based; slot `0` (`EMPTY_SLOT`) never
/// appears in a live `Rid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page_id: PageId,
    pub slot_no: u16,
}

impl Rid {
    pub fn new(page_id: PageId, slot_no: u16) -> Self {
        debug_assert_ne!(slot_no, EMPTY_SLOT, "slot 0 is reserved");
        Self { page_id, slot_no }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_no)
    }
}
