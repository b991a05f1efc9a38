use std::cell::RefCell;
use std::collections::HashMap;

use page::PageId;

/// Maps the names a `storage-api` engine hands out (heap file names, hash
/// index names) to the head `PageId` that anchors them. Kept separate from
/// the page data itself: neither `HeapDiskManager` nor `FileDiskManager`
/// persists this mapping to stable storage, matching the teacher's
/// `FileCatalog`, which only ever lived in memory for the lifetime of a
/// process.
#[derive(Debug, Default)]
pub struct NamedFileRegistry {
    entries: RefCell<HashMap<String, PageId>>,
}

impl NamedFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<PageId> {
        self.entries.borrow().get(name).copied()
    }

    pub fn add(&self, name: &str, page_id: PageId) {
        self.entries.borrow_mut().insert(name.to_string(), page_id);
    }

    pub fn delete(&self, name: &str) {
        self.entries.borrow_mut().remove(name);
    }
}
