use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use page::{PageId, PAGE_SIZE};

use crate::api::DiskManager;
use crate::errors::DiskError;
use crate::registry::NamedFileRegistry;

/// `DiskManager` backed by an in-process `HashMap`, for tests and engines
/// that never need to survive process restart. Adapted from the teacher's
/// `InMemoryFileManager`, but single-threaded (`RefCell`/`Cell` instead of
/// `RwLock`) and addressing one shared `PageId` space instead of one page
/// space per `FileId`.
#[derive(Debug, Default)]
pub struct HeapDiskManager {
    pages: RefCell<HashMap<PageId, [u8; PAGE_SIZE]>>,
    next_id: Cell<i32>,
    registry: NamedFileRegistry,
}

impl HeapDiskManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiskManager for HeapDiskManager {
    fn allocate_page(&self, run_size: usize) -> Result<PageId, DiskError> {
        let first = self.next_id.get();
        let run_size = i32::try_from(run_size).map_err(|_| DiskError::OutOfSpace)?;
        self.next_id
            .set(first.checked_add(run_size).ok_or(DiskError::OutOfSpace)?);
        Ok(PageId::new(first))
    }

    fn deallocate_page(&self, page_id: PageId) -> Result<(), DiskError> {
        self.pages.borrow_mut().remove(&page_id);
        Ok(())
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<(), DiskError> {
        match self.pages.borrow().get(&page_id) {
            Some(bytes) => *buf = *bytes,
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8; PAGE_SIZE]) -> Result<(), DiskError> {
        self.pages.borrow_mut().insert(page_id, *buf);
        Ok(())
    }

    fn get_file_entry(&self, name: &str) -> Option<PageId> {
        self.registry.get(name)
    }

    fn add_file_entry(&self, name: &str, page_id: PageId) {
        self.registry.add(name, page_id);
    }

    fn delete_file_entry(&self, name: &str) {
        self.registry.delete(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_allocated_page_reads_back_as_zero() {
        let disk = HeapDiskManager::new();
        let id = disk.allocate_page(1).unwrap();
        let mut buf = [0xffu8; PAGE_SIZE];
        disk.read_page(id, &mut buf).unwrap();
        assert_eq!(buf, [0u8; PAGE_SIZE]);
    }

    #[test]
    fn write_then_read_round_trips() {
        let disk = HeapDiskManager::new();
        let id = disk.allocate_page(1).unwrap();
        let mut buf = [7u8; PAGE_SIZE];
        disk.write_page(id, &buf).unwrap();
        buf = [0u8; PAGE_SIZE];
        disk.read_page(id, &mut buf).unwrap();
        assert_eq!(buf, [7u8; PAGE_SIZE]);
    }

    #[test]
    fn allocate_page_hands_out_distinct_runs() {
        let disk = HeapDiskManager::new();
        let a = disk.allocate_page(3).unwrap();
        let b = disk.allocate_page(1).unwrap();
        assert_eq!(b.raw(), a.raw() + 3);
    }

    #[test]
    fn named_entries_round_trip_through_the_registry() {
        let disk = HeapDiskManager::new();
        let id = disk.allocate_page(1).unwrap();
        disk.add_file_entry("orders", id);
        assert_eq!(disk.get_file_entry("orders"), Some(id));
        disk.delete_file_entry("orders");
        assert_eq!(disk.get_file_entry("orders"), None);
    }
}
