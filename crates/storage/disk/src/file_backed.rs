use std::cell::{Cell, RefCell};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use page::{PageId, PAGE_SIZE};

use crate::api::DiskManager;
use crate::errors::DiskError;
use crate::registry::NamedFileRegistry;

/// `DiskManager` backed by a single file, every page addressed at
/// `page_id.raw() as u64 * PAGE_SIZE`. Adapted from the teacher's
/// `DiskFileManager`, but single-threaded and collapsed to one backing
/// file instead of one per `FileId`, matching the shared `PageId` address
/// space the rest of this crate assumes. The name registry is in-memory
/// only, same as `HeapDiskManager`; a process restart loses it.
#[derive(Debug)]
pub struct FileDiskManager {
    file: RefCell<File>,
    next_id: Cell<i32>,
    registry: NamedFileRegistry,
}

impl FileDiskManager {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();
        let next_id = (len / PAGE_SIZE as u64) as i32;
        Ok(Self {
            file: RefCell::new(file),
            next_id: Cell::new(next_id),
            registry: NamedFileRegistry::new(),
        })
    }

    fn offset(page_id: PageId) -> u64 {
        page_id.raw() as u64 * PAGE_SIZE as u64
    }
}

impl DiskManager for FileDiskManager {
    fn allocate_page(&self, run_size: usize) -> Result<PageId, DiskError> {
        let first = self.next_id.get();
        let run_size = i32::try_from(run_size).map_err(|_| DiskError::OutOfSpace)?;
        let last = first.checked_add(run_size).ok_or(DiskError::OutOfSpace)?;
        self.next_id.set(last);
        let file = self.file.borrow();
        file.set_len(last as u64 * PAGE_SIZE as u64)?;
        Ok(PageId::new(first))
    }

    fn deallocate_page(&self, _page_id: PageId) -> Result<(), DiskError> {
        // No truncation or hole-punching: the file only ever grows, and a
        // deallocated id is simply never read again by a well-behaved caller.
        Ok(())
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<(), DiskError> {
        let offset = Self::offset(page_id);
        let file = self.file.borrow();
        let len = file.metadata()?.len();
        if offset >= len {
            buf.fill(0);
            return Ok(());
        }
        let available = (len - offset).min(PAGE_SIZE as u64) as usize;
        file.read_exact_at(&mut buf[..available], offset)?;
        buf[available..].fill(0);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8; PAGE_SIZE]) -> Result<(), DiskError> {
        let offset = Self::offset(page_id);
        self.file.borrow().write_all_at(buf, offset)?;
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
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips_through_the_file() {
        let dir = tempdir().unwrap();
        let disk = FileDiskManager::open(dir.path().join("heap.db")).unwrap();
        let id = disk.allocate_page(1).unwrap();
        let buf = [42u8; PAGE_SIZE];
        disk.write_page(id, &buf).unwrap();

        let mut read_back = [0u8; PAGE_SIZE];
        disk.read_page(id, &mut read_back).unwrap();
        assert_eq!(read_back, buf);
    }

    #[test]
    fn allocated_but_unwritten_page_reads_back_as_zero() {
        let dir = tempdir().unwrap();
        let disk = FileDiskManager::open(dir.path().join("heap.db")).unwrap();
        let id = disk.allocate_page(1).unwrap();
        let mut buf = [0xffu8; PAGE_SIZE];
        disk.read_page(id, &mut buf).unwrap();
        assert_eq!(buf, [0u8; PAGE_SIZE]);
    }

    #[test]
    fn registry_survives_within_a_session() {
        let dir = tempdir().unwrap();
        let disk = FileDiskManager::open(dir.path().join("heap.db")).unwrap();
        let id = disk.allocate_page(1).unwrap();
        disk.add_file_entry("orders", id);
        assert_eq!(disk.get_file_entry("orders"), Some(id));
    }

    #[test]
    fn reopening_an_existing_file_resumes_allocation_after_its_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("heap.db");
        let first_id = {
            let disk = FileDiskManager::open(&path).unwrap();
            disk.allocate_page(4).unwrap()
        };
        let disk = FileDiskManager::open(&path).unwrap();
        let next_id = disk.allocate_page(1).unwrap();
        assert_eq!(next_id.raw(), first_id.raw() + 4);
    }
}
