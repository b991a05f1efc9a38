//! Page-addressed persistence underneath the buffer pool: the
//! `DiskManager` trait and its in-memory and file-backed implementations.

pub mod api;
pub mod errors;
pub mod file_backed;
pub mod in_memory;
pub mod registry;

pub use api::DiskManager;
pub use errors::DiskError;
pub use file_backed::FileDiskManager;
pub use in_memory::HeapDiskManager;
pub use registry::NamedFileRegistry;
