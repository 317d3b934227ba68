//! Quarry - the storage core of an educational disk-oriented RDBMS
//!
//! The crate covers the four subsystems under every disk-oriented database
//! engine, wired together through page pinning and a write-back dirty-bit
//! protocol:
//!
//! - **Disk layer** (`storage::disk`): page-granular file I/O
//!   - `DiskManager`: reads/writes 4 KiB pages and allocates page ids
//!   - `DiskScheduler`: worker-thread request queue with synchronous wrappers
//!
//! - **Buffer pool** (`buffer`): memory management for database pages
//!   - `BufferPoolManager`: caches pages in a fixed set of frames,
//!     enforcing pin counts and routing misses through eviction
//!   - `LruKReplacer`: LRU-K eviction policy over the unpinned frames
//!   - `FrameHeader`: per-frame metadata and page bytes
//!   - `PageGuard`: RAII pin/unpin pairing
//!
//! - **Hash container** (`container`): `ExtendibleHashTable`, the buffer
//!   pool's page table and a standalone concurrent map
//!
//! - **Index** (`index`): `BPlusTree`, a disk-resident B+ tree with point
//!   lookups, range iteration, and root tracking through the header page
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quarry::buffer::BufferPoolManager;
//! use quarry::index::{BPlusTree, IntegerComparator};
//! use quarry::storage::disk::DiskManager;
//! use quarry::{PageId, RecordId, SlotId};
//!
//! // A buffer pool of 100 frames with LRU-2 replacement
//! let disk_manager = Arc::new(DiskManager::new("test.db").unwrap());
//! let bpm = Arc::new(BufferPoolManager::new(100, 2, disk_manager));
//!
//! // Page 0 is the header page recording index roots
//! let (header_id, _frame) = bpm.new_page().unwrap();
//! bpm.unpin_page(header_id, false);
//!
//! let mut tree = BPlusTree::new("orders_pk", Arc::clone(&bpm), IntegerComparator, 64, 64);
//! tree.insert(42, RecordId::new(PageId::new(7), SlotId::new(0))).unwrap();
//! assert!(tree.get_value(42).unwrap().is_some());
//! bpm.flush_all_pages().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod container;
pub mod index;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{FrameId, IndexKey, PageId, QuarryError, RecordId, Result, SlotId};
