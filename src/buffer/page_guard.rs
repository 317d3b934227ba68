use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, Result, PAGE_SIZE};

use super::{BufferPoolManager, FrameHeader};

/// RAII pairing of a pinned page with its required unpin.
///
/// Fetching or creating a page through a guard pins the frame; dropping the
/// guard unpins it, passing along whether the page was dirtied via
/// `data_mut`. The B+ tree does all of its page access through guards so
/// that every exit path, including error propagation, releases its pins.
pub struct PageGuard {
    bpm: Arc<BufferPoolManager>,
    frame: Arc<FrameHeader>,
    page_id: PageId,
    dirty: bool,
}

impl PageGuard {
    /// Pins an existing page.
    pub fn fetch(bpm: &Arc<BufferPoolManager>, page_id: PageId) -> Result<Self> {
        let frame = bpm.fetch_page(page_id)?;
        Ok(Self {
            bpm: Arc::clone(bpm),
            frame,
            page_id,
            dirty: false,
        })
    }

    /// Allocates a fresh zeroed page, pinned.
    pub fn create(bpm: &Arc<BufferPoolManager>) -> Result<Self> {
        let (page_id, frame) = bpm.new_page()?;
        Ok(Self {
            bpm: Arc::clone(bpm),
            frame,
            page_id,
            dirty: false,
        })
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Read access to the page bytes. The returned lock guard must be
    /// released before any further buffer pool call.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.frame.read_data()
    }

    /// Write access to the page bytes; marks the page dirty.
    pub fn data_mut(&mut self) -> RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.dirty = true;
        self.frame.write_data()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        self.bpm.unpin_page(self.page_id, self.dirty);
    }
}
