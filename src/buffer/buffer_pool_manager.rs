use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{
    FrameId, PageId, QuarryError, Result, DEFAULT_BUCKET_SIZE, PAGE_SIZE,
};
use crate::container::ExtendibleHashTable;
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::{FrameHeader, LruKReplacer};

/// State mutated only under the pool latch.
struct PoolState {
    /// Frames not currently holding any page
    free_list: VecDeque<FrameId>,
}

/// BufferPoolManager mediates all access to disk pages through a fixed set
/// of in-memory frames. Misses pull pages in from disk, evicting an
/// unpinned victim chosen by the LRU-K replacer when no frame is free; the
/// extendible hash table serves as the page table mapping resident page ids
/// to frames.
///
/// Every public operation runs under one pool latch, so the pin-count /
/// evictable coupling is never observed half-done.
pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<Arc<FrameHeader>>,
    page_table: ExtendibleHashTable<PageId, FrameId>,
    replacer: LruKReplacer,
    latch: Mutex<PoolState>,
    disk_scheduler: DiskScheduler,
}

impl BufferPoolManager {
    /// Creates a buffer pool with `pool_size` frames and an LRU-K replacer
    /// with the given k.
    pub fn new(pool_size: usize, replacer_k: usize, disk_manager: Arc<DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(FrameHeader::new(frame_id)));
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            frames,
            page_table: ExtendibleHashTable::new(DEFAULT_BUCKET_SIZE),
            replacer: LruKReplacer::new(pool_size, replacer_k),
            latch: Mutex::new(PoolState { free_list }),
            disk_scheduler: DiskScheduler::new(disk_manager),
        }
    }

    /// Allocates a fresh page id and installs it in a frame, zeroed and
    /// pinned once. Fails with `BufferPoolFull` when every frame is pinned;
    /// the page id is consumed either way.
    pub fn new_page(&self) -> Result<(PageId, Arc<FrameHeader>)> {
        let mut state = self.latch.lock();

        let page_id = self.disk_scheduler.disk_manager().allocate_page();
        let frame_id = self.find_victim(&mut state)?;
        let frame = &self.frames[frame_id.as_usize()];

        frame.reset();
        frame.set_page_id(page_id);
        frame.pin();

        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        Ok((page_id, Arc::clone(frame)))
    }

    /// Returns the frame holding `page_id`, pinned once more. On a miss the
    /// page is read from disk into a free or evicted frame.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<FrameHeader>> {
        if !page_id.is_valid() {
            return Err(QuarryError::InvalidPageId(page_id));
        }

        let mut state = self.latch.lock();

        if let Some(frame_id) = self.page_table.find(&page_id) {
            let frame = &self.frames[frame_id.as_usize()];
            frame.pin();
            self.replacer.set_evictable(frame_id, false);
            self.replacer.record_access(frame_id);
            return Ok(Arc::clone(frame));
        }

        let frame_id = self.find_victim(&mut state)?;
        let frame = &self.frames[frame_id.as_usize()];

        let mut buf = [0u8; PAGE_SIZE];
        self.disk_scheduler.schedule_read_sync(page_id, &mut buf)?;

        frame.set_page_id(page_id);
        frame.copy_from(&buf);
        frame.set_dirty(false);
        frame.pin();

        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);

        Ok(Arc::clone(frame))
    }

    /// Drops one pin on `page_id`, recording whether the caller dirtied it.
    /// Returns false if the page is not resident or was not pinned. When
    /// the last pin goes away the frame becomes evictable.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let _state = self.latch.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.as_usize()];

        match frame.unpin() {
            None => false,
            Some(remaining) => {
                if remaining == 0 {
                    self.replacer.set_evictable(frame_id, true);
                }
                if is_dirty {
                    frame.set_dirty(true);
                }
                true
            }
        }
    }

    /// Writes `page_id` to disk regardless of its dirty flag and clears the
    /// flag. Returns false for invalid or non-resident ids.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if !page_id.is_valid() {
            return Ok(false);
        }

        let _state = self.latch.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return Ok(false);
        };
        let frame = &self.frames[frame_id.as_usize()];

        let mut buf = [0u8; PAGE_SIZE];
        frame.copy_to(&mut buf);
        self.disk_scheduler.schedule_write_sync(page_id, &buf)?;
        frame.set_dirty(false);

        Ok(true)
    }

    /// Writes every resident dirty page to disk and clears the dirty flags.
    pub fn flush_all_pages(&self) -> Result<()> {
        let _state = self.latch.lock();

        for frame in &self.frames {
            let page_id = frame.page_id();
            if page_id.is_valid() && frame.is_dirty() {
                let mut buf = [0u8; PAGE_SIZE];
                frame.copy_to(&mut buf);
                self.disk_scheduler.schedule_write_sync(page_id, &buf)?;
                frame.set_dirty(false);
            }
        }

        Ok(())
    }

    /// Removes `page_id` from the pool and returns its id to the
    /// allocator. Returns true if the page was absent or removed, false if
    /// it is still pinned. A dirty page is written back first.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut state = self.latch.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return Ok(true);
        };
        let frame = &self.frames[frame_id.as_usize()];

        if frame.pin_count() > 0 {
            return Ok(false);
        }

        if frame.is_dirty() {
            let mut buf = [0u8; PAGE_SIZE];
            frame.copy_to(&mut buf);
            self.disk_scheduler.schedule_write_sync(page_id, &buf)?;
        }

        self.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        state.free_list.push_back(frame_id);
        frame.reset();

        self.disk_scheduler.disk_manager().deallocate_page(page_id);
        Ok(true)
    }

    /// Returns the pin count of a resident page.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let _state = self.latch.lock();
        self.page_table
            .find(&page_id)
            .map(|frame_id| self.frames[frame_id.as_usize()].pin_count())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns the number of frames on the free list.
    pub fn free_frame_count(&self) -> usize {
        self.latch.lock().free_list.len()
    }

    /// Returns the number of frames currently holding at least one pin.
    pub fn pinned_frame_count(&self) -> usize {
        let _state = self.latch.lock();
        self.frames.iter().filter(|f| f.pin_count() > 0).count()
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        self.disk_scheduler.disk_manager()
    }

    /// The shared miss path of `new_page` and `fetch_page`: pop a free
    /// frame, or evict a victim (writing it back if dirty) and unmap it.
    fn find_victim(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self
            .replacer
            .evict()
            .ok_or(QuarryError::BufferPoolFull)?;
        let frame = &self.frames[frame_id.as_usize()];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            let mut buf = [0u8; PAGE_SIZE];
            frame.copy_to(&mut buf);
            self.disk_scheduler.schedule_write_sync(old_page_id, &buf)?;
        }

        self.page_table.remove(&old_page_id);
        frame.reset();

        Ok(frame_id)
    }
}
