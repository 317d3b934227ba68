use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::FrameId;

#[derive(Debug, Default)]
struct FrameInfo {
    hit_count: usize,
    evictable: bool,
}

/// Replacer state guarded by a single mutex.
///
/// Frames with fewer than k recorded accesses live in `history`, ordered by
/// first access (newest at the front). Frames with at least k accesses live
/// in `cache`, ordered by most recent access (newest at the front). Eviction
/// scans `history` from the back first, so infant frames leave in arrival
/// order regardless of access bursts.
#[derive(Debug, Default)]
struct ReplacerState {
    history: VecDeque<FrameId>,
    cache: VecDeque<FrameId>,
    frames: HashMap<FrameId, FrameInfo>,
    curr_size: usize,
}

impl ReplacerState {
    fn detach(&mut self, frame_id: FrameId, k: usize) {
        let list = if self.frames[&frame_id].hit_count < k {
            &mut self.history
        } else {
            &mut self.cache
        };
        if let Some(pos) = list.iter().position(|&f| f == frame_id) {
            list.remove(pos);
        }
    }

    /// Scans a list from the back for the first evictable frame.
    fn scan_back(list: &VecDeque<FrameId>, frames: &HashMap<FrameId, FrameInfo>) -> Option<usize> {
        list.iter()
            .rposition(|f| frames.get(f).map_or(false, |info| info.evictable))
    }
}

/// LRU-K replacement policy.
///
/// The victim is the evictable frame whose k-th most recent access lies
/// furthest in the past; frames with fewer than k accesses count as
/// infinitely far and are preferred, oldest first.
pub struct LruKReplacer {
    k: usize,
    /// Frames with ids at or above this bound are ignored
    replacer_size: usize,
    state: Mutex<ReplacerState>,
}

impl LruKReplacer {
    /// Creates a new LRU-K replacer tracking up to `num_frames` frames.
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k > 0, "k must be positive");
        Self {
            k,
            replacer_size: num_frames,
            state: Mutex::new(ReplacerState::default()),
        }
    }

    /// Records an access to the given frame.
    ///
    /// The first access enqueues the frame in the history list; the k-th
    /// promotes it to the cache list. Accesses in between do not reorder
    /// the history list, and cache hits move the frame to the cache front.
    pub fn record_access(&self, frame_id: FrameId) {
        if frame_id.as_usize() >= self.replacer_size {
            return;
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let entry = state.frames.entry(frame_id).or_default();
        entry.hit_count += 1;
        let count = entry.hit_count;

        if count < self.k {
            // Only the first access takes a history slot; later sub-k
            // accesses keep the frame's position
            if count == 1 {
                state.history.push_front(frame_id);
            }
        } else if count == self.k {
            if let Some(pos) = state.history.iter().position(|&f| f == frame_id) {
                state.history.remove(pos);
            }
            state.cache.push_front(frame_id);
        } else {
            if let Some(pos) = state.cache.iter().position(|&f| f == frame_id) {
                state.cache.remove(pos);
            }
            state.cache.push_front(frame_id);
        }
    }

    /// Marks a frame evictable or pinned. Unknown frames (no recorded
    /// access) are ignored.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        if frame_id.as_usize() >= self.replacer_size {
            return;
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(info) = state.frames.get_mut(&frame_id) else {
            return;
        };
        if info.evictable != evictable {
            info.evictable = evictable;
            if evictable {
                state.curr_size += 1;
            } else {
                state.curr_size -= 1;
            }
        }
    }

    /// Evicts the frame with the largest backward k-distance among the
    /// evictable frames, clearing all of its state. Returns `None` when no
    /// frame is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        if state.curr_size == 0 {
            return None;
        }

        if let Some(pos) = ReplacerState::scan_back(&state.history, &state.frames) {
            let frame_id = state.history.remove(pos).unwrap();
            state.frames.remove(&frame_id);
            state.curr_size -= 1;
            return Some(frame_id);
        }

        if let Some(pos) = ReplacerState::scan_back(&state.cache, &state.frames) {
            let frame_id = state.cache.remove(pos).unwrap();
            state.frames.remove(&frame_id);
            state.curr_size -= 1;
            return Some(frame_id);
        }

        None
    }

    /// Removes a specific frame from the replacer. The frame must be
    /// evictable; pinned or unknown frames are left untouched.
    pub fn remove(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        match state.frames.get(&frame_id) {
            Some(info) if info.evictable => {}
            _ => return,
        }
        state.detach(frame_id, self.k);
        state.frames.remove(&frame_id);
        state.curr_size -= 1;
    }

    /// Returns the number of evictable frames.
    pub fn size(&self) -> usize {
        self.state.lock().curr_size
    }

    /// Returns the k value of this replacer.
    pub fn k(&self) -> usize {
        self.k
    }
}
