//! Integration tests for the LRU-K replacer

use quarry::buffer::LruKReplacer;
use quarry::common::FrameId;

#[test]
fn test_infant_frames_evicted_in_arrival_order() {
    let replacer = LruKReplacer::new(10, 2);

    for i in 0..5 {
        replacer.record_access(FrameId::new(i));
        replacer.set_evictable(FrameId::new(i), true);
    }
    assert_eq!(replacer.size(), 5);

    // All frames have a single access (< k), so they leave oldest-first
    for i in 0..5 {
        assert_eq!(replacer.evict(), Some(FrameId::new(i)));
    }
    assert_eq!(replacer.size(), 0);
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_cached_frame_outlives_infants() {
    // Five frames accessed once each; frame 2 then reaches k accesses.
    // Eviction must keep preferring the infant frames in insertion order.
    let replacer = LruKReplacer::new(10, 2);

    for i in 1..=5 {
        replacer.record_access(FrameId::new(i));
        replacer.set_evictable(FrameId::new(i), true);
    }

    assert_eq!(replacer.evict(), Some(FrameId::new(1)));

    replacer.record_access(FrameId::new(2));
    replacer.record_access(FrameId::new(2));

    // Frame 2 now lives in the cache list; the oldest remaining infant
    // goes first
    assert_eq!(replacer.evict(), Some(FrameId::new(3)));
    assert_eq!(replacer.evict(), Some(FrameId::new(4)));
    assert_eq!(replacer.evict(), Some(FrameId::new(5)));
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
}

#[test]
fn test_sub_k_accesses_do_not_reorder_history() {
    let replacer = LruKReplacer::new(10, 3);

    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(1));
    replacer.record_access(FrameId::new(2));

    // Second accesses (still below k=3) must not refresh positions
    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(1));

    for i in 0..3 {
        replacer.set_evictable(FrameId::new(i), true);
    }

    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
}

#[test]
fn test_cache_list_is_recency_ordered() {
    let replacer = LruKReplacer::new(10, 2);

    for i in 0..3 {
        replacer.record_access(FrameId::new(i));
        replacer.record_access(FrameId::new(i));
        replacer.set_evictable(FrameId::new(i), true);
    }

    // Reheat frame 0: frame 1 becomes the coldest cache entry
    replacer.record_access(FrameId::new(0));

    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
}

#[test]
fn test_size_tracks_evictable_count() {
    let replacer = LruKReplacer::new(10, 2);

    for i in 0..4 {
        replacer.record_access(FrameId::new(i));
    }
    assert_eq!(replacer.size(), 0);

    for i in 0..4 {
        replacer.set_evictable(FrameId::new(i), true);
    }
    assert_eq!(replacer.size(), 4);

    replacer.set_evictable(FrameId::new(0), false);
    replacer.set_evictable(FrameId::new(1), false);
    assert_eq!(replacer.size(), 2);

    // Toggling an already-evictable frame is a no-op
    replacer.set_evictable(FrameId::new(2), true);
    assert_eq!(replacer.size(), 2);

    replacer.evict();
    assert_eq!(replacer.size(), 1);
}

#[test]
fn test_unknown_frame_is_ignored() {
    let replacer = LruKReplacer::new(10, 2);

    // No recorded access: set_evictable must not conjure a frame
    replacer.set_evictable(FrameId::new(3), true);
    assert_eq!(replacer.size(), 0);
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_pinned_frames_skipped() {
    let replacer = LruKReplacer::new(10, 2);

    for i in 0..3 {
        replacer.record_access(FrameId::new(i));
    }
    replacer.set_evictable(FrameId::new(1), true);
    replacer.set_evictable(FrameId::new(2), true);

    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    // Frame 0 stays pinned
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_remove_specific_frame() {
    let replacer = LruKReplacer::new(10, 2);

    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(1));
    replacer.set_evictable(FrameId::new(0), true);
    replacer.set_evictable(FrameId::new(1), true);

    replacer.remove(FrameId::new(0));
    assert_eq!(replacer.size(), 1);
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_evicted_frame_restarts_cold() {
    let replacer = LruKReplacer::new(10, 2);

    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(0));
    replacer.set_evictable(FrameId::new(0), true);
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));

    // The frame lost its history: it re-enters as an infant and leaves
    // before a frame with k accesses
    replacer.record_access(FrameId::new(1));
    replacer.record_access(FrameId::new(1));
    replacer.record_access(FrameId::new(0));
    replacer.set_evictable(FrameId::new(0), true);
    replacer.set_evictable(FrameId::new(1), true);

    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
}

#[test]
fn test_concurrent_access() {
    use std::sync::Arc;
    use std::thread;

    let replacer = Arc::new(LruKReplacer::new(100, 2));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let replacer = Arc::clone(&replacer);
            thread::spawn(move || {
                for i in 0..25 {
                    let frame_id = FrameId::new((t * 25 + i) as u32);
                    replacer.record_access(frame_id);
                    replacer.set_evictable(frame_id, true);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(replacer.size(), 100);
    for _ in 0..100 {
        assert!(replacer.evict().is_some());
    }
    assert_eq!(replacer.size(), 0);
}
