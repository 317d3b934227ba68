//! Integration tests for the extendible hash table

use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;
use std::thread;

use quarry::container::ExtendibleHashTable;

/// Hashes integer keys to themselves so bucket placement is predictable.
#[derive(Default, Clone)]
struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, _bytes: &[u8]) {
        unimplemented!("identity hasher only supports integer keys")
    }

    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
}

#[derive(Default, Clone)]
struct IdentityState;

impl BuildHasher for IdentityState {
    type Hasher = IdentityHasher;

    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher::default()
    }
}

#[test]
fn test_basic_insert_find_remove() {
    let table = ExtendibleHashTable::new(4);

    table.insert(1, "a");
    table.insert(2, "b");
    table.insert(3, "c");

    assert_eq!(table.find(&1), Some("a"));
    assert_eq!(table.find(&2), Some("b"));
    assert_eq!(table.find(&3), Some("c"));
    assert_eq!(table.find(&99), None);

    assert!(table.remove(&2));
    assert_eq!(table.find(&2), None);
    assert!(!table.remove(&2));
}

#[test]
fn test_overwrite_existing_key() {
    let table = ExtendibleHashTable::new(2);
    for round in 0..3 {
        for k in 0..10u64 {
            table.insert(k, k + round);
        }
    }
    for k in 0..10u64 {
        assert_eq!(table.find(&k), Some(k + 2));
    }
}

#[test]
fn test_directory_growth() {
    // Bucket capacity 2 with identity hashing. Keys 1..=4 fill two depth-1
    // buckets exactly; keys 5 and 6 overflow them both, forcing the
    // directory to depth >= 2 with at least three live buckets.
    let table = ExtendibleHashTable::with_hasher(2, IdentityState);

    table.insert(1u64, 'a');
    table.insert(2u64, 'b');
    table.insert(3u64, 'c');
    table.insert(4u64, 'd');
    assert_eq!(table.global_depth(), 1);
    assert_eq!(table.num_buckets(), 2);

    table.insert(5u64, 'e');
    table.insert(6u64, 'f');
    assert!(table.global_depth() >= 2);
    assert!(table.num_buckets() >= 3);

    assert_eq!(table.find(&1), Some('a'));
    assert_eq!(table.find(&2), Some('b'));
    assert_eq!(table.find(&3), Some('c'));
    assert_eq!(table.find(&4), Some('d'));
    assert_eq!(table.find(&5), Some('e'));
    assert_eq!(table.find(&6), Some('f'));
}

#[test]
fn test_starts_with_single_bucket() {
    let table = ExtendibleHashTable::<u64, u64>::new(8);
    assert_eq!(table.global_depth(), 0);
    assert_eq!(table.num_buckets(), 1);
    assert_eq!(table.local_depth(0), 0);
}

#[test]
fn test_local_depths_after_growth() {
    let table = ExtendibleHashTable::with_hasher(2, IdentityState);
    for k in 0..16u64 {
        table.insert(k, k);
    }

    let global = table.global_depth();
    assert!(global >= 3);
    for i in 0..(1usize << global) {
        assert!(table.local_depth(i) <= global);
    }
    for k in 0..16u64 {
        assert_eq!(table.find(&k), Some(k));
    }
}

#[test]
fn test_skewed_keys_split_one_sided() {
    // All keys share their low four bits, so every split until depth 4
    // leaves one of the two new buckets empty.
    let table = ExtendibleHashTable::with_hasher(2, IdentityState);
    table.insert(0u64, 0);
    table.insert(16u64, 16);
    table.insert(32u64, 32);

    assert_eq!(table.find(&0), Some(0));
    assert_eq!(table.find(&16), Some(16));
    assert_eq!(table.find(&32), Some(32));
    assert!(table.global_depth() >= 5);
}

#[test]
fn test_many_keys() {
    let table = ExtendibleHashTable::new(4);
    for k in 0..5000u64 {
        table.insert(k, k * 7);
    }
    for k in 0..5000u64 {
        assert_eq!(table.find(&k), Some(k * 7), "lost key {}", k);
    }
}

#[test]
fn test_concurrent_inserts() {
    let table = Arc::new(ExtendibleHashTable::new(4));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..500u64 {
                    let key = t * 500 + i;
                    table.insert(key, key * 2);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for key in 0..2000u64 {
        assert_eq!(table.find(&key), Some(key * 2));
    }
}
