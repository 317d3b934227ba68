use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};

use parking_lot::Mutex;

/// A bucket holding at most `capacity` key/value pairs. Buckets live in the
/// directory's arena and may be aliased by several directory slots when
/// their local depth is below the global depth.
#[derive(Debug)]
struct Bucket<K, V> {
    depth: usize,
    items: Vec<(K, V)>,
}

impl<K: Eq, V> Bucket<K, V> {
    fn new(depth: usize, capacity: usize) -> Self {
        Self {
            depth,
            items: Vec::with_capacity(capacity),
        }
    }

    fn find(&self, key: &K) -> Option<&V> {
        self.items.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn remove(&mut self, key: &K) -> bool {
        if let Some(pos) = self.items.iter().position(|(k, _)| k == key) {
            self.items.remove(pos);
            true
        } else {
            false
        }
    }

    /// Inserts a pair, overwriting the value if the key is present.
    /// Returns false if the bucket is full and the key is new.
    fn insert(&mut self, key: K, value: V, capacity: usize) -> bool {
        for (k, v) in self.items.iter_mut() {
            if *k == key {
                *v = value;
                return true;
            }
        }
        if self.items.len() == capacity {
            return false;
        }
        self.items.push((key, value));
        true
    }

    fn is_full(&self, capacity: usize) -> bool {
        self.items.len() >= capacity
    }
}

/// Directory state guarded by the table's single mutex. All methods here
/// assume the lock is already held and never re-acquire it.
#[derive(Debug)]
struct Directory<K, V> {
    global_depth: usize,
    /// Directory slots; each entry is an index into `buckets`
    dir: Vec<usize>,
    /// Bucket arena; a split reuses the old slot for the zero-bit half and
    /// appends the one-bit half, so every slot stays referenced and
    /// `buckets.len()` is the live bucket count
    buckets: Vec<Bucket<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> Directory<K, V> {
    fn dir_index(&self, hash: u64) -> usize {
        let mask = (1usize << self.global_depth) - 1;
        (hash as usize) & mask
    }

    fn bucket_of(&self, hash: u64) -> usize {
        self.dir[self.dir_index(hash)]
    }

    /// Splits the bucket at arena index `target`, redistributing its items
    /// by the `depth`-th hash bit. The directory must already be deep
    /// enough to distinguish the two halves.
    fn split_bucket<S: BuildHasher>(&mut self, target: usize, capacity: usize, hasher: &S) {
        let depth = self.buckets[target].depth;
        let mask = 1usize << depth;

        let items = std::mem::take(&mut self.buckets[target].items);
        self.buckets[target].depth = depth + 1;

        let sibling = self.buckets.len();
        self.buckets.push(Bucket::new(depth + 1, capacity));

        for (k, v) in items {
            let h = hasher.hash_one(&k) as usize;
            if h & mask == 0 {
                self.buckets[target].items.push((k, v));
            } else {
                self.buckets[sibling].items.push((k, v));
            }
        }

        // Rewrite every slot that aliased the old bucket; the one-bit half
        // moves to the sibling. A split may leave one side empty - it still
        // counts as a bucket.
        for (i, slot) in self.dir.iter_mut().enumerate() {
            if *slot == target && i & mask != 0 {
                *slot = sibling;
            }
        }
    }

    /// Doubles the directory by appending a copy of the current slots,
    /// preserving bucket aliases.
    fn grow(&mut self) {
        let old_len = self.dir.len();
        for i in 0..old_len {
            let b = self.dir[i];
            self.dir.push(b);
        }
        self.global_depth += 1;
    }
}

/// A concurrent extendible hash table.
///
/// The directory has `2^global_depth` slots pointing at buckets of fixed
/// capacity; only the overfull bucket splits on insert, and the directory
/// doubles only when a bucket at the global depth must split. Used as the
/// buffer pool's page table and usable as a standalone container.
///
/// Hashing goes through the table's `BuildHasher` (default `RandomState`),
/// stable for the lifetime of one table instance.
pub struct ExtendibleHashTable<K, V, S = RandomState> {
    bucket_size: usize,
    hasher: S,
    state: Mutex<Directory<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> ExtendibleHashTable<K, V, RandomState> {
    /// Creates a table with one empty bucket of the given capacity and
    /// global depth 0.
    pub fn new(bucket_size: usize) -> Self {
        Self::with_hasher(bucket_size, RandomState::new())
    }
}

impl<K: Hash + Eq + Clone, V: Clone, S: BuildHasher> ExtendibleHashTable<K, V, S> {
    pub fn with_hasher(bucket_size: usize, hasher: S) -> Self {
        assert!(bucket_size > 0, "bucket size must be positive");
        Self {
            bucket_size,
            hasher,
            state: Mutex::new(Directory {
                global_depth: 0,
                dir: vec![0],
                buckets: vec![Bucket::new(0, bucket_size)],
            }),
        }
    }

    /// Looks up the value associated with `key`.
    pub fn find(&self, key: &K) -> Option<V> {
        let state = self.state.lock();
        let hash = self.hasher.hash_one(key);
        state.buckets[state.bucket_of(hash)].find(key).cloned()
    }

    /// Inserts a key/value pair, overwriting the value of an existing key.
    /// Splits the target bucket (and doubles the directory as needed) until
    /// the pair fits.
    pub fn insert(&self, key: K, value: V) {
        let mut state = self.state.lock();
        let hash = self.hasher.hash_one(&key);

        // The target slot must be recomputed each round: growing the
        // directory changes which slot the hash lands in.
        loop {
            let target = state.bucket_of(hash);
            if !state.buckets[target].is_full(self.bucket_size) {
                break;
            }
            if state.buckets[target].depth == state.global_depth {
                state.grow();
            }
            let target = state.bucket_of(hash);
            state.split_bucket(target, self.bucket_size, &self.hasher);
        }

        let target = state.bucket_of(hash);
        state.buckets[target].insert(key, value, self.bucket_size);
    }

    /// Removes the pair with the given key. Returns whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        let mut state = self.state.lock();
        let hash = self.hasher.hash_one(key);
        let target = state.bucket_of(hash);
        state.buckets[target].remove(key)
    }

    /// Returns the directory's global depth.
    pub fn global_depth(&self) -> usize {
        self.state.lock().global_depth
    }

    /// Returns the local depth of the bucket referenced by directory slot
    /// `dir_index`.
    pub fn local_depth(&self, dir_index: usize) -> usize {
        let state = self.state.lock();
        state.buckets[state.dir[dir_index]].depth
    }

    /// Returns the number of live buckets.
    pub fn num_buckets(&self) -> usize {
        self.state.lock().buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::Hasher;

    /// Hasher mapping an integer key to itself, for tests that need to
    /// place keys in known buckets.
    #[derive(Default, Clone)]
    pub struct IdentityHasher(u64);

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

        fn write_u32(&mut self, n: u32) {
            self.0 = n as u64;
        }
    }

    #[derive(Default, Clone)]
    pub struct IdentityState;

    impl BuildHasher for IdentityState {
        type Hasher = IdentityHasher;

        fn build_hasher(&self) -> IdentityHasher {
            IdentityHasher::default()
        }
    }

    fn identity_table(bucket_size: usize) -> ExtendibleHashTable<u64, u64, IdentityState> {
        ExtendibleHashTable::with_hasher(bucket_size, IdentityState)
    }

    #[test]
    fn test_insert_find() {
        let table = ExtendibleHashTable::new(4);
        table.insert(1, "a");
        table.insert(2, "b");
        table.insert(3, "c");

        assert_eq!(table.find(&1), Some("a"));
        assert_eq!(table.find(&2), Some("b"));
        assert_eq!(table.find(&3), Some("c"));
        assert_eq!(table.find(&4), None);
    }

    #[test]
    fn test_insert_overwrites() {
        let table = ExtendibleHashTable::new(4);
        table.insert(7, 1);
        table.insert(7, 2);
        assert_eq!(table.find(&7), Some(2));
    }

    #[test]
    fn test_remove() {
        let table = ExtendibleHashTable::new(4);
        table.insert(1, 10);
        assert!(table.remove(&1));
        assert!(!table.remove(&1));
        assert_eq!(table.find(&1), None);
    }

    #[test]
    fn test_growth_with_identity_hash() {
        // Bucket capacity 2, keys hash to themselves. Keys 1..=4 split the
        // directory once; by key 6 both depth-1 buckets have overflowed
        // and the directory must reach depth 2.
        let table = identity_table(2);
        for k in 1..=4u64 {
            table.insert(k, k * 100);
        }
        assert_eq!(table.global_depth(), 1);
        assert_eq!(table.num_buckets(), 2);

        table.insert(5, 500);
        table.insert(6, 600);
        assert!(table.global_depth() >= 2);
        assert!(table.num_buckets() >= 3);
        for k in 1..=6u64 {
            assert_eq!(table.find(&k), Some(k * 100), "lost key {}", k);
        }
    }

    #[test]
    fn test_one_sided_split() {
        // 0 and 8 share the three low bits, forcing repeated splits in which
        // one new bucket stays empty.
        let table = identity_table(2);
        table.insert(0, 0);
        table.insert(8, 8);
        table.insert(16, 16);

        assert_eq!(table.find(&0), Some(0));
        assert_eq!(table.find(&8), Some(8));
        assert_eq!(table.find(&16), Some(16));
        assert!(table.global_depth() >= 4);
    }

    #[test]
    fn test_local_depth_bounded_by_global() {
        let table = identity_table(2);
        for k in 0..32u64 {
            table.insert(k, k);
        }
        let global = table.global_depth();
        for i in 0..(1usize << global) {
            assert!(table.local_depth(i) <= global);
        }
    }

    #[test]
    fn test_scale() {
        let table = ExtendibleHashTable::new(4);
        for k in 0..1000u64 {
            table.insert(k, k * 3);
        }
        for k in 0..1000u64 {
            assert_eq!(table.find(&k), Some(k * 3));
        }
    }
}
