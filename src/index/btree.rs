use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use crate::buffer::{BufferPoolManager, PageGuard};
use crate::common::{
    IndexKey, PageId, QuarryError, RecordId, Result, HEADER_PAGE_ID, INVALID_PAGE_ID,
};
use crate::storage::page::{HeaderPage, HeaderPageRef};

use super::btree_page::{self, BTreePageType, InternalPage, LeafPage};
use super::iterator::TreeIterator;
use super::key_comparator::{IntegerComparator, KeyComparator};

/// A disk-resident B+ tree index mapping unique keys to record ids.
///
/// Internal pages route the descent and leaf pages hold the data plus a
/// sibling link for range scans. All page access goes through the buffer
/// pool: fetch, reinterpret the frame bytes as a node view, read or
/// mutate, unpin - with page guards enforcing the unpin half.
///
/// The tree assumes a single writer; concurrent readers are safe because
/// every page access is pinned through the thread-safe buffer pool.
pub struct BPlusTree<C: KeyComparator = IntegerComparator> {
    index_name: String,
    root_page_id: PageId,
    bpm: Arc<BufferPoolManager>,
    comparator: C,
    leaf_max_size: usize,
    internal_max_size: usize,
}

impl<C: KeyComparator> BPlusTree<C> {
    /// Creates an empty tree. Nothing is written until the first insert,
    /// which records the root under `name` in the header page.
    pub fn new(
        name: impl Into<String>,
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Self {
        assert!(leaf_max_size >= 2 && leaf_max_size <= btree_page::LEAF_PAGE_CAPACITY);
        assert!(internal_max_size >= 3 && internal_max_size < btree_page::INTERNAL_PAGE_CAPACITY);
        Self {
            index_name: name.into(),
            root_page_id: INVALID_PAGE_ID,
            bpm,
            comparator,
            leaf_max_size,
            internal_max_size,
        }
    }

    /// Reopens a tree whose root is recorded in the header page. A missing
    /// record yields an empty tree.
    pub fn open(
        name: impl Into<String>,
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Result<Self> {
        let mut tree = Self::new(name, bpm, comparator, leaf_max_size, internal_max_size);
        let guard = PageGuard::fetch(&tree.bpm, HEADER_PAGE_ID)?;
        let root = {
            let data = guard.data();
            HeaderPageRef::new(&data[..]).get_root_id(&tree.index_name)
        };
        tree.root_page_id = root.unwrap_or(INVALID_PAGE_ID);
        Ok(tree)
    }

    pub fn is_empty(&self) -> bool {
        !self.root_page_id.is_valid()
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    /// Point lookup: returns the record id stored under `key`.
    pub fn get_value(&self, key: IndexKey) -> Result<Option<RecordId>> {
        if self.is_empty() {
            return Ok(None);
        }
        let guard = self.find_leaf(key)?;
        let data = guard.data();
        Ok(LeafPage::new(&data[..]).lookup(key, &self.comparator))
    }

    /// Inserts a key/value pair. Returns false if the key already exists.
    pub fn insert(&mut self, key: IndexKey, value: RecordId) -> Result<bool> {
        if self.is_empty() {
            self.start_new_tree(key, value)?;
            return Ok(true);
        }

        let mut leaf_guard = self.find_leaf(key)?;

        let exists = {
            let data = leaf_guard.data();
            LeafPage::new(&data[..]).lookup(key, &self.comparator).is_some()
        };
        if exists {
            return Ok(false);
        }

        let size = {
            let mut data = leaf_guard.data_mut();
            let mut leaf = LeafPage::new(&mut data[..]);
            leaf.insert(key, value, &self.comparator);
            leaf.size()
        };

        // Leaves split after the size overflows to max_size
        if size == self.leaf_max_size {
            self.split_leaf(leaf_guard)?;
        }
        Ok(true)
    }

    /// Removes a key. Returns false if it was not present. Underfull pages
    /// borrow from a sibling or merge, and the root collapses when it runs
    /// out of entries.
    pub fn remove(&mut self, key: IndexKey) -> Result<bool> {
        if self.is_empty() {
            return Ok(false);
        }

        let mut leaf_guard = self.find_leaf(key)?;

        let present = {
            let data = leaf_guard.data();
            LeafPage::new(&data[..]).lookup(key, &self.comparator).is_some()
        };
        if !present {
            return Ok(false);
        }
        {
            let mut data = leaf_guard.data_mut();
            LeafPage::new(&mut data[..]).remove(key, &self.comparator);
        }

        let (leaf_id, size) = {
            let data = leaf_guard.data();
            let leaf = LeafPage::new(&data[..]);
            (leaf.page_id(), leaf.size())
        };

        if leaf_id == self.root_page_id {
            if size == 0 {
                drop(leaf_guard);
                self.bpm.delete_page(leaf_id)?;
                self.root_page_id = INVALID_PAGE_ID;
                self.update_root_page_id()?;
            }
            return Ok(true);
        }

        if size < self.leaf_min_size() {
            self.rebalance_leaf(leaf_guard)?;
        }
        Ok(true)
    }

    /// Iterator positioned at the smallest key.
    pub fn iter(&self) -> Result<TreeIterator> {
        if self.is_empty() {
            return Ok(TreeIterator::new(Arc::clone(&self.bpm), None, 0));
        }

        let mut guard = PageGuard::fetch(&self.bpm, self.root_page_id)?;
        loop {
            let child = {
                let data = guard.data();
                match btree_page::page_type(&data[..]) {
                    BTreePageType::Leaf => break,
                    BTreePageType::Internal => InternalPage::new(&data[..]).child_at(0),
                    BTreePageType::Invalid => {
                        return Err(QuarryError::IndexCorrupted(format!(
                            "invalid page type on page {}",
                            guard.page_id()
                        )))
                    }
                }
            };
            guard = PageGuard::fetch(&self.bpm, child)?;
        }
        Ok(TreeIterator::new(Arc::clone(&self.bpm), Some(guard), 0))
    }

    /// Iterator positioned at the first key >= `key`.
    pub fn iter_from(&self, key: IndexKey) -> Result<TreeIterator> {
        if self.is_empty() {
            return Ok(TreeIterator::new(Arc::clone(&self.bpm), None, 0));
        }

        let guard = self.find_leaf(key)?;
        let index = {
            let data = guard.data();
            LeafPage::new(&data[..]).key_index(key, &self.comparator)
        };
        // index may equal the leaf size; the iterator steps to the next
        // leaf on its first advance
        Ok(TreeIterator::new(Arc::clone(&self.bpm), Some(guard), index))
    }

    /// Descends to the leaf that covers `key`, unpinning internal pages
    /// along the way. The returned leaf stays pinned through its guard.
    fn find_leaf(&self, key: IndexKey) -> Result<PageGuard> {
        let mut guard = PageGuard::fetch(&self.bpm, self.root_page_id)?;
        loop {
            let child = {
                let data = guard.data();
                match btree_page::page_type(&data[..]) {
                    BTreePageType::Leaf => break,
                    BTreePageType::Internal => {
                        InternalPage::new(&data[..]).lookup_child(key, &self.comparator)
                    }
                    BTreePageType::Invalid => {
                        return Err(QuarryError::IndexCorrupted(format!(
                            "invalid page type on page {}",
                            guard.page_id()
                        )))
                    }
                }
            };
            guard = PageGuard::fetch(&self.bpm, child)?;
        }
        Ok(guard)
    }

    /// Builds the first leaf root and records it in the header page.
    fn start_new_tree(&mut self, key: IndexKey, value: RecordId) -> Result<()> {
        let mut guard = PageGuard::create(&self.bpm)?;
        let root_id = guard.page_id();
        {
            let mut data = guard.data_mut();
            let mut leaf = LeafPage::new(&mut data[..]);
            leaf.init(root_id, INVALID_PAGE_ID, self.leaf_max_size);
            leaf.insert(key, value, &self.comparator);
        }
        self.root_page_id = root_id;
        self.update_root_page_id()
    }

    /// Splits a full leaf: the upper half moves to a fresh leaf spliced
    /// into the sibling chain, and the new leaf's first key is pushed up.
    fn split_leaf(&mut self, mut old_guard: PageGuard) -> Result<()> {
        let mut new_guard = PageGuard::create(&self.bpm)?;
        let new_id = new_guard.page_id();

        let separator = {
            let mut old_data = old_guard.data_mut();
            let mut old = LeafPage::new(&mut old_data[..]);
            let mut new_data = new_guard.data_mut();
            let mut new = LeafPage::new(&mut new_data[..]);

            new.init(new_id, old.parent_page_id(), old.max_size());

            let total = old.size();
            let mid = total / 2;
            for i in mid..total {
                new.push_back(old.key_at(i), old.value_at(i));
            }
            new.set_next_page_id(old.next_page_id());
            old.set_next_page_id(new_id);
            old.set_size(mid);

            new.key_at(0)
        };

        self.insert_into_parent(old_guard, separator, new_guard)
    }

    /// Splits an internal page that has overflowed to max_size + 1
    /// entries. Moved children are re-parented onto the fresh page, and
    /// the first key of the new page becomes the separator pushed up (its
    /// key slot 0 is unused from then on).
    fn split_internal(&mut self, mut old_guard: PageGuard) -> Result<()> {
        let mut new_guard = PageGuard::create(&self.bpm)?;
        let new_id = new_guard.page_id();

        let (separator, moved_children) = {
            let mut old_data = old_guard.data_mut();
            let mut old = InternalPage::new(&mut old_data[..]);
            let mut new_data = new_guard.data_mut();
            let mut new = InternalPage::new(&mut new_data[..]);

            new.init(new_id, old.parent_page_id(), old.max_size());

            let total = old.size();
            let mid = total / 2;
            // The key of the first moved entry becomes the separator; it
            // rides along as the new page's unused key 0
            let mut moved = Vec::with_capacity(total - mid);
            for i in mid..total {
                moved.push((old.key_at(i), old.child_at(i)));
            }
            for &(key, child) in &moved {
                new.push_back(key, child);
            }
            old.set_size(mid);

            (moved[0].0, moved.iter().map(|&(_, c)| c).collect::<Vec<_>>())
        };

        for child_id in moved_children {
            let mut child_guard = PageGuard::fetch(&self.bpm, child_id)?;
            let mut data = child_guard.data_mut();
            btree_page::set_parent_page_id(&mut data[..], new_id);
        }

        self.insert_into_parent(old_guard, separator, new_guard)
    }

    /// Links a freshly split-off page into the tree: either grows a new
    /// root above the old one, or inserts the separator into the existing
    /// parent, splitting it in turn when it overflows.
    fn insert_into_parent(
        &mut self,
        mut old_guard: PageGuard,
        key: IndexKey,
        mut new_guard: PageGuard,
    ) -> Result<()> {
        let old_id = old_guard.page_id();
        let new_id = new_guard.page_id();
        let parent_id = {
            let data = old_guard.data();
            btree_page::parent_page_id(&data[..])
        };

        if !parent_id.is_valid() {
            // The old page was the root: grow a new root with exactly two
            // children
            let mut root_guard = PageGuard::create(&self.bpm)?;
            let root_id = root_guard.page_id();
            {
                let mut data = root_guard.data_mut();
                let mut root = InternalPage::new(&mut data[..]);
                root.init(root_id, INVALID_PAGE_ID, self.internal_max_size);
                root.populate_new_root(old_id, key, new_id);
            }
            {
                let mut data = old_guard.data_mut();
                btree_page::set_parent_page_id(&mut data[..], root_id);
            }
            {
                let mut data = new_guard.data_mut();
                btree_page::set_parent_page_id(&mut data[..], root_id);
            }
            self.root_page_id = root_id;
            return self.update_root_page_id();
        }

        drop(old_guard);
        drop(new_guard);

        let mut parent_guard = PageGuard::fetch(&self.bpm, parent_id)?;
        let parent_size = {
            let mut data = parent_guard.data_mut();
            let mut parent = InternalPage::new(&mut data[..]);
            parent.insert_after_child(old_id, key, new_id);
            parent.size()
        };

        // Internal pages split only after overflowing by one entry
        if parent_size == self.internal_max_size + 1 {
            self.split_internal(parent_guard)?;
        }
        Ok(())
    }

    fn leaf_min_size(&self) -> usize {
        self.leaf_max_size / 2
    }

    fn internal_min_size(&self) -> usize {
        self.internal_max_size / 2
    }

    /// Fixes up an underfull leaf by borrowing from or merging with an
    /// adjacent sibling under the same parent.
    fn rebalance_leaf(&mut self, mut leaf_guard: PageGuard) -> Result<()> {
        let leaf_id = leaf_guard.page_id();
        let parent_id = {
            let data = leaf_guard.data();
            btree_page::parent_page_id(&data[..])
        };

        let mut parent_guard = PageGuard::fetch(&self.bpm, parent_id)?;
        let index = {
            let data = parent_guard.data();
            InternalPage::new(&data[..]).child_index(leaf_id).ok_or_else(|| {
                QuarryError::IndexCorrupted(format!("page {} missing from its parent", leaf_id))
            })?
        };

        if index > 0 {
            // Work against the left sibling
            let sibling_id = {
                let data = parent_guard.data();
                InternalPage::new(&data[..]).child_at(index - 1)
            };
            let mut sibling_guard = PageGuard::fetch(&self.bpm, sibling_id)?;
            let sibling_size = {
                let data = sibling_guard.data();
                LeafPage::new(&data[..]).size()
            };

            if sibling_size > self.leaf_min_size() {
                // Borrow the sibling's last entry; it becomes the leaf's
                // first, and the parent separator follows it
                let (key, value) = {
                    let mut data = sibling_guard.data_mut();
                    let mut sibling = LeafPage::new(&mut data[..]);
                    sibling.remove_at(sibling_size - 1)
                };
                {
                    let mut data = leaf_guard.data_mut();
                    let mut leaf = LeafPage::new(&mut data[..]);
                    leaf.insert(key, value, &self.comparator);
                }
                let mut data = parent_guard.data_mut();
                InternalPage::new(&mut data[..]).set_key_at(index, key);
                Ok(())
            } else {
                // Merge the leaf into its left sibling
                self.merge_leaves(sibling_guard, leaf_guard, parent_guard, index)
            }
        } else {
            // Leftmost child: work against the right sibling
            let sibling_id = {
                let data = parent_guard.data();
                InternalPage::new(&data[..]).child_at(1)
            };
            let mut sibling_guard = PageGuard::fetch(&self.bpm, sibling_id)?;
            let sibling_size = {
                let data = sibling_guard.data();
                LeafPage::new(&data[..]).size()
            };

            if sibling_size > self.leaf_min_size() {
                // Borrow the sibling's first entry and refresh the
                // separator to the sibling's new first key
                let (key, value) = {
                    let mut data = sibling_guard.data_mut();
                    let mut sibling = LeafPage::new(&mut data[..]);
                    sibling.remove_at(0)
                };
                let new_separator = {
                    let data = sibling_guard.data();
                    LeafPage::new(&data[..]).key_at(0)
                };
                {
                    let mut data = leaf_guard.data_mut();
                    let mut leaf = LeafPage::new(&mut data[..]);
                    leaf.push_back(key, value);
                }
                let mut data = parent_guard.data_mut();
                InternalPage::new(&mut data[..]).set_key_at(1, new_separator);
                Ok(())
            } else {
                // Merge the right sibling into the leaf
                self.merge_leaves(leaf_guard, sibling_guard, parent_guard, 1)
            }
        }
    }

    /// Moves all entries of `right` into `left`, splices the sibling
    /// chain, frees the right page and drops its separator entry (at
    /// `right_index`) from the parent.
    fn merge_leaves(
        &mut self,
        mut left_guard: PageGuard,
        right_guard: PageGuard,
        mut parent_guard: PageGuard,
        right_index: usize,
    ) -> Result<()> {
        let right_id = right_guard.page_id();

        {
            let mut left_data = left_guard.data_mut();
            let mut left = LeafPage::new(&mut left_data[..]);
            let right_data = right_guard.data();
            let right = LeafPage::new(&right_data[..]);

            for i in 0..right.size() {
                left.push_back(right.key_at(i), right.value_at(i));
            }
            left.set_next_page_id(right.next_page_id());
        }

        drop(right_guard);
        self.bpm.delete_page(right_id)?;

        {
            let mut data = parent_guard.data_mut();
            InternalPage::new(&mut data[..]).remove_at(right_index);
        }
        drop(left_guard);

        self.rebalance_parent(parent_guard)
    }

    /// Restores the invariants of an internal page after one of its
    /// entries was removed: collapses a single-child root, or borrows
    /// from / merges with a sibling when underfull.
    fn rebalance_parent(&mut self, mut node_guard: PageGuard) -> Result<()> {
        let node_id = node_guard.page_id();
        let (size, parent_id) = {
            let data = node_guard.data();
            let node = InternalPage::new(&data[..]);
            (node.size(), node.parent_page_id())
        };

        if node_id == self.root_page_id {
            if size == 1 {
                // The root routes to a single child: that child becomes
                // the new root
                let child_id = {
                    let data = node_guard.data();
                    InternalPage::new(&data[..]).child_at(0)
                };
                {
                    let mut child_guard = PageGuard::fetch(&self.bpm, child_id)?;
                    let mut data = child_guard.data_mut();
                    btree_page::set_parent_page_id(&mut data[..], INVALID_PAGE_ID);
                }
                drop(node_guard);
                self.bpm.delete_page(node_id)?;
                self.root_page_id = child_id;
                self.update_root_page_id()?;
            }
            return Ok(());
        }

        if size >= self.internal_min_size() {
            return Ok(());
        }

        let mut parent_guard = PageGuard::fetch(&self.bpm, parent_id)?;
        let index = {
            let data = parent_guard.data();
            InternalPage::new(&data[..]).child_index(node_id).ok_or_else(|| {
                QuarryError::IndexCorrupted(format!("page {} missing from its parent", node_id))
            })?
        };

        if index > 0 {
            let sibling_id = {
                let data = parent_guard.data();
                InternalPage::new(&data[..]).child_at(index - 1)
            };
            let mut sibling_guard = PageGuard::fetch(&self.bpm, sibling_id)?;
            let sibling_size = {
                let data = sibling_guard.data();
                InternalPage::new(&data[..]).size()
            };

            if sibling_size > self.internal_min_size() {
                // Rotate right: the sibling's last child moves in front of
                // this node's children
                let (moved_key, moved_child) = {
                    let data = sibling_guard.data();
                    let sibling = InternalPage::new(&data[..]);
                    (sibling.key_at(sibling_size - 1), sibling.child_at(sibling_size - 1))
                };
                let separator = {
                    let data = parent_guard.data();
                    InternalPage::new(&data[..]).key_at(index)
                };
                {
                    let mut data = sibling_guard.data_mut();
                    InternalPage::new(&mut data[..]).set_size(sibling_size - 1);
                }
                {
                    let mut data = node_guard.data_mut();
                    InternalPage::new(&mut data[..]).push_front(separator, moved_child);
                }
                {
                    let mut data = parent_guard.data_mut();
                    InternalPage::new(&mut data[..]).set_key_at(index, moved_key);
                }
                let mut child_guard = PageGuard::fetch(&self.bpm, moved_child)?;
                let mut data = child_guard.data_mut();
                btree_page::set_parent_page_id(&mut data[..], node_id);
                Ok(())
            } else {
                self.merge_internals(sibling_guard, node_guard, parent_guard, index)
            }
        } else {
            let sibling_id = {
                let data = parent_guard.data();
                InternalPage::new(&data[..]).child_at(1)
            };
            let mut sibling_guard = PageGuard::fetch(&self.bpm, sibling_id)?;
            let sibling_size = {
                let data = sibling_guard.data();
                InternalPage::new(&data[..]).size()
            };

            if sibling_size > self.internal_min_size() {
                // Rotate left: the sibling's first child joins the back of
                // this node's children
                let separator = {
                    let data = parent_guard.data();
                    InternalPage::new(&data[..]).key_at(1)
                };
                let (moved_child, next_separator) = {
                    let data = sibling_guard.data();
                    let sibling = InternalPage::new(&data[..]);
                    (sibling.child_at(0), sibling.key_at(1))
                };
                {
                    let mut data = node_guard.data_mut();
                    InternalPage::new(&mut data[..]).push_back(separator, moved_child);
                }
                {
                    let mut data = sibling_guard.data_mut();
                    InternalPage::new(&mut data[..]).remove_at(0);
                }
                {
                    let mut data = parent_guard.data_mut();
                    InternalPage::new(&mut data[..]).set_key_at(1, next_separator);
                }
                let mut child_guard = PageGuard::fetch(&self.bpm, moved_child)?;
                let mut data = child_guard.data_mut();
                btree_page::set_parent_page_id(&mut data[..], node_id);
                Ok(())
            } else {
                self.merge_internals(node_guard, sibling_guard, parent_guard, 1)
            }
        }
    }

    /// Moves all entries of the right internal node into the left one (the
    /// parent separator becomes the key above the right node's first
    /// child), re-parents the moved subtrees, frees the right page and
    /// removes its entry from the parent.
    fn merge_internals(
        &mut self,
        mut left_guard: PageGuard,
        right_guard: PageGuard,
        mut parent_guard: PageGuard,
        right_index: usize,
    ) -> Result<()> {
        let left_id = left_guard.page_id();
        let right_id = right_guard.page_id();

        let separator = {
            let data = parent_guard.data();
            InternalPage::new(&data[..]).key_at(right_index)
        };
        let entries: Vec<(IndexKey, PageId)> = {
            let data = right_guard.data();
            let right = InternalPage::new(&data[..]);
            (0..right.size())
                .map(|i| {
                    let key = if i == 0 { separator } else { right.key_at(i) };
                    (key, right.child_at(i))
                })
                .collect()
        };

        {
            let mut data = left_guard.data_mut();
            let mut left = InternalPage::new(&mut data[..]);
            for &(key, child) in &entries {
                left.push_back(key, child);
            }
        }
        for &(_, child_id) in &entries {
            let mut child_guard = PageGuard::fetch(&self.bpm, child_id)?;
            let mut data = child_guard.data_mut();
            btree_page::set_parent_page_id(&mut data[..], left_id);
        }

        drop(right_guard);
        self.bpm.delete_page(right_id)?;

        {
            let mut data = parent_guard.data_mut();
            InternalPage::new(&mut data[..]).remove_at(right_index);
        }
        drop(left_guard);

        self.rebalance_parent(parent_guard)
    }

    /// Upserts this tree's (name, root id) record in the header page.
    /// Called whenever the root changes.
    fn update_root_page_id(&self) -> Result<()> {
        let mut guard = PageGuard::fetch(&self.bpm, HEADER_PAGE_ID)?;
        let mut data = guard.data_mut();
        let mut header = HeaderPage::new(&mut data[..]);
        if !header.update_record(&self.index_name, self.root_page_id)
            && !header.insert_record(&self.index_name, self.root_page_id)
        {
            return Err(QuarryError::HeaderPageFull);
        }
        Ok(())
    }

    /// Prints the tree structure to stdout, level by level.
    pub fn print(&self) -> Result<()> {
        if self.is_empty() {
            println!("(empty tree)");
            return Ok(());
        }
        println!("root_page_id: {}", self.root_page_id);
        self.print_node(self.root_page_id, 0)
    }

    fn print_node(&self, page_id: PageId, depth: usize) -> Result<()> {
        let guard = PageGuard::fetch(&self.bpm, page_id)?;
        let children = {
            let data = guard.data();
            match btree_page::page_type(&data[..]) {
                BTreePageType::Leaf => {
                    let leaf = LeafPage::new(&data[..]);
                    let keys: Vec<_> = (0..leaf.size()).map(|i| leaf.key_at(i)).collect();
                    println!(
                        "{:indent$}leaf {} parent={} next={} keys={:?}",
                        "",
                        leaf.page_id(),
                        leaf.parent_page_id(),
                        leaf.next_page_id(),
                        keys,
                        indent = depth * 2
                    );
                    Vec::new()
                }
                BTreePageType::Internal => {
                    let node = InternalPage::new(&data[..]);
                    let keys: Vec<_> = (1..node.size()).map(|i| node.key_at(i)).collect();
                    println!(
                        "{:indent$}internal {} parent={} keys={:?}",
                        "",
                        node.page_id(),
                        node.parent_page_id(),
                        keys,
                        indent = depth * 2
                    );
                    (0..node.size()).map(|i| node.child_at(i)).collect()
                }
                BTreePageType::Invalid => {
                    return Err(QuarryError::IndexCorrupted(format!(
                        "invalid page type on page {}",
                        page_id
                    )))
                }
            }
        };
        drop(guard);

        for child in children {
            self.print_node(child, depth + 1)?;
        }
        Ok(())
    }

    /// Writes the tree as a Graphviz dot file.
    pub fn draw<P: AsRef<Path>>(&self, out_path: P) -> Result<()> {
        let mut out = String::from("digraph G {\nnode [shape=record];\n");
        if !self.is_empty() {
            self.draw_node(self.root_page_id, &mut out)?;
        }
        out.push_str("}\n");
        std::fs::write(out_path, out)?;
        Ok(())
    }

    fn draw_node(&self, page_id: PageId, out: &mut String) -> Result<()> {
        let guard = PageGuard::fetch(&self.bpm, page_id)?;
        let children = {
            let data = guard.data();
            match btree_page::page_type(&data[..]) {
                BTreePageType::Leaf => {
                    let leaf = LeafPage::new(&data[..]);
                    let keys: Vec<String> =
                        (0..leaf.size()).map(|i| leaf.key_at(i).to_string()).collect();
                    let _ = writeln!(
                        out,
                        "p{} [label=\"{}\" color=green];",
                        page_id.as_u32(),
                        keys.join("|")
                    );
                    if leaf.next_page_id().is_valid() {
                        let _ = writeln!(
                            out,
                            "p{} -> p{} [constraint=false];",
                            page_id.as_u32(),
                            leaf.next_page_id().as_u32()
                        );
                    }
                    Vec::new()
                }
                BTreePageType::Internal => {
                    let node = InternalPage::new(&data[..]);
                    let keys: Vec<String> =
                        (1..node.size()).map(|i| node.key_at(i).to_string()).collect();
                    let _ = writeln!(
                        out,
                        "p{} [label=\"{}\"];",
                        page_id.as_u32(),
                        keys.join("|")
                    );
                    let children: Vec<PageId> =
                        (0..node.size()).map(|i| node.child_at(i)).collect();
                    for child in &children {
                        let _ = writeln!(
                            out,
                            "p{} -> p{};",
                            page_id.as_u32(),
                            child.as_u32()
                        );
                    }
                    children
                }
                BTreePageType::Invalid => {
                    return Err(QuarryError::IndexCorrupted(format!(
                        "invalid page type on page {}",
                        page_id
                    )))
                }
            }
        };
        drop(guard);

        for child in children {
            self.draw_node(child, out)?;
        }
        Ok(())
    }
}
