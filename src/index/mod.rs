pub mod btree;
pub mod btree_page;
pub mod iterator;
pub mod key_comparator;

pub use btree::BPlusTree;
pub use btree_page::{
    BTreePageType, InternalPage, LeafPage, DEFAULT_INTERNAL_MAX_SIZE, DEFAULT_LEAF_MAX_SIZE,
    INTERNAL_PAGE_CAPACITY, LEAF_PAGE_CAPACITY,
};
pub use iterator::TreeIterator;
pub use key_comparator::{BytewiseComparator, IntegerComparator, KeyComparator};
