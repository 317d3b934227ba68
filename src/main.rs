use std::sync::Arc;

use quarry::buffer::BufferPoolManager;
use quarry::index::{BPlusTree, IntegerComparator};
use quarry::storage::disk::DiskManager;
use quarry::{PageId, RecordId, SlotId};

fn main() {
    println!("Quarry - storage core demo");
    println!("==========================\n");

    let db_path = "demo.db";
    let disk_manager = Arc::new(DiskManager::new(db_path).expect("failed to open database file"));
    println!("Opened database file: {}", db_path);

    let bpm = Arc::new(BufferPoolManager::new(16, 2, Arc::clone(&disk_manager)));
    println!("Created buffer pool with 16 frames (LRU-2)\n");

    // Page 0 holds the (index name -> root page id) records
    let (header_id, _frame) = bpm.new_page().expect("failed to allocate header page");
    bpm.unpin_page(header_id, false);

    let mut tree = BPlusTree::new("demo_pk", Arc::clone(&bpm), IntegerComparator, 6, 6);

    for key in [42u64, 7, 19, 3, 88, 55, 21, 64, 13, 99, 31, 5] {
        let rid = RecordId::new(PageId::new(key as u32), SlotId::new(0));
        tree.insert(key, rid).expect("insert failed");
    }
    println!("Inserted 12 keys; root page: {}", tree.root_page_id());

    print!("Forward scan:");
    for item in tree.iter().expect("iterator failed") {
        let (key, _rid) = item.expect("scan failed");
        print!(" {}", key);
    }
    println!("\n");

    tree.print().expect("print failed");

    bpm.flush_all_pages().expect("flush failed");
    println!("\nPool stats: {} frames free, {} pinned", bpm.free_frame_count(), bpm.pinned_frame_count());
    println!(
        "Disk stats: {} pages, {} reads, {} writes",
        disk_manager.num_pages(),
        disk_manager.num_reads(),
        disk_manager.num_writes()
    );

    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
}
