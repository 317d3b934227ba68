use crate::common::{PageId, PAGE_SIZE};

const NUM_RECORDS_OFFSET: usize = 0;
const RECORDS_OFFSET: usize = 4;

/// Bytes reserved for an index name within a record
pub const MAX_NAME_LEN: usize = 32;
const RECORD_SIZE: usize = MAX_NAME_LEN + 4;

/// Maximum number of (name, root id) records the header page can hold
pub const MAX_HEADER_RECORDS: usize = (PAGE_SIZE - RECORDS_OFFSET) / RECORD_SIZE;

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let bytes: [u8; 4] = data[offset..offset + 4].try_into().unwrap();
    u32::from_le_bytes(bytes)
}

fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Pads an index name out to its fixed on-page width.
fn padded_name(name: &str) -> Option<[u8; MAX_NAME_LEN]> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_NAME_LEN {
        return None;
    }
    let mut out = [0u8; MAX_NAME_LEN];
    out[..bytes.len()].copy_from_slice(bytes);
    Some(out)
}

/// Read-only view of the header page: page 0, holding a table of
/// (index name, root page id) records.
pub struct HeaderPageRef<'a> {
    data: &'a [u8],
}

impl<'a> HeaderPageRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn num_records(&self) -> usize {
        read_u32(self.data, NUM_RECORDS_OFFSET) as usize
    }

    fn record_index(&self, name: &str) -> Option<usize> {
        let target = padded_name(name)?;
        (0..self.num_records()).find(|&i| {
            let offset = RECORDS_OFFSET + i * RECORD_SIZE;
            self.data[offset..offset + MAX_NAME_LEN] == target
        })
    }

    /// Returns the root page id recorded for the given index name.
    pub fn get_root_id(&self, name: &str) -> Option<PageId> {
        let i = self.record_index(name)?;
        let offset = RECORDS_OFFSET + i * RECORD_SIZE + MAX_NAME_LEN;
        Some(PageId::new(read_u32(self.data, offset)))
    }
}

/// Mutable view of the header page.
pub struct HeaderPage<'a> {
    data: &'a mut [u8],
}

impl<'a> HeaderPage<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    /// Initializes an empty record table.
    pub fn init(&mut self) {
        self.data.fill(0);
    }

    pub fn num_records(&self) -> usize {
        HeaderPageRef::new(self.data).num_records()
    }

    pub fn get_root_id(&self, name: &str) -> Option<PageId> {
        HeaderPageRef::new(self.data).get_root_id(name)
    }

    /// Appends a new record. Returns false if the name is invalid, already
    /// present, or the table is full.
    pub fn insert_record(&mut self, name: &str, root_id: PageId) -> bool {
        let Some(padded) = padded_name(name) else {
            return false;
        };
        let count = self.num_records();
        if count >= MAX_HEADER_RECORDS {
            return false;
        }
        if HeaderPageRef::new(self.data).record_index(name).is_some() {
            return false;
        }

        let offset = RECORDS_OFFSET + count * RECORD_SIZE;
        self.data[offset..offset + MAX_NAME_LEN].copy_from_slice(&padded);
        write_u32(self.data, offset + MAX_NAME_LEN, root_id.as_u32());
        write_u32(self.data, NUM_RECORDS_OFFSET, (count + 1) as u32);
        true
    }

    /// Overwrites the root id of an existing record. Returns false if the
    /// name is not recorded.
    pub fn update_record(&mut self, name: &str, root_id: PageId) -> bool {
        let Some(i) = HeaderPageRef::new(self.data).record_index(name) else {
            return false;
        };
        let offset = RECORDS_OFFSET + i * RECORD_SIZE + MAX_NAME_LEN;
        write_u32(self.data, offset, root_id.as_u32());
        true
    }

    /// Removes a record, compacting the tail. Returns false if absent.
    pub fn delete_record(&mut self, name: &str) -> bool {
        let Some(i) = HeaderPageRef::new(self.data).record_index(name) else {
            return false;
        };
        let count = self.num_records();
        let start = RECORDS_OFFSET + i * RECORD_SIZE;
        let end = RECORDS_OFFSET + count * RECORD_SIZE;
        self.data.copy_within(start + RECORD_SIZE..end, start);
        self.data[end - RECORD_SIZE..end].fill(0);
        write_u32(self.data, NUM_RECORDS_OFFSET, (count - 1) as u32);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = HeaderPage::new(&mut data);
        page.init();

        assert!(page.insert_record("orders_pk", PageId::new(7)));
        assert!(page.insert_record("users_pk", PageId::new(9)));
        assert_eq!(page.num_records(), 2);

        assert_eq!(page.get_root_id("orders_pk"), Some(PageId::new(7)));
        assert_eq!(page.get_root_id("users_pk"), Some(PageId::new(9)));
        assert_eq!(page.get_root_id("missing"), None);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = HeaderPage::new(&mut data);
        page.init();

        assert!(page.insert_record("idx", PageId::new(1)));
        assert!(!page.insert_record("idx", PageId::new(2)));
        assert_eq!(page.get_root_id("idx"), Some(PageId::new(1)));
    }

    #[test]
    fn test_update() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = HeaderPage::new(&mut data);
        page.init();

        assert!(!page.update_record("idx", PageId::new(3)));
        page.insert_record("idx", PageId::new(1));
        assert!(page.update_record("idx", PageId::new(3)));
        assert_eq!(page.get_root_id("idx"), Some(PageId::new(3)));
    }

    #[test]
    fn test_delete_compacts() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = HeaderPage::new(&mut data);
        page.init();

        page.insert_record("a", PageId::new(1));
        page.insert_record("b", PageId::new(2));
        page.insert_record("c", PageId::new(3));

        assert!(page.delete_record("b"));
        assert_eq!(page.num_records(), 2);
        assert_eq!(page.get_root_id("a"), Some(PageId::new(1)));
        assert_eq!(page.get_root_id("b"), None);
        assert_eq!(page.get_root_id("c"), Some(PageId::new(3)));
    }

    #[test]
    fn test_name_too_long_rejected() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = HeaderPage::new(&mut data);
        page.init();

        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(!page.insert_record(&long, PageId::new(1)));
    }
}
