//! Shared cache of complete descriptor lists, keyed by table.
//!
//! Lists are published whole: a list is handed over only once it has been
//! fully decoded and is never mutated afterwards. Readers get `Arc` clones
//! and keep their snapshot alive even if the entry is replaced.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::descriptor::DescriptorList;

/// (table_id, table_id_extension)
pub type TableKey = (u8, u16);

#[derive(Debug, Default)]
pub struct DescriptorCache {
    lists: RwLock<HashMap<TableKey, Arc<DescriptorList>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /* called when a table's descriptor loop has been completely decoded */
    pub fn insert(&self, key: TableKey, list: DescriptorList) -> Arc<DescriptorList> {
        let list = Arc::new(list);
        let mut map = match self.lists.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(prev) = map.insert(key, Arc::clone(&list)) {
            log::debug!(
                "replaced descriptor list for table 0x{:02X}/0x{:04X} ({} -> {} entries)",
                key.0,
                key.1,
                prev.len(),
                list.len()
            );
        }
        list
    }

    pub fn get(&self, key: TableKey) -> Option<Arc<DescriptorList>> {
        let map = match self.lists.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.get(&key).cloned()
    }

    pub fn remove(&self, key: TableKey) -> Option<Arc<DescriptorList>> {
        let mut map = match self.lists.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.remove(&key)
    }

    pub fn len(&self) -> usize {
        match self.lists.read() {
            Ok(g) => g.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
