use std::collections::HashMap;
use std::sync::Mutex;

/// Content-addressed, in-memory blob table.
///
/// Keys are never removed: once a hash is bound it stays bound for the
/// life of the process. Binding an already-bound hash is a no-op, since
/// content addressing makes the two bindings equivalent.
pub struct BlockStore {
    blocks: Mutex<HashMap<String, Vec<u8>>>,
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore {
    pub fn new() -> Self {
        Self {
            blocks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the block bound to `hash`, or `None` if no such binding
    /// exists. Callers that need source-compatible "empty bytes on miss"
    /// behavior should map `None` to an empty `Vec` themselves.
    pub fn get(&self, hash: &str) -> Option<Vec<u8>> {
        let blocks = self.blocks.lock().unwrap();
        blocks.get(hash).cloned()
    }

    /// Binds `hash` to `data`. Idempotent: a second store for the same
    /// hash is a no-op. The caller is trusted to have hashed `data`
    /// correctly; this store does not verify it.
    pub fn store(&self, hash: String, data: Vec<u8>) {
        let mut blocks = self.blocks.lock().unwrap();
        blocks.entry(hash).or_insert(data);
    }

    pub fn contains(&self, hash: &str) -> bool {
        let blocks = self.blocks.lock().unwrap();
        blocks.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        let blocks = self.blocks.lock().unwrap();
        blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_and_get() {
        let store = BlockStore::new();
        store.store("h1".to_string(), vec![1, 2, 3]);
        assert_eq!(store.get("h1"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn get_missing_is_none() {
        let store = BlockStore::new();
        assert_eq!(store.get("nope"), None);
    }

    #[test]
    fn store_is_idempotent() {
        let store = BlockStore::new();
        store.store("h1".to_string(), vec![1, 2, 3]);
        // second store for the same hash must not clobber or error
        store.store("h1".to_string(), vec![9, 9, 9]);
        assert_eq!(store.get("h1"), Some(vec![1, 2, 3]));
        assert_eq!(store.len(), 1);
    }
}
