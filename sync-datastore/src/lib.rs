//! BlockStore + MetaStore: the server half of the sync protocol.
//!
//! This crate implements the five RPCs transport-agnostically: a mutex
//! guards the [`FileInfoMap`](sync_api_types::FileInfoMap) so that
//! `update_file`'s check-and-set is atomic, and a separate mutex guards the
//! block table so `get_block`/`store_block` never block on file-info
//! updates. No state is persisted across restarts; the server starts
//! empty, by design (see the datastore's module docs for rationale).

mod block_store;
mod meta_store;

pub use block_store::BlockStore;
pub use meta_store::MetaStore;

use log::warn;
use sync_api_types::FileInfoMap;

/// The server: two independently-locked in-memory maps and no background
/// work. Handlers may be dispatched concurrently by the caller (e.g. on a
/// worker-thread pool); this type itself makes no threading assumptions.
#[derive(Default)]
pub struct Server {
    blocks: BlockStore,
    files: MetaStore,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Liveness probe.
    pub fn ping(&self) {}

    /// Returns the block bound to `hash`, or an empty byte sequence if no
    /// such binding exists. A miss is logged: clients in this protocol
    /// never call `get_block` for a hash they did not just receive from
    /// `get_fileinfo_map`, so a miss indicates a server inconsistency.
    pub fn get_block(&self, hash: &str) -> Vec<u8> {
        match self.blocks.get(hash) {
            Some(data) => data,
            None => {
                warn!("get_block: no block bound to hash {hash}");
                Vec::new()
            }
        }
    }

    /// Binds `hash` to `data`. Idempotent; does not verify that `hash` is
    /// actually the hash of `data` (clients are trusted).
    pub fn store_block(&self, hash: String, data: Vec<u8>) {
        self.blocks.store(hash, data);
    }

    /// Atomic snapshot of the filename -> FileInfo mapping.
    pub fn get_fileinfo_map(&self) -> FileInfoMap {
        self.files.snapshot()
    }

    /// Sole mutator of the file-info map; see [`MetaStore::update_file`]
    /// for the acceptance rule.
    pub fn update_file(&self, filename: &str, version: u64, hashlist: Vec<String>) -> bool {
        self.files.update_file(filename, version, hashlist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referential_integrity_after_upload() {
        let server = Server::new();
        server.store_block("h1".to_string(), b"hell".to_vec());
        server.store_block("h2".to_string(), b"o".to_vec());
        assert!(server.update_file("a.txt", 1, vec!["h1".to_string(), "h2".to_string()]));

        let map = server.get_fileinfo_map();
        let info = &map["a.txt"];
        for hash in &info.hashlist {
            assert!(!server.get_block(hash).is_empty());
        }
    }

    #[test]
    fn get_block_miss_returns_empty() {
        let server = Server::new();
        assert_eq!(server.get_block("missing"), Vec::<u8>::new());
    }
}
