use std::sync::Mutex;

use sync_api_types::{FileInfo, FileInfoMap};

/// The server's authoritative filename -> FileInfo mapping.
///
/// All mutation goes through [`MetaStore::update_file`], which performs the
/// version check and the replace atomically under a single lock so that the
/// "exactly one greater" rule can never race with itself for the same
/// filename.
pub struct MetaStore {
    files: Mutex<FileInfoMap>,
}

impl Default for MetaStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaStore {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(FileInfoMap::new()),
        }
    }

    /// Atomic snapshot of the whole map: readers never observe a torn pair
    /// of (pre-update, post-update) bindings for the same filename, since
    /// the clone happens while the lock is held.
    pub fn snapshot(&self) -> FileInfoMap {
        let files = self.files.lock().unwrap();
        files.clone()
    }

    /// Apply the version-vector conflict rule for one filename:
    ///
    /// - absent filename: accept unconditionally.
    /// - present filename: accept iff `version == current.version + 1`.
    ///
    /// Returns whether the update was accepted.
    pub fn update_file(&self, filename: &str, version: u64, hashlist: Vec<String>) -> bool {
        let mut files = self.files.lock().unwrap();

        match files.get(filename) {
            None => {
                files.insert(filename.to_string(), FileInfo::new(version, hashlist));
                true
            }
            Some(current) => {
                if version == current.version + 1 {
                    files.insert(filename.to_string(), FileInfo::new(version, hashlist));
                    true
                } else {
                    false
                }
            }
        }
    }
}
