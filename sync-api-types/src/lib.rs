//! Wire types shared between the sync server and the sync client.
//!
//! These are plain serde-able structs; the transport layer (see
//! `sync-client::http_client` and `blocksync-server`) is responsible for
//! putting them on the wire.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default block size used to split files into content-addressed chunks.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Reserved hash value marking a [`FileInfo`] as deleted.
///
/// Not a valid hex-encoded digest, so it can never collide with a real
/// block hash.
pub const TOMBSTONE_HASH: &str = "0";

/// Sentinel returned by a local-index lookup miss; never written to disk.
pub const NO_VERSION: i64 = -1;

/// A block hash as it appears on the wire: the lowercase hex digest of a block.
pub type BlockHash = String;

/// version + ordered hashlist describing one file's content on the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub version: u64,
    pub hashlist: Vec<BlockHash>,
}

impl FileInfo {
    pub fn new(version: u64, hashlist: Vec<BlockHash>) -> Self {
        Self { version, hashlist }
    }

    /// Build the tombstone FileInfo for a delete at `version`.
    pub fn tombstone(version: u64) -> Self {
        Self {
            version,
            hashlist: vec![TOMBSTONE_HASH.to_string()],
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.hashlist.len() == 1 && self.hashlist[0] == TOMBSTONE_HASH
    }
}

/// The server's authoritative filename -> FileInfo mapping, as returned by
/// a `get_fileinfo_map` snapshot.
pub type FileInfoMap = HashMap<String, FileInfo>;

/// Body of an `update_file` request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateFileRequest {
    pub filename: String,
    pub version: u64,
    pub hashlist: Vec<BlockHash>,
}

/// Response of an `update_file` request: whether the server accepted the
/// proposed version.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct UpdateFileResponse {
    pub accepted: bool,
}
