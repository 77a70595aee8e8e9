//! The reconciliation engine: one `sync()` pass between a watched
//! directory and the server.
//!
//! Phase A scans the directory and classifies every file against the
//! local index; Phase B fetches a single snapshot of the server's
//! file-info map; Phase C walks the decision table (R1-R6) plus the
//! new-local-not-on-server case, uploading or downloading as needed.
//! Blocks are always pushed before the FileInfo that references them,
//! and the local index is updated only after the server has acked the
//! corresponding mutation.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Error};
use log::{debug, info, warn};

use sync_api_types::{BlockHash, FileInfo, FileInfoMap, TOMBSTONE_HASH};

use crate::chunker::{hash_block, hashlist_for, split_into_blocks};
use crate::http_client::HttpClient;
use crate::local_index::{LocalIndex, INDEX_FILE_NAME};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Classification {
    NewLocal,
    Modified,
    Unchanged,
}

struct LocalEntry {
    data: Vec<u8>,
    new_hashlist: Vec<BlockHash>,
    classification: Classification,
}

/// Tally of actions taken during one `sync()` pass, useful for tests and
/// for logging a one-line summary.
#[derive(Default, Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: Vec<String>,
    pub downloaded: Vec<String>,
    pub deleted_remote: Vec<String>,
    pub no_op: Vec<String>,
}

pub struct SyncClient {
    base_dir: PathBuf,
    block_size: usize,
    http: HttpClient,
}

impl SyncClient {
    pub fn new(base_dir: PathBuf, block_size: usize, http: HttpClient) -> Self {
        Self {
            base_dir,
            block_size,
            http,
        }
    }

    pub async fn sync(&self) -> Result<SyncReport, Error> {
        let mut index = LocalIndex::load(&self.base_dir)
            .with_context(|| format!("unable to load local index in {:?}", self.base_dir))?;

        let scan = self.scan_local(&index)?;
        let remote = self.http.get_fileinfo_map().await?;

        let mut report = SyncReport::default();

        for (filename, info) in &remote {
            self.reconcile_remote_entry(&mut index, &scan, filename, info, &mut report)
                .await?;
        }

        for (filename, entry) in &scan {
            if matches!(entry.classification, Classification::NewLocal) && !remote.contains_key(filename) {
                self.upload_new(&mut index, filename, entry, &remote, &mut report)
                    .await?;
            }
        }

        info!(
            "sync complete: {} uploaded, {} downloaded, {} deleted, {} unchanged",
            report.uploaded.len(),
            report.downloaded.len(),
            report.deleted_remote.len(),
            report.no_op.len()
        );

        Ok(report)
    }

    fn scan_local(&self, index: &LocalIndex) -> Result<HashMap<String, LocalEntry>, Error> {
        let mut scan = HashMap::new();

        let read_dir = fs::read_dir(&self.base_dir)
            .with_context(|| format!("unable to read directory {:?}", self.base_dir))?;

        for entry in read_dir {
            let entry = entry.with_context(|| format!("unable to read entry in {:?}", self.base_dir))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let filename = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => {
                    warn!("skipping non-UTF8 filename in {:?}", self.base_dir);
                    continue;
                }
            };

            if filename == INDEX_FILE_NAME || filename.starts_with('.') {
                continue;
            }

            let data = fs::read(&path).with_context(|| format!("unable to read {path:?}"))?;
            let new_hashlist = hashlist_for(&data, self.block_size);
            let (localv, local_hashlist) = index.lookup(&filename);

            let classification = if localv == -1 {
                Classification::NewLocal
            } else if local_hashlist != new_hashlist {
                Classification::Modified
            } else {
                Classification::Unchanged
            };

            scan.insert(
                filename,
                LocalEntry {
                    data,
                    new_hashlist,
                    classification,
                },
            );
        }

        Ok(scan)
    }

    async fn reconcile_remote_entry(
        &self,
        index: &mut LocalIndex,
        scan: &HashMap<String, LocalEntry>,
        filename: &str,
        info: &FileInfo,
        report: &mut SyncReport,
    ) -> Result<(), Error> {
        let (localv, local_hashlist) = index.lookup(filename);
        let on_disk = scan.get(filename);

        if localv == -1 {
            // R1: remote-only.
            self.download(index, filename, info.version, info.hashlist.clone()).await?;
            report.downloaded.push(filename.to_string());
            return Ok(());
        }

        let entry = match on_disk {
            None => {
                // R2: locally deleted.
                return self.reconcile_locally_deleted(index, filename, localv, info, report).await;
            }
            Some(entry) => entry,
        };

        match entry.classification {
            Classification::Unchanged if local_hashlist == entry.new_hashlist => {
                if info.version > localv {
                    // R3
                    self.download(index, filename, info.version, info.hashlist.clone()).await?;
                    report.downloaded.push(filename.to_string());
                } else {
                    // R4
                    report.no_op.push(filename.to_string());
                }
                Ok(())
            }
            _ => {
                // Modified locally.
                if info.version == localv {
                    // R5: upload.
                    self.reconcile_modified_equal_version(index, filename, localv, entry, info, report)
                        .await
                } else if info.version > localv {
                    // R6: remote wins.
                    self.download(index, filename, info.version, info.hashlist.clone()).await?;
                    report.downloaded.push(filename.to_string());
                    Ok(())
                } else {
                    warn!("{filename}: local version {localv} ahead of remote {} - leaving untouched", info.version);
                    Ok(())
                }
            }
        }
    }

    async fn reconcile_locally_deleted(
        &self,
        index: &mut LocalIndex,
        filename: &str,
        localv: i64,
        info: &FileInfo,
        report: &mut SyncReport,
    ) -> Result<(), Error> {
        let accepted = self
            .http
            .update_file(filename, (localv as u64) + 1, vec![TOMBSTONE_HASH.to_string()])
            .await?;

        if accepted {
            index.record(filename, (localv as u64) + 1, vec![TOMBSTONE_HASH.to_string()])?;
            report.deleted_remote.push(filename.to_string());
            return Ok(());
        }

        debug!("{filename}: delete lost version race, refetching");
        let refreshed = self.http.get_fileinfo_map().await?;
        if let Some(fresh) = refreshed.get(filename) {
            self.download(index, filename, fresh.version, fresh.hashlist.clone()).await?;
            report.downloaded.push(filename.to_string());
        } else {
            // Server no longer has the filename at all; nothing to reconcile.
            warn!("{filename}: disappeared from remote map between update_file and refetch; treating info version {} unreachable", info.version);
        }
        Ok(())
    }

    async fn reconcile_modified_equal_version(
        &self,
        index: &mut LocalIndex,
        filename: &str,
        localv: i64,
        entry: &LocalEntry,
        info: &FileInfo,
        report: &mut SyncReport,
    ) -> Result<(), Error> {
        self.upload_blocks(&entry.data, &entry.new_hashlist).await?;

        let accepted = self
            .http
            .update_file(filename, (localv as u64) + 1, entry.new_hashlist.clone())
            .await?;

        if accepted {
            index.record(filename, (localv as u64) + 1, entry.new_hashlist.clone())?;
            report.uploaded.push(filename.to_string());
            return Ok(());
        }

        debug!("{filename}: upload lost version race, refetching");
        let refreshed = self.http.get_fileinfo_map().await?;
        let fresh = refreshed.get(filename).unwrap_or(info);
        self.download(index, filename, fresh.version, fresh.hashlist.clone()).await?;
        report.downloaded.push(filename.to_string());
        Ok(())
    }

    async fn upload_new(
        &self,
        index: &mut LocalIndex,
        filename: &str,
        entry: &LocalEntry,
        remote: &FileInfoMap,
        report: &mut SyncReport,
    ) -> Result<(), Error> {
        self.upload_blocks(&entry.data, &entry.new_hashlist).await?;

        let accepted = self.http.update_file(filename, 1, entry.new_hashlist.clone()).await?;

        if accepted {
            index.record(filename, 1, entry.new_hashlist.clone())?;
            report.uploaded.push(filename.to_string());
            return Ok(());
        }

        debug!("{filename}: create lost race to another client, refetching");
        let refreshed = self.http.get_fileinfo_map().await?;
        match refreshed.get(filename).or_else(|| remote.get(filename)) {
            Some(fresh) => {
                self.download(index, filename, fresh.version, fresh.hashlist.clone()).await?;
                report.downloaded.push(filename.to_string());
            }
            None => warn!("{filename}: update_file rejected but filename still absent remotely"),
        }
        Ok(())
    }

    async fn upload_blocks(&self, data: &[u8], hashlist: &[BlockHash]) -> Result<(), Error> {
        for (block, hash) in split_into_blocks(data, self.block_size).into_iter().zip(hashlist) {
            debug_assert_eq!(&hash_block(&block), hash);
            self.http.store_block(hash, block).await?;
        }
        Ok(())
    }

    /// Downloads every block in `hashlist`, then writes `filename` (or
    /// deletes it, for a tombstone), and records the new local index entry.
    /// This is always called with the mutation already acknowledged by the
    /// server.
    async fn download(&self, index: &mut LocalIndex, filename: &str, version: u64, hashlist: Vec<BlockHash>) -> Result<(), Error> {
        let is_tombstone = hashlist.len() == 1 && hashlist[0] == TOMBSTONE_HASH;
        let path = self.base_dir.join(filename);

        if is_tombstone {
            if path.exists() {
                fs::remove_file(&path).with_context(|| format!("unable to delete {path:?}"))?;
            }
        } else {
            let mut content = Vec::new();
            for hash in &hashlist {
                let block = self.http.get_block(hash).await?;
                if block.is_empty() {
                    anyhow::bail!("get_block({hash}) for {filename} returned empty data - server inconsistency");
                }
                content.extend_from_slice(&block);
            }
            fs::write(&path, content).with_context(|| format!("unable to write {path:?}"))?;
        }

        index.record(filename, version, hashlist)
    }
}
