//! Persistent client-side index describing what the client believes the
//! server state was at the end of the last successful sync.
//!
//! Stored as `index.txt` in the watched directory: one line per tracked
//! filename, `<filename> <version> <hash1> <hash2> ...`. Rewritten in full
//! on every mutation via write-to-temp-then-rename, so a crash mid-write
//! never produces a torn read. The file is small (one line per tracked
//! file) so a linear scan on lookup needs no index structure.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Error};

use sync_api_types::{BlockHash, NO_VERSION};

pub const INDEX_FILE_NAME: &str = "index.txt";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub version: u64,
    pub hashlist: Vec<BlockHash>,
}

/// The client's on-disk belief about the server's state, for one watched
/// directory.
pub struct LocalIndex {
    path: PathBuf,
    entries: HashMap<String, IndexEntry>,
}

impl LocalIndex {
    /// Load `index.txt` from `base_dir`, or start empty if it does not
    /// exist yet.
    pub fn load(base_dir: &Path) -> Result<Self, Error> {
        let path = base_dir.join(INDEX_FILE_NAME);

        let entries = match fs::read_to_string(&path) {
            Ok(content) => parse_index(&content)
                .with_context(|| format!("unable to parse local index {path:?}"))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => bail!("unable to read local index {path:?} - {err}"),
        };

        Ok(Self { path, entries })
    }

    /// `(version, hashlist)` for `filename`, or `(NO_VERSION, [])` if this
    /// file has never been synced.
    pub fn lookup(&self, filename: &str) -> (i64, Vec<BlockHash>) {
        match self.entries.get(filename) {
            Some(entry) => (entry.version as i64, entry.hashlist.clone()),
            None => (NO_VERSION, Vec::new()),
        }
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entries.contains_key(filename)
    }

    pub fn filenames(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Record the belief that `filename` is now at `(version, hashlist)`
    /// on the server, and persist the index immediately.
    pub fn record(&mut self, filename: &str, version: u64, hashlist: Vec<BlockHash>) -> Result<(), Error> {
        self.entries
            .insert(filename.to_string(), IndexEntry { version, hashlist });
        self.persist()
    }

    fn persist(&self) -> Result<(), Error> {
        let mut content = String::new();
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort(); // deterministic output, easier to diff/test
        for name in names {
            let entry = &self.entries[name];
            content.push_str(name);
            content.push(' ');
            content.push_str(&entry.version.to_string());
            for hash in &entry.hashlist {
                content.push(' ');
                content.push_str(hash);
            }
            content.push('\n');
        }

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("unable to write local index {tmp_path:?}"))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("atomic rename of local index {:?} failed", self.path))?;

        Ok(())
    }
}

fn parse_index(content: &str) -> Result<HashMap<String, IndexEntry>, Error> {
    let mut entries = HashMap::new();

    for (lineno, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split(' ');
        let filename = parts
            .next()
            .with_context(|| format!("line {}: missing filename", lineno + 1))?;
        let version: u64 = parts
            .next()
            .with_context(|| format!("line {}: missing version", lineno + 1))?
            .parse()
            .with_context(|| format!("line {}: invalid version", lineno + 1))?;
        let hashlist: Vec<String> = parts.map(|s| s.to_string()).collect();

        entries.insert(filename.to_string(), IndexEntry { version, hashlist });
    }

    Ok(entries)
}
