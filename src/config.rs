//! Startup configuration: a flat key=value file supplying the server
//! address, the watched base directory, and the block size.
//!
//! Missing or malformed settings are fatal at process start (see the
//! error handling notes in the crate's top-level docs): there is no
//! sensible runtime default for "where is the server" or "what
//! directory do I sync", so we fail fast rather than guess.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, format_err, Context, Error};

use sync_api_types::DEFAULT_BLOCK_SIZE;

/// Parsed `blocksync.conf`.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub base_dir: PathBuf,
    pub block_size: usize,
}

impl Config {
    /// Load and validate a key=value config file. Recognized keys:
    /// `host`, `port`, `base_dir`, `block_size` (optional, default 4096).
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {path:?}"))?;

        let mut host = None;
        let mut port = None;
        let mut base_dir = None;
        let mut block_size = DEFAULT_BLOCK_SIZE;

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| {
                format_err!("{path:?}:{}: expected 'key = value', got {line:?}", lineno + 1)
            })?;
            let key = key.trim();
            let value = value.trim();

            match key {
                "host" => host = Some(value.to_string()),
                "port" => {
                    port = Some(value.parse::<u16>().map_err(|err| {
                        format_err!("{path:?}:{}: invalid port {value:?} - {err}", lineno + 1)
                    })?)
                }
                "base_dir" => base_dir = Some(PathBuf::from(value)),
                "block_size" => {
                    block_size = value.parse::<usize>().map_err(|err| {
                        format_err!("{path:?}:{}: invalid block_size {value:?} - {err}", lineno + 1)
                    })?;
                    if block_size == 0 {
                        bail!("{path:?}:{}: block_size must be positive", lineno + 1);
                    }
                }
                other => bail!("{path:?}:{}: unknown config key {other:?}", lineno + 1),
            }
        }

        let host = host.ok_or_else(|| format_err!("{path:?}: missing required key 'host'"))?;
        let port = port.ok_or_else(|| format_err!("{path:?}: missing required key 'port'"))?;
        let base_dir = base_dir.ok_or_else(|| format_err!("{path:?}: missing required key 'base_dir'"))?;

        if !base_dir.is_dir() {
            bail!("{path:?}: base_dir {base_dir:?} is not a directory");
        }

        Ok(Self {
            host,
            port,
            base_dir,
            block_size,
        })
    }
}
