//! Top-level crate tying the datastore, the HTTP front end and the
//! client's reconciliation engine to a config file and a CLI.
//!
//! The synchronization protocol itself lives in `sync-api-types`
//! (shared wire types), `sync-datastore` (server) and `sync-client`
//! (client); this crate is the ambient scaffolding around them: config
//! loading, the HTTP listener, and the two binaries.

pub mod config;
pub mod server;

pub use config::Config;
