//! Client half of the sync protocol: local scanning, the persistent
//! index, the HTTP transport, and the reconciliation engine that ties
//! them together.

pub mod chunker;
pub mod http_client;
pub mod local_index;
pub mod reconcile;

pub use http_client::HttpClient;
pub use local_index::LocalIndex;
pub use reconcile::{SyncClient, SyncReport};
