//! End-to-end reconciliation scenarios driven against a real in-process
//! HTTP server, covering the scenarios enumerated for the synchronization
//! protocol: first upload, unchanged re-sync, pure download, delete,
//! remote-wins version conflict, and concurrent create.

use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;

use tempfile::tempdir;
use tokio::net::TcpListener;

use sync_client::{HttpClient, SyncClient};
use sync_datastore::Server as Datastore;

const BLOCK_SIZE: usize = 4;

async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let datastore = Arc::new(Datastore::new());
    tokio::spawn(async move {
        let _ = blocksync::server::serve(listener, datastore).await;
    });
    addr
}

fn client_at(addr: SocketAddr, base_dir: std::path::PathBuf) -> SyncClient {
    let http = HttpClient::new(&addr.ip().to_string(), addr.port());
    SyncClient::new(base_dir, BLOCK_SIZE, http)
}

#[tokio::test]
async fn first_upload_then_unchanged_resync_is_a_no_op() {
    let addr = spawn_server().await;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"hello").unwrap();

    let client = client_at(addr, dir.path().to_path_buf());
    let report = client.sync().await.unwrap();
    assert_eq!(report.uploaded, vec!["a.txt".to_string()]);

    let index = fs::read_to_string(dir.path().join("index.txt")).unwrap();
    assert!(index.starts_with("a.txt 1 "));

    // scenario 2: re-syncing an unmodified file must not re-upload it.
    let report = client.sync().await.unwrap();
    assert!(report.uploaded.is_empty());
    assert!(report.downloaded.is_empty());
    assert_eq!(report.no_op, vec!["a.txt".to_string()]);
}

#[tokio::test]
async fn pure_download_reconstitutes_remote_file() {
    let addr = spawn_server().await;

    // seed the server directly via one client's upload.
    let seed_dir = tempdir().unwrap();
    fs::write(seed_dir.path().join("b.bin"), b"abcdefgh").unwrap();
    client_at(addr, seed_dir.path().to_path_buf()).sync().await.unwrap();

    // a fresh client with an empty directory should pull it down.
    let fresh_dir = tempdir().unwrap();
    let client = client_at(addr, fresh_dir.path().to_path_buf());
    let report = client.sync().await.unwrap();

    assert_eq!(report.downloaded, vec!["b.bin".to_string()]);
    assert_eq!(fs::read(fresh_dir.path().join("b.bin")).unwrap(), b"abcdefgh");

    let index = fs::read_to_string(fresh_dir.path().join("index.txt")).unwrap();
    assert!(index.starts_with("b.bin 1 "));
}

#[tokio::test]
async fn delete_publishes_tombstone_and_removes_local_entry() {
    let addr = spawn_server().await;
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("a.txt");
    fs::write(&file_path, b"hello").unwrap();

    let client = client_at(addr, dir.path().to_path_buf());
    client.sync().await.unwrap();

    fs::remove_file(&file_path).unwrap();
    let report = client.sync().await.unwrap();
    assert_eq!(report.deleted_remote, vec!["a.txt".to_string()]);

    let index = fs::read_to_string(dir.path().join("index.txt")).unwrap();
    assert!(index.starts_with("a.txt 2 0"));
    assert!(!file_path.exists());
}

#[tokio::test]
async fn version_conflict_remote_wins() {
    let addr = spawn_server().await;

    let c1_dir = tempdir().unwrap();
    let c2_dir = tempdir().unwrap();
    fs::write(c1_dir.path().join("a.txt"), b"hello").unwrap();

    let c1 = client_at(addr, c1_dir.path().to_path_buf());
    c1.sync().await.unwrap(); // a.txt now at version 1 everywhere

    // C2 starts from the same state, then publishes version 2.
    fs::write(c2_dir.path().join("a.txt"), b"hello").unwrap();
    let c2 = client_at(addr, c2_dir.path().to_path_buf());
    c2.sync().await.unwrap();
    fs::write(c2_dir.path().join("a.txt"), b"bar!").unwrap();
    c2.sync().await.unwrap(); // publishes version 2 = "bar!"

    // C1 now modifies locally to "foo!" while still believing it's at
    // version 1; its update_file races against C2's already-published v2
    // and must lose.
    fs::write(c1_dir.path().join("a.txt"), b"foo!").unwrap();
    let report = c1.sync().await.unwrap();

    assert_eq!(report.downloaded, vec!["a.txt".to_string()]);
    assert_eq!(fs::read(c1_dir.path().join("a.txt")).unwrap(), b"bar!");
    let index = fs::read_to_string(c1_dir.path().join("index.txt")).unwrap();
    assert!(index.starts_with("a.txt 2 "));
}

#[tokio::test]
async fn concurrent_create_converges_to_a_single_winner() {
    let addr = spawn_server().await;

    let c1_dir = tempdir().unwrap();
    let c2_dir = tempdir().unwrap();
    fs::write(c1_dir.path().join("c.txt"), b"from-c1").unwrap();
    fs::write(c2_dir.path().join("c.txt"), b"from-c2").unwrap();

    let c1 = client_at(addr, c1_dir.path().to_path_buf());
    let c2 = client_at(addr, c2_dir.path().to_path_buf());

    let (r1, r2) = tokio::join!(c1.sync(), c2.sync());
    r1.unwrap();
    r2.unwrap();

    let content1 = fs::read(c1_dir.path().join("c.txt")).unwrap();
    let content2 = fs::read(c2_dir.path().join("c.txt")).unwrap();
    assert_eq!(content1, content2, "both clients must converge on the same winner");
    assert!(content1 == b"from-c1" || content1 == b"from-c2");
}

#[tokio::test]
async fn empty_file_round_trips_as_empty_hashlist_not_tombstone() {
    let addr = spawn_server().await;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("empty.txt"), b"").unwrap();

    let client = client_at(addr, dir.path().to_path_buf());
    client.sync().await.unwrap();

    let index = fs::read_to_string(dir.path().join("index.txt")).unwrap();
    assert_eq!(index, "empty.txt 1\n");
}

#[tokio::test]
async fn dotfiles_and_index_are_never_synced() {
    let addr = spawn_server().await;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".hidden"), b"secret").unwrap();

    let client = client_at(addr, dir.path().to_path_buf());
    let report = client.sync().await.unwrap();

    assert!(report.uploaded.is_empty());
    assert!(dir.path().join(".hidden").exists());
}
