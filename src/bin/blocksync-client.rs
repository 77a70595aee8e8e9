use std::path::PathBuf;

use anyhow::Error;
use clap::Parser;
use log::info;

use blocksync::Config;
use sync_client::{HttpClient, SyncClient};

/// Runs one reconciliation pass between a watched directory and the server.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the client's key=value config file.
    #[arg(short, long, default_value = "/etc/blocksync/client.conf")]
    config: PathBuf,
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let http = HttpClient::new(&config.host, config.port);
        let client = SyncClient::new(config.base_dir.clone(), config.block_size, http);

        let report = client.sync().await?;
        info!(
            "sync finished: {} uploaded, {} downloaded, {} deleted, {} unchanged",
            report.uploaded.len(),
            report.downloaded.len(),
            report.deleted_remote.len(),
            report.no_op.len()
        );
        Ok(())
    })
}
