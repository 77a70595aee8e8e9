use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Error;
use clap::Parser;
use log::info;

use blocksync::Config;

/// Serves the block store and file-info map over HTTP.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the server's key=value config file.
    #[arg(short, long, default_value = "/etc/blocksync/server.conf")]
    config: PathBuf,
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    info!("starting blocksync-server, base_dir={:?}", config.base_dir);

    let addr = format!("{}:{}", config.host, config.port).parse()?;
    let datastore = Arc::new(sync_datastore::Server::new());

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(blocksync::server::run(addr, datastore))
}
