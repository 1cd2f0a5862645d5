//! mupdb server: replicated multipart-upload metadata partition

use clap::{Arg, Command};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};
use mupdb_engine::MetaPartition;

mod handlers;
mod server;

use server::UploadServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let matches = Command::new("mupdb-server")
        .version("0.1.0")
        .about("Replicated multipart-upload metadata partition")
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("PATH")
                .help("Data directory path")
                .default_value("./data"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Bind address")
                .default_value("127.0.0.1:8080"),
        )
        .get_matches();

    let data_dir: PathBuf = matches
        .get_one::<String>("data-dir")
        .expect("has default")
        .into();

    let bind_addr: SocketAddr = matches
        .get_one::<String>("bind")
        .expect("has default")
        .parse()?;

    info!("Starting mupdb server");
    info!("Data directory: {}", data_dir.display());
    info!("Bind address: {}", bind_addr);

    // Create data directory if it doesn't exist
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        info!("Created data directory: {}", data_dir.display());
    }

    // Open the partition, restoring the index from the last snapshot
    let partition = MetaPartition::open(&data_dir)?;
    info!(
        "Partition opened, {} in-progress uploads restored",
        partition.upload_count()
    );

    let server = UploadServer::new(partition);

    match server.serve(bind_addr).await {
        Ok(_) => info!("Server shutdown gracefully"),
        Err(e) => {
            warn!("Server error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
