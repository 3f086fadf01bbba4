//! Solo FTP Server - Entry Point
//!
//! Serves one FTP client at a time from a directory on disk.

use log::{error, info};
use tokio::time::{self, MissedTickBehavior};

use solo_ftp_server::error::ServerError;
use solo_ftp_server::storage::LocalFilesystem;
use solo_ftp_server::transfer::TcpTransport;
use solo_ftp_server::{FtpServer, ServerConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize the logger (RUST_LOG overrides the default filter)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        error!("Server startup failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::load()?;
    let transport = TcpTransport::bind(&config)?;

    info!("Launching FTP server, serving {}", config.server_root);

    let fs = LocalFilesystem::new(config.server_root_path());
    let mut ticker = time::interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut server = FtpServer::new(config, transport, fs);
    server.begin();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => server.handle_ftp(),
            _ = &mut shutdown => {
                server.shutdown();
                break;
            }
        }
    }

    info!("FTP server stopped");
    Ok(())
}
