use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    info!(
        "Starting server: tick {:?}, max {} clients{}",
        config.tick_interval(),
        config.max_clients,
        if config.keep_disconnected {
            ", keeping disconnected players"
        } else {
            ""
        }
    );

    let server = Server::bind(&config).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await?;

    Ok(())
}
