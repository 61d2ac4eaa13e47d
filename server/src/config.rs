use clap::Parser;
use shared::DEFAULT_PORT;
use std::time::Duration;

/// Server settings, parsed from the command line.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Authoritative Cubed replication server", long_about = None)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Milliseconds between snapshot broadcasts
    #[arg(short, long = "tick-ms", default_value_t = 5)]
    pub tick_ms: u64,

    /// Maximum number of concurrent connections
    #[arg(short, long, default_value_t = 32)]
    pub max_clients: usize,

    /// Keep a player's last state in snapshots after it disconnects
    #[arg(long)]
    pub keep_disconnected: bool,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Tick period, never shorter than one millisecond.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            tick_ms: 5,
            max_clients: 32,
            keep_disconnected: false,
        }
    }
}
