use clap::Parser;
use client::game::MovementSettings;
use client::input::{InputManager, MacroquadKeyboard};
use client::network::TcpClientTransport;
use client::rendering::{Renderer, UiConfig};
use client::sync::{ClientSyncLoop, SyncState};
use env_logger::Env;
use log::info;
use macroquad::prelude::{get_frame_time, next_frame, Conf};
use shared::DEFAULT_PORT;
use std::sync::Arc;
use tokio::runtime::Handle;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: usize,

    /// Wait for R/Enter instead of connecting on startup
    #[arg(long)]
    no_autoconnect: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // macroquad owns the main thread, so networking gets its own runtime.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    info!("Starting client...");
    info!("Server: {}", args.server);
    info!("Controls: WASD or arrow keys to move, R or Enter to connect");

    let conf = Conf {
        window_title: "Cubed".to_string(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        ..Default::default()
    };
    macroquad::Window::from_config(conf, run(args, runtime.handle().clone()));

    Ok(())
}

async fn run(args: Args, runtime: Handle) {
    let state = Arc::new(SyncState::new());
    let transport = TcpClientTransport::new(runtime, state.clone());
    if !args.no_autoconnect {
        transport.connect(&args.server);
    }

    let mut sync = ClientSyncLoop::new(transport, state, MovementSettings::default());
    let mut input_manager = InputManager::new();
    let mut renderer = Renderer::new(args.width, args.height);

    loop {
        let dt = get_frame_time();

        if input_manager.poll_connect_request() && sync.status().can_connect() {
            sync.transport().connect(&args.server);
        }

        sync.frame(&MacroquadKeyboard, dt);

        let remote = sync.remote_players();
        let ui = UiConfig {
            status: sync.status(),
            local_id: sync.local_id(),
            server: args.server.clone(),
            player_count: remote.len(),
        };
        renderer.render(&sync.local_player().data, &remote, ui);

        next_frame().await;
    }
}
