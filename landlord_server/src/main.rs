//! Landlord server.
//!
//! Hosts the fixed rooms over a websocket endpoint. Robots fill empty
//! seats in rooms that allow them.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Error;
use landlord::RoomManager;
use landlord_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging,
};
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run a landlord card game server

USAGE:
  landlord_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  ROBOT_THINK_MS           Pause before a robot acts            [default: 1000]
  ROBOT_FILL_DELAY_MS      Pause before robots fill a new table [default: 3000]
  WRITE_WAIT_MS            Deadline for one websocket write     [default: 10000]
  PONG_WAIT_SECS           Read timeout, pongs included         [default: 60]
  ROOM_ENTRANCE_FEE        Entrance fee advertised per room     [default: 200]
  ROOM_BASE_STAKE          Stake per multiplier point           [default: 1]
  RUST_LOG                 Log filter                           [default: info]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let config = ServerConfig::from_env(bind);
    config.validate()?;

    logging::init();
    info!("Starting landlord server at {}", config.bind);

    let registry = Arc::new(RoomManager::new(config.room_configs(), config.robots));
    for room in registry.list_rooms().await {
        info!(
            "  - room {} (robots: {}, entrance fee: {})",
            room.id, room.allow_robot, room.entrance_fee
        );
    }

    let bind = config.bind;
    let state = AppState {
        registry,
        config: Arc::new(config),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind, e))?;

    info!("Server is running at ws://{}/ws. Press Ctrl+C to stop.", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
